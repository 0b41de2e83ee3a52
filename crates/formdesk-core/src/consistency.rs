//! Read-only comparison of the record collection against the content directory.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::template::TemplateRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingRef {
    pub template_id: i64,
    pub stored_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub stored_name: String,
    pub template_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// References whose file is missing from the content directory.
    pub dangling: Vec<DanglingRef>,
    /// Files no template references.
    pub orphans: Vec<String>,
    /// Files referenced by more than one template.
    pub shared: Vec<SharedFile>,
    pub duplicate_ids: Vec<i64>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.dangling.is_empty()
            && self.orphans.is_empty()
            && self.shared.is_empty()
            && self.duplicate_ids.is_empty()
    }
}

pub fn audit(records: &[TemplateRecord], files: &[String]) -> AuditReport {
    let on_disk: BTreeSet<&str> = files.iter().map(String::as_str).collect();

    let mut owners: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    let mut dangling = Vec::new();
    for record in records {
        for att in &record.attachments {
            let ids = owners.entry(att.stored_name.as_str()).or_default();
            if !ids.contains(&record.id) {
                ids.push(record.id);
            }
            if !on_disk.contains(att.stored_name.as_str()) {
                dangling.push(DanglingRef {
                    template_id: record.id,
                    stored_name: att.stored_name.clone(),
                });
            }
        }
    }

    let orphans = on_disk
        .iter()
        .filter(|name| !owners.contains_key(*name))
        .map(|name| name.to_string())
        .collect();

    let shared = owners
        .iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(name, ids)| SharedFile {
            stored_name: name.to_string(),
            template_ids: ids.clone(),
        })
        .collect();

    let mut seen = BTreeSet::new();
    let mut duplicate_ids = BTreeSet::new();
    for record in records {
        if !seen.insert(record.id) {
            duplicate_ids.insert(record.id);
        }
    }

    AuditReport {
        dangling,
        orphans,
        shared,
        duplicate_ids: duplicate_ids.into_iter().collect(),
    }
}
