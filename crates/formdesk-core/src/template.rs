use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attachment::AttachmentRef;
use crate::error::FormdeskError;

/// A catalog entry describing a form template.
///
/// Display fields are free-form strings. Members the presentation layer adds
/// on its own are kept in `extra` so they survive a read/replace cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: i64,
    #[serde(default)]
    pub template_no: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub fields: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateRecord {
    pub fn references(&self, stored_name: &str) -> bool {
        self.attachments.iter().any(|a| a.stored_name == stored_name)
    }

    /// Drop every attachment with the given stored name. Returns how many were removed.
    pub fn remove_attachment(&mut self, stored_name: &str) -> usize {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.stored_name != stored_name);
        before - self.attachments.len()
    }
}

/// A template as submitted for bulk replace; `id` may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInput {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub template_no: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub fields: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<TemplateRecord> for TemplateInput {
    fn from(r: TemplateRecord) -> Self {
        Self {
            id: Some(r.id),
            template_no: r.template_no,
            name: r.name,
            revision: r.revision,
            created_by: r.created_by,
            department: r.department,
            reference: r.reference,
            fields: r.fields,
            created_at: r.created_at,
            attachments: r.attachments,
            extra: r.extra,
        }
    }
}

/// Turn a replacement batch into records, giving every input without an id
/// the next value after the largest id present in the batch.
///
/// Fails if two inputs carry the same explicit id.
pub fn assign_ids(inputs: Vec<TemplateInput>) -> Result<Vec<TemplateRecord>, FormdeskError> {
    let mut seen = HashSet::new();
    for id in inputs.iter().filter_map(|t| t.id) {
        if !seen.insert(id) {
            return Err(FormdeskError::InvalidInput(format!(
                "duplicate template id {id}"
            )));
        }
    }

    let max_id = seen.iter().copied().max().unwrap_or(0);
    let mut next_id = max_id.checked_add(1);
    let mut records = Vec::with_capacity(inputs.len());
    for t in inputs {
        let id = match t.id {
            Some(id) => id,
            None => {
                let id = next_id.ok_or_else(|| {
                    FormdeskError::InvalidInput(format!("no id left after {max_id}"))
                })?;
                next_id = id.checked_add(1);
                id
            }
        };
        records.push(TemplateRecord {
            id,
            template_no: t.template_no,
            name: t.name,
            revision: t.revision,
            created_by: t.created_by,
            department: t.department,
            reference: t.reference,
            fields: t.fields,
            created_at: t.created_at,
            attachments: t.attachments,
            extra: t.extra,
        });
    }
    Ok(records)
}
