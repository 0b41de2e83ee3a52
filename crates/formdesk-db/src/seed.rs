use formdesk_core::TemplateRecord;
use serde_json::Map;
use tracing::info;

use crate::{DbError, RecordStore};

fn sample(id: i64, template_no: &str, created_at: &str) -> TemplateRecord {
    TemplateRecord {
        id,
        template_no: template_no.to_string(),
        name: format!("Template {id}"),
        revision: "1".to_string(),
        created_by: "N/A".to_string(),
        department: "N/A".to_string(),
        reference: "N/A".to_string(),
        fields: "2 fields".to_string(),
        created_at: created_at.to_string(),
        attachments: Vec::new(),
        extra: Map::new(),
    }
}

/// The two starter templates a fresh install is seeded with.
pub fn sample_templates() -> Vec<TemplateRecord> {
    vec![
        sample(1, "545454", "Feb 3, 2025 05:51"),
        sample(2, "8", "Feb 3, 2025 05:54"),
    ]
}

/// Write the sample templates. Without `force` this only happens when the
/// collection is empty; returns whether anything was written.
pub async fn seed(store: &dyn RecordStore, force: bool) -> Result<bool, DbError> {
    if !force && !store.read_all().await?.is_empty() {
        return Ok(false);
    }
    store.replace_all(&sample_templates()).await?;
    info!("seeded {} sample templates", sample_templates().len());
    Ok(true)
}
