use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Metadata row linking a template to one physical file in the content directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub stored_name: String,
    pub original_name: String,
    pub size: u64,
    pub url: String,
}

/// A raw file payload as received from a client.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub original_name: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(original_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            original_name: original_name.into(),
            data: data.into(),
        }
    }
}
