pub mod attachment;
pub mod consistency;
pub mod error;
pub mod naming;
pub mod template;

pub use attachment::{AttachmentRef, UploadFile};
pub use error::FormdeskError;
pub use template::{TemplateInput, TemplateRecord};

/// URL path under which the content directory is served.
pub const UPLOADS_PREFIX: &str = "/uploads";
