mod http;
mod local;
mod traits;

pub use http::HttpService;
pub use local::{LocalService, ServiceConfig};
pub use traits::{ServiceError, TemplateService};
