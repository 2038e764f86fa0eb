pub mod auth;
pub mod config;
pub mod error;
pub mod module;
pub mod types;

pub use auth::{Anonymous, Authenticator, TrustedHeader, VIEWER_HEADER};
pub use config::{ServiceConfig, DEFAULT_SEARCH_WINDOW};
pub use error::ServiceError;
pub use module::Module;
pub use types::{
    ListParams, ListResult, format_rfc3339, merge_patch, new_id, now_rfc3339, parse_rfc3339,
};
