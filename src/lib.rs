pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod report;
pub mod runtime;

pub use error::{ApiError, Error, ErrorKind};
pub use http::Client;
