//! HTTP exchanges.
//!
//! - [`transport`]: the default [`HttpTransport`](crate::ops::HttpTransport)
//! - [`body`]: request/response body helpers

pub mod body;
pub mod transport;

pub use body::{read_body, read_json, read_text};
pub use transport::SystemHttpTransport;
