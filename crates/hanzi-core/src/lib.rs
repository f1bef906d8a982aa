//! Shared HTTP plumbing for the hanzi feature crates

mod error;
pub mod headers;

pub use error::{ErrorBody, HttpError, error_response};
