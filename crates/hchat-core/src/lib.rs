//! Shared building blocks for the proxy crates

mod error;

pub use error::HttpError;
