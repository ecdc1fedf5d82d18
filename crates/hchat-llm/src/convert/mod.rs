//! Bidirectional conversion between normalized types and vendor wire formats
//!
//! Each submodule handles one vendor protocol. `schema` holds the JSON-Schema
//! sanitizer shared by vendors with a restricted schema dialect.

pub mod anthropic;
pub mod google;
pub mod schema;
