//! Wire format types for the non-`OpenAI` vendor protocols
//!
//! Each module contains pure serde structs matching the respective vendor's
//! JSON API format. The `OpenAI` dialect is the normalized form in
//! [`crate::types`], so it has no module here.

pub mod anthropic;
pub mod google;
