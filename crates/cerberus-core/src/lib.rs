//! # Cerberus Core
//!
//! Core types shared by every Cerberus crate:
//!
//! - [`CerberusError`] - Error taxonomy with HTTP status mapping
//! - [`FieldErrors`] - Location-tagged validation failures
//! - [`ErrorEnvelope`] - Serializable JSON error body
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/cerberus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;

pub use context::RequestId;
pub use error::{
    CerberusError, CerberusResult, ErrorCategory, ErrorDetail, ErrorEnvelope, FieldErrors,
};
