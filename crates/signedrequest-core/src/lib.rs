//! Configuration and core error types for SignedRequest.
//!
//! This crate holds the pieces shared by the SignedRequest HTTP layer and
//! server binary: environment-driven configuration and the error type used to
//! report configuration problems.

mod config;
mod error;

pub use config::SignedRequestConfig;
pub use error::{CoreError, CoreResult};
