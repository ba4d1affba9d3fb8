//! # hCaptcha Common
//!
//! Shared types and constants used by the hCaptcha gate and its demo server.
//!
//! ## Modules
//! - `types` - The siteverify verdict
//! - `error` - Local failure taxonomy (input, transport, decode)
//! - `constants` - Endpoint, form field names, and defaults

pub mod constants;
pub mod error;
pub mod types;

pub use error::{ErrorKind, HCaptchaError};
pub use types::*;
