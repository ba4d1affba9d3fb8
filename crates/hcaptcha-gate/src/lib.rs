//! # hCaptcha Gate
//!
//! Server-side hCaptcha verification for axum/tower services.
//!
//! ## Architecture
//! ```text
//! Request → HCaptchaLayer → Verifier ──POST──→ siteverify
//!                 ↓
//!      Verdict in extensions → inner service | FailureHandler
//! ```
//!
//! ## Modules
//! - `verifier` - Siteverify client (`verify_token`, `verify_request`)
//! - `form` - Token extraction from urlencoded and multipart bodies
//! - `middleware` - Tower layer and function middleware
//! - `context` - Verdict accessor and extractor
//! - `config` - Verifier configuration

pub mod config;
pub mod context;
pub mod form;
pub mod middleware;
pub mod verifier;

pub use config::VerifierConfig;
pub use context::{HCaptcha, verdict, verdict_from_parts};
pub use form::FormValues;
pub use hcaptcha_common::{ErrorKind, HCaptchaError, Verdict};
pub use middleware::{FailureHandler, HCaptchaLayer, HCaptchaService, require_hcaptcha};
pub use verifier::Verifier;
