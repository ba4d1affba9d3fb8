//! Access to the verdict stored by the middleware.

use axum::{
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
};

use hcaptcha_common::Verdict;

/// Verdict stored on `req`, if the middleware ran
pub fn verdict(req: &Request) -> Option<&Verdict> {
    req.extensions().get::<Verdict>()
}

pub fn verdict_from_parts(parts: &Parts) -> Option<&Verdict> {
    parts.extensions.get::<Verdict>()
}

/// Extractor for the stored verdict.
///
/// Rejects with `401 Are you a bot?` when no verdict is present.
#[derive(Debug, Clone)]
pub struct HCaptcha(pub Verdict);

impl<S> FromRequestParts<S> for HCaptcha
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        verdict_from_parts(parts)
            .cloned()
            .map(HCaptcha)
            .ok_or((StatusCode::UNAUTHORIZED, "Are you a bot?"))
    }
}
