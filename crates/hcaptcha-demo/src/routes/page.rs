//! Widget form and the gated page.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;

use hcaptcha_gate::{HCaptcha, Verdict, verdict};

use crate::form::render_form;
use crate::state::AppState;

/// Render the widget form posting to `/page`
pub async fn index(State(state): State<AppState>) -> Html<String> {
    render_form(state.site_key(), "/page")
}

#[derive(Serialize)]
pub struct PageResponse {
    message: &'static str,
    /// Challenge time as reported by siteverify, if parseable
    #[serde(skip_serializing_if = "Option::is_none")]
    solved_at: Option<String>,
    verdict: Verdict,
}

/// Page reachable only after a successful verification
pub async fn page(HCaptcha(verdict): HCaptcha) -> Json<PageResponse> {
    Json(PageResponse {
        message: "Page is inspected by a human",
        solved_at: verdict.challenge_time().map(|ts| ts.to_rfc3339()),
        verdict,
    })
}

/// Failure handler: log the error codes, answer 429
pub async fn rejected(req: Request) -> Response {
    match verdict(&req) {
        Some(v) if v.has_errors() => tracing::info!(
            path = %req.uri().path(),
            error_codes = ?v.error_codes,
            "hCaptcha verification failed"
        ),
        _ => tracing::info!(
            path = %req.uri().path(),
            "hCaptcha verification failed without error codes"
        ),
    }

    (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
}
