//! HTTP route handlers for the demo server.

use axum::{
    Router,
    routing::{get, post},
};
use hcaptcha_gate::FailureHandler;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod health;
mod page;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let gate = state
        .verifier
        .clone()
        .with_failure_handler(FailureHandler::new(page::rejected))
        .layer();

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))

        // Widget form and the page it protects
        .route("/", get(page::index))
        .route("/page", post(page::page).layer(gate))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::{
        body::Body,
        extract::Request,
        http::{StatusCode, header},
    };
    use hcaptcha_gate::Verifier;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    async fn app_with(siteverify: Value) -> (Router, MockServer) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(siteverify))
            .mount(&server)
            .await;

        let mut config = AppConfig::default();
        config.hcaptcha.site_key = "site-1".to_string();
        let state = AppState {
            config,
            verifier: Verifier::new("secret-1")
                .with_site_key("site-1")
                .with_endpoint(server.uri()),
        };
        (create_router(state), server)
    }

    fn submit(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/page")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_index_renders_form() {
        let (app, _server) = app_with(json!({"success": true})).await;

        let response = app
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains(r#"data-sitekey="site-1""#));
    }

    #[tokio::test]
    async fn test_page_passes_with_valid_token() {
        let (app, _server) = app_with(json!({
            "success": true,
            "hostname": "demo.local",
            "challenge_ts": "2024-03-01T12:30:00Z"
        }))
        .await;

        let response = app.oneshot(submit("h-captcha-response=tok-1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["verdict"]["hostname"], "demo.local");
        assert_eq!(body["solved_at"], "2024-03-01T12:30:00+00:00");
    }

    #[tokio::test]
    async fn test_page_rejects_invalid_token() {
        let (app, _server) =
            app_with(json!({"success": false, "error-codes": ["invalid-input-response"]})).await;

        let response = app.oneshot(submit("h-captcha-response=tok-1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_health_skips_gate() {
        let (app, server) = app_with(json!({"success": false})).await;

        let response = app
            .oneshot(axum::http::Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
