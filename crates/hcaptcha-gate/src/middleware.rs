//! Request-gating middleware.
//!
//! Every request is verified, the [`Verdict`] is stored in the request
//! extensions, and the request is dispatched to the wrapped service on
//! success or to the verifier's [`FailureHandler`] otherwise. The verdict is
//! attached on both paths so failure handlers can log the error codes.
//!
//! The verification future lives inside the request future: when the server
//! drops a request (client gone) the outbound siteverify call goes with it.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::{BoxFuture, FutureExt};
use tower::{Layer, Service};
use tracing::debug;

use hcaptcha_common::Verdict;

use crate::verifier::Verifier;

type HandlerFn = dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync;

/// Callback producing the response for a request that failed verification.
///
/// Defaults to `429 Too Many Requests` with no further detail.
#[derive(Clone)]
pub struct FailureHandler(Arc<HandlerFn>);

impl FailureHandler {
    pub fn new<F, Fut, R>(handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self(Arc::new(move |req| {
            let fut = handler(req);
            async move { fut.await.into_response() }.boxed()
        }))
    }

    pub async fn call(&self, req: Request) -> Response {
        (self.0)(req).await
    }
}

impl Default for FailureHandler {
    fn default() -> Self {
        Self::new(too_many_requests)
    }
}

async fn too_many_requests(_req: Request) -> Response {
    (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
}

/// Store the verdict on the request; returns whether it passed
fn attach(req: &mut Request, verdict: Verdict) -> bool {
    let success = verdict.is_success();
    if success {
        debug!(hostname = %verdict.hostname, "hCaptcha gate passed");
    } else {
        debug!(error_codes = ?verdict.error_codes, "hCaptcha gate rejected request");
    }
    req.extensions_mut().insert(verdict);
    success
}

/// Layer that applies hCaptcha verification
#[derive(Clone)]
pub struct HCaptchaLayer {
    verifier: Verifier,
}

impl HCaptchaLayer {
    pub fn new(verifier: Verifier) -> Self {
        Self { verifier }
    }
}

impl<S> Layer<S> for HCaptchaLayer {
    type Service = HCaptchaService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HCaptchaService {
            inner,
            verifier: self.verifier.clone(),
        }
    }
}

/// Service produced by [`HCaptchaLayer`]
#[derive(Clone)]
pub struct HCaptchaService<S> {
    inner: S,
    verifier: Verifier,
}

impl<S> Service<Request> for HCaptchaService<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Take the service that was driven to readiness, leave a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let verifier = self.verifier.clone();

        async move {
            let (mut req, verdict) = verifier.verify_request(req).await;
            if attach(&mut req, verdict) {
                inner.call(req).await.map(IntoResponse::into_response)
            } else {
                Ok(verifier.failure_handler().call(req).await)
            }
        }
        .boxed()
    }
}

/// Function-style middleware for `axum::middleware::from_fn_with_state`.
pub async fn require_hcaptcha(
    State(verifier): State<Verifier>,
    req: Request,
    next: Next,
) -> Response {
    let (mut req, verdict) = verifier.verify_request(req).await;
    if attach(&mut req, verdict) {
        next.run(req).await
    } else {
        verifier.failure_handler().call(req).await
    }
}
