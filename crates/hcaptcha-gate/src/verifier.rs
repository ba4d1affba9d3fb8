//! Siteverify client.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use tracing::{debug, warn};

use hcaptcha_common::constants::{RESPONSE_FIELD, params};
use hcaptcha_common::{HCaptchaError, Verdict};

use crate::config::VerifierConfig;
use crate::form::FormValues;
use crate::middleware::{FailureHandler, HCaptchaLayer};

/// hCaptcha verifier.
///
/// Holds the shared outbound client and the account configuration. Clones
/// share the same transport, so a single instance can serve every request.
#[derive(Clone)]
pub struct Verifier {
    inner: Arc<Inner>,
}

#[derive(Clone)]
struct Inner {
    http: reqwest::Client,
    secret: String,
    site_key: Option<String>,
    remote_ip: Option<String>,
    endpoint: String,
    max_memory: usize,
    failure_handler: FailureHandler,
}

impl Verifier {
    /// Verifier with default transport and settings for `secret`.
    ///
    /// Unchecked: an empty secret is accepted and every siteverify call will
    /// then fail remotely. Like `reqwest::Client::new`, panics if the TLS
    /// backend cannot be initialized. Use [`try_new`](Self::try_new) or
    /// [`from_config`](Self::from_config) to get those as errors instead.
    pub fn new(secret: impl Into<String>) -> Self {
        let config = VerifierConfig::new(secret);
        Self::with_client(config, reqwest::Client::new())
    }

    /// Checked counterpart of [`new`](Self::new)
    pub fn try_new(secret: impl Into<String>) -> Result<Self, HCaptchaError> {
        Self::from_config(VerifierConfig::new(secret))
    }

    /// Build from configuration, creating the transport.
    ///
    /// Fails on an empty secret or when the transport cannot be built.
    pub fn from_config(config: VerifierConfig) -> Result<Self, HCaptchaError> {
        if config.secret.is_empty() {
            return Err(HCaptchaError::Config("secret key must not be empty".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| HCaptchaError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(config, http))
    }

    fn with_client(config: VerifierConfig, http: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                secret: config.secret,
                site_key: config.site_key,
                remote_ip: config.remote_ip,
                endpoint: config.endpoint,
                max_memory: config.max_memory,
                failure_handler: FailureHandler::default(),
            }),
        }
    }

    /// Replace the outbound transport (timeouts, proxies, pooling)
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        Arc::make_mut(&mut self.inner).http = http;
        self
    }

    pub fn with_site_key(mut self, site_key: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).site_key = Some(site_key.into());
        self
    }

    pub fn with_remote_ip(mut self, remote_ip: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).remote_ip = Some(remote_ip.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).endpoint = endpoint.into();
        self
    }

    pub fn with_max_memory(mut self, max_memory: usize) -> Self {
        Arc::make_mut(&mut self.inner).max_memory = max_memory;
        self
    }

    /// Handler invoked by the middleware when verification fails
    pub fn with_failure_handler(mut self, handler: FailureHandler) -> Self {
        Arc::make_mut(&mut self.inner).failure_handler = handler;
        self
    }

    pub fn failure_handler(&self) -> &FailureHandler {
        &self.inner.failure_handler
    }

    pub fn max_memory(&self) -> usize {
        self.inner.max_memory
    }

    /// Configured site key, if any and not empty
    pub fn site_key(&self) -> Option<&str> {
        self.inner.site_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Tower layer gating the wrapped service on this verifier
    pub fn layer(&self) -> HCaptchaLayer {
        HCaptchaLayer::new(self.clone())
    }

    /// Verify a token against the remote service.
    ///
    /// Never fails: local errors come back as `success = false` with the
    /// description in `error_codes`.
    pub async fn verify_token(&self, token: &str) -> Verdict {
        match self.try_verify_token(token).await {
            Ok(verdict) => verdict,
            Err(err) => flatten(err),
        }
    }

    /// Same as [`verify_token`](Self::verify_token) with local failures kept typed.
    ///
    /// The remote verdict is returned verbatim, including `success = false`.
    pub async fn try_verify_token(&self, token: &str) -> Result<Verdict, HCaptchaError> {
        if token.is_empty() {
            return Err(HCaptchaError::EmptyToken);
        }

        let response = self
            .inner
            .http
            .post(&self.inner.endpoint)
            .form(&self.form_params(token))
            .send()
            .await
            .map_err(|e| HCaptchaError::Transport(e.to_string()))?;

        // Status is not inspected; the body carries the verdict.
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| HCaptchaError::Read(e.to_string()))?;

        let verdict: Verdict =
            serde_json::from_slice(&body).map_err(|e| HCaptchaError::Decode(e.to_string()))?;

        debug!(
            status = %status,
            success = verdict.success,
            hostname = %verdict.hostname,
            error_codes = ?verdict.error_codes,
            "siteverify answered"
        );

        Ok(verdict)
    }

    /// Extract the `h-captcha-response` field from `req` and verify it.
    ///
    /// The request is handed back with its body intact.
    pub async fn verify_request(&self, req: Request) -> (Request, Verdict) {
        let (req, values) = FormValues::parse(req, self.inner.max_memory).await;

        let token = match values {
            Ok(values) => values.get(RESPONSE_FIELD).to_owned(),
            Err(err) => return (req, flatten(err)),
        };

        if token.is_empty() {
            return (req, flatten(HCaptchaError::EmptyFormField));
        }

        let verdict = self.verify_token(&token).await;
        (req, verdict)
    }

    fn form_params<'a>(&'a self, token: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![
            (params::SECRET, self.inner.secret.as_str()),
            (params::RESPONSE, token),
        ];

        if let Some(ip) = self.inner.remote_ip.as_deref().filter(|ip| !ip.is_empty()) {
            form.push((params::REMOTE_IP, ip));
        }
        if let Some(key) = self.site_key() {
            form.push((params::SITE_KEY, key));
        }

        form
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("endpoint", &self.inner.endpoint)
            .field("site_key", &self.inner.site_key)
            .field("remote_ip", &self.inner.remote_ip)
            .field("max_memory", &self.inner.max_memory)
            .finish_non_exhaustive()
    }
}

fn flatten(err: HCaptchaError) -> Verdict {
    if err.is_pre_flight() {
        debug!(error = %err, "hCaptcha verification rejected before siteverify");
    } else {
        warn!(error = %err, kind = ?err.kind(), "hCaptcha verification failed");
    }
    Verdict::from(err)
}
