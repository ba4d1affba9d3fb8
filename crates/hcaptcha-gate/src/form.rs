//! Token extraction from urlencoded and multipart form bodies.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Form, FromRequest, Multipart, Query, Request},
    http::{Method, header, request::Parts},
};
use futures::TryStreamExt;
use tower::{Layer, ServiceExt, service_fn};
use tracing::debug;

use hcaptcha_common::HCaptchaError;

type Pairs = Vec<(String, String)>;

const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Values parsed from a request's query string and form body.
///
/// `form` holds the urlencoded body, then the query, then multipart value
/// fields. `post_form` holds body values only. `multipart` is set only for
/// `multipart/form-data` requests and never includes file parts.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    form: Pairs,
    post_form: Pairs,
    multipart: Option<Pairs>,
}

impl FormValues {
    /// Parse the query string and, for form content types, the body.
    ///
    /// Only urlencoded and multipart bodies are read. Any other body is
    /// handed back untouched. A urlencoded body is buffered whole under
    /// `max_memory` and restored. A multipart body is streamed: file parts
    /// are skipped without being kept, and only value fields count against
    /// `max_memory`. The multipart body is restored for downstream handlers
    /// when it fits under `max_memory`; otherwise it comes back empty.
    pub async fn parse(req: Request, max_memory: usize) -> (Request, Result<Self, HCaptchaError>) {
        let (parts, body) = req.into_parts();
        let (body, result) = Self::from_parts(&parts, body, max_memory).await;
        (Request::from_parts(parts, body), result)
    }

    async fn from_parts(
        parts: &Parts,
        body: Body,
        max_memory: usize,
    ) -> (Body, Result<Self, HCaptchaError>) {
        match media_type(parts).as_deref() {
            Some(URLENCODED) if carries_form_body(&parts.method) => {
                let bytes = match axum::body::to_bytes(body, max_memory).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let err = HCaptchaError::Form(format!(
                            "failed to buffer request body (limit {max_memory} bytes): {e}"
                        ));
                        return (Body::empty(), Err(err));
                    }
                };
                let result = match parse_urlencoded(parts, bytes.clone()).await {
                    Ok(pairs) => Self::collect(parts, pairs, None),
                    Err(e) => Err(e),
                };
                (Body::from(bytes), result)
            }
            Some(MULTIPART) => {
                let replay = Replay::new(max_memory);
                let result = match parse_multipart(parts, replay.tee(body), max_memory).await {
                    Ok(fields) => Self::collect(parts, Vec::new(), Some(fields)),
                    Err(e) => Err(e),
                };
                (replay.into_body(), result)
            }
            // Not a form body; the query still applies.
            _ => (body, Self::collect(parts, Vec::new(), None)),
        }
    }

    fn collect(parts: &Parts, post_form: Pairs, multipart: Option<Pairs>) -> Result<Self, HCaptchaError> {
        let Query(query) = Query::<Pairs>::try_from_uri(&parts.uri)
            .map_err(|rej| HCaptchaError::Form(rej.to_string()))?;

        let mut values = Self {
            form: post_form.clone(),
            post_form,
            multipart: None,
        };
        values.form.extend(query);

        if let Some(fields) = multipart {
            values.form.extend(fields.iter().cloned());
            values.post_form.extend(fields.iter().cloned());
            values.multipart = Some(fields);
        }

        Ok(values)
    }

    /// First value for `key`, or `""` when no source carries it.
    ///
    /// A missing field and an empty field look the same to the caller.
    pub fn get(&self, key: &str) -> &str {
        if !self.form.is_empty() {
            return first(&self.form, key).unwrap_or_default();
        }
        if !self.post_form.is_empty() {
            return first(&self.post_form, key).unwrap_or_default();
        }
        if let Some(fields) = &self.multipart {
            if let Some(value) = first(fields, key) {
                return value;
            }
        }
        ""
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart.is_some()
    }
}

fn first<'a>(pairs: &'a Pairs, key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Lowercased media type without parameters
fn media_type(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase())
}

fn carries_form_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT || method == Method::PATCH
}

/// Copy of a streamed body, kept only while it fits under `limit`
#[derive(Clone)]
struct Replay {
    state: Arc<Mutex<ReplayState>>,
}

struct ReplayState {
    chunks: Vec<Bytes>,
    len: usize,
    limit: usize,
    overflowed: bool,
}

impl Replay {
    fn new(limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplayState {
                chunks: Vec::new(),
                len: 0,
                limit,
                overflowed: false,
            })),
        }
    }

    /// Wrap `body` so every chunk read through it is recorded
    fn tee(&self, body: Body) -> Body {
        let replay = self.clone();
        Body::from_stream(
            body.into_data_stream()
                .inspect_ok(move |chunk| replay.record(chunk)),
        )
    }

    fn record(&self, chunk: &Bytes) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.overflowed {
            return;
        }
        state.len += chunk.len();
        if state.len > state.limit {
            state.overflowed = true;
            state.chunks = Vec::new();
        } else {
            state.chunks.push(chunk.clone());
        }
    }

    /// The recorded bytes as a fresh body, or an empty one past the limit
    fn into_body(self) -> Body {
        let Ok(state) = self.state.lock() else {
            return Body::empty();
        };
        if state.overflowed {
            debug!(limit = state.limit, "multipart body not kept for downstream handlers");
            return Body::empty();
        }
        Body::from(state.chunks.concat())
    }
}

/// Minimal request over `body` for axum's extractors
fn body_request(parts: &Parts, body: Body) -> Request {
    let mut req = Request::new(body);
    *req.method_mut() = parts.method.clone();
    *req.uri_mut() = parts.uri.clone();
    if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
        req.headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }
    req
}

/// Run an extractor with axum's default body limit lifted.
///
/// Callers enforce their own ceiling.
async fn extract<T>(req: Request) -> Result<T, T::Rejection>
where
    T: FromRequest<()> + Send + 'static,
    T::Rejection: Send + 'static,
{
    let svc = DefaultBodyLimit::disable().layer(service_fn(|req: Request| async move {
        Ok::<_, Infallible>(T::from_request(req, &()).await)
    }));

    match svc.oneshot(req).await {
        Ok(result) => result,
        Err(never) => match never {},
    }
}

async fn parse_urlencoded(parts: &Parts, body: Bytes) -> Result<Pairs, HCaptchaError> {
    let Form(pairs) = extract::<Form<Pairs>>(body_request(parts, Body::from(body)))
        .await
        .map_err(|rej| HCaptchaError::Form(rej.to_string()))?;
    Ok(pairs)
}

/// Value fields of a streamed multipart body.
///
/// File parts are passed over unread. Value fields together may not exceed
/// `max_memory` bytes.
async fn parse_multipart(parts: &Parts, body: Body, max_memory: usize) -> Result<Pairs, HCaptchaError> {
    let mut multipart = extract::<Multipart>(body_request(parts, body))
        .await
        .map_err(|rej| HCaptchaError::Form(rej.to_string()))?;

    let mut budget = max_memory;
    let mut fields = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| HCaptchaError::Form(e.to_string()))?
    {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        let mut value = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| HCaptchaError::Form(e.to_string()))?
        {
            budget = budget.checked_sub(chunk.len()).ok_or_else(|| {
                HCaptchaError::Form(format!(
                    "multipart value fields exceed {max_memory} bytes"
                ))
            })?;
            value.extend_from_slice(&chunk);
        }
        fields.push((name, String::from_utf8_lossy(&value).into_owned()));
    }

    Ok(fields)
}
