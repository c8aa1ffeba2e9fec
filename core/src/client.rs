use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use http::Method;
use http::StatusCode;
use log::debug;
use serde_json::Value;

use crate::error::NO_RESPONSE;
use crate::query::{build_flat_query, payload_to_pairs};
use crate::{Body, Context, Error, Multipart, Options, Part, Result, SignRequest};
use crate::{TransportError, Verb};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Client sends one logical request and returns the raw response body.
///
/// A client without a signer sends requests as they are built. With a
/// signer (see [`Client::with_signer`]) every request passes through
/// [`SignRequest::sign_request`] right before it reaches the transport.
///
/// Every failure is classified into [`crate::ErrorKind`] at this boundary.
/// The client holds only immutable configuration and is cheap to clone and
/// share across tasks.
#[derive(Clone, Debug)]
pub struct Client {
    ctx: Context,
    base_uri: Option<String>,
    signer: Option<Arc<dyn SignRequest>>,
}

impl Client {
    /// Create a new client sending through `ctx`.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            base_uri: None,
            signer: None,
        }
    }

    /// Resolve relative paths against `base_uri`.
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Sign every outgoing request with `signer`.
    pub fn with_signer(mut self, signer: impl SignRequest) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Returns true if requests are signed.
    pub fn is_signing(&self) -> bool {
        self.signer.is_some()
    }

    /// Configured base uri.
    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    /// Resolve `path` to the absolute url reported in errors and logs.
    pub fn full_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match self.base_uri.as_deref() {
            Some(base) if !base.is_empty() => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            _ => path.to_string(),
        }
    }

    /// `GET` with `query` encoded into the query string.
    ///
    /// The payload replaces any query set in `options`.
    pub async fn get(&self, path: &str, query: &Value, mut options: Options) -> Result<String> {
        let pairs = payload_to_pairs(query).map_err(|e| e.with_url(self.full_url(path)))?;
        options.query = Some(pairs);
        self.send(Method::GET, path, Body::Empty, None, options)
            .await
    }

    /// `POST` with `form` as a form encoded body.
    pub async fn post(&self, path: &str, form: &Value, options: Options) -> Result<String> {
        let pairs = payload_to_pairs(form).map_err(|e| e.with_url(self.full_url(path)))?;
        let body = Body::from(build_flat_query(&pairs).into_bytes());
        self.send(Method::POST, path, body, Some(FORM_CONTENT_TYPE), options)
            .await
    }

    /// `POST` with a multipart body.
    ///
    /// With a signer, the text fields are signed here and the signature
    /// pairs merged into the query. File parts never take part in signing.
    pub async fn multi_post(
        &self,
        path: &str,
        form: Multipart,
        mut options: Options,
    ) -> Result<String> {
        if let Some(signer) = &self.signer {
            let signs = signer
                .sign_fields(form.text_fields())
                .map_err(|e| e.with_url(self.full_url(path)))?;
            options.merge_query(signs);
        }
        self.send(Method::POST, path, Body::Multipart(form), None, options)
            .await
    }

    /// `POST` with `value` serialized as a JSON body.
    pub async fn json(&self, path: &str, value: &Value, options: Options) -> Result<String> {
        let body = serde_json::to_vec(value).map_err(|e| {
            Error::api(NO_RESPONSE, e.to_string())
                .with_url(self.full_url(path))
                .with_source(e)
        })?;
        self.send(
            Method::POST,
            path,
            Body::from(body),
            Some(JSON_CONTENT_TYPE),
            options,
        )
        .await
    }

    /// Dispatch to the entry point selected by `verb`.
    ///
    /// For [`Verb::MultiPost`] the payload fields become text parts.
    pub async fn dispatch(
        &self,
        verb: Verb,
        path: &str,
        payload: &Value,
        options: Options,
    ) -> Result<String> {
        match verb {
            Verb::Get => self.get(path, payload, options).await,
            Verb::Post => self.post(path, payload, options).await,
            Verb::Json => self.json(path, payload, options).await,
            Verb::MultiPost => {
                let parts = payload_to_pairs(payload)
                    .map_err(|e| e.with_url(self.full_url(path)))?
                    .into_iter()
                    .map(|(k, v)| Part::text(k, v))
                    .collect::<Vec<_>>();
                self.multi_post(path, Multipart::from(parts), options)
                    .await
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Body,
        content_type: Option<&'static str>,
        options: Options,
    ) -> Result<String> {
        let url = self.full_url(path);
        let req = build_request(method.clone(), &url, body, content_type, &options)
            .map_err(|e| e.with_url(&url))?;

        let (mut parts, body) = req.into_parts();
        if let Some(signer) = &self.signer {
            signer
                .sign_request(&self.ctx, &mut parts, &body)
                .await
                .map_err(|e| e.with_url(&url))?;
        }
        if options.is_debug() {
            debug!(
                "sending {} {}, headers: {:?}, body size: {}",
                parts.method,
                parts.uri,
                parts.headers,
                body.len()
            );
        }
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let start = Instant::now();
        let result = self
            .ctx
            .http_send(http::Request::from_parts(parts, body))
            .await;
        let elapsed = start.elapsed();

        match result {
            Ok(resp) => {
                let (parts, body) = resp.into_parts();
                let text = String::from_utf8_lossy(&body).into_owned();
                debug!(
                    ">>>{method} {url} {} {request_id} <<<{text}",
                    parts.status.as_u16()
                );

                if parts.status.is_client_error() || parts.status.is_server_error() {
                    return Err(status_error(&method, &url, parts.status, &body));
                }
                Ok(text)
            }
            Err(err) => Err(classify(err, &url, elapsed)),
        }
    }
}

fn build_request(
    method: Method,
    url: &str,
    body: Body,
    content_type: Option<&'static str>,
    options: &Options,
) -> Result<http::Request<Body>> {
    let uri = match &options.query {
        None => url.to_string(),
        Some(query) => {
            let base = url.split_once('?').map_or(url, |(base, _)| base);
            if query.is_empty() {
                base.to_string()
            } else {
                format!("{base}?{}", build_flat_query(query))
            }
        }
    };

    let mut req = http::Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .map_err(|e| Error::api(NO_RESPONSE, e.to_string()).with_source(e))?;

    let headers = req.headers_mut();
    for (name, value) in &options.headers {
        headers.append(name.clone(), value.clone());
    }
    if let Some(ct) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
    }

    Ok(req)
}

/// Error for a response with a 4xx or 5xx status.
///
/// The remote message wins when the body is a JSON object carrying one.
fn status_error(method: &Method, url: &str, status: StatusCode, body: &Bytes) -> Error {
    let class = if status.is_client_error() {
        "client error"
    } else {
        "server error"
    };
    let failure = format!(
        "{class}: `{method} {url}` resulted in a `{} {}` response",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );

    let payload = serde_json::from_slice::<Value>(body).ok();
    let message = payload
        .as_ref()
        .and_then(|p| ["message", "msg"].iter().find_map(|k| p.get(*k)?.as_str()))
        .map(str::to_string)
        .unwrap_or(failure);

    let err = Error::api(status.as_u16(), message).with_url(url);
    match payload {
        Some(payload) => err.with_info(payload),
        None => err,
    }
}

/// Fold a transport failure into the error taxonomy.
///
/// Connection failures are checked first; a failed request with a response
/// is checked before the no-response fallback.
fn classify(err: TransportError, url: &str, elapsed: Duration) -> Error {
    let classified = match &err {
        TransportError::Connect { reason, .. } => {
            let message = format!(
                "request timeout {url} after {:.3}s",
                elapsed.as_secs_f64()
            );
            if reason.is_timeout() {
                Error::timeout(message)
            } else {
                Error::connection(message)
            }
        }
        TransportError::Request {
            response: Some(resp),
            ..
        } => match serde_json::from_slice::<Value>(resp.body()) {
            Ok(payload) => Error::from_remote(payload),
            Err(e) => Error::from_json(e),
        },
        TransportError::Request {
            message,
            response: None,
        } => Error::api(NO_RESPONSE, message.clone()),
    };

    debug!("request {url} failed: {err}");
    classified.with_url(url).with_source(err)
}
