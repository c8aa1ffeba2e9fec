//! Fluent call path builder on top of [`Client`].
//!
//! ```no_run
//! # async fn example(client: remote_api_core::Client) -> remote_api_core::Result<()> {
//! use remote_api_core::{Service, Verb};
//! use serde_json::json;
//!
//! let svc = Service::new(client);
//! // GET users/list?page=1
//! let users = svc.segment("users").segment("list").get(&json!({"page": 1})).await?;
//! // POST users/create with a form body
//! let created = svc
//!     .segment("users")
//!     .segment("create")
//!     .method(Verb::Post)
//!     .send(&json!({"name": "alice"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Instant;

use log::{info, log_enabled, Level};
use serde::Serialize;
use serde_json::Value;

use crate::error::NO_RESPONSE;
use crate::utils::unique_id;
use crate::{envelope, Client, Error, Multipart, Options, Result, Verb};

const DEFAULT_USER_ID: &str = "0";

/// Service maps call paths onto requests sent by one [`Client`].
///
/// The service holds no per-call state: every chain starts a fresh [`Call`]
/// value which is consumed by its dispatch, so a service can be shared by
/// concurrent callers.
#[derive(Clone, Debug)]
pub struct Service {
    client: Client,
    context: RequestContext,
}

impl Service {
    /// Create a new service on top of `client`.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            context: RequestContext::default(),
        }
    }

    /// Use `context` for every call started from this service.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Start an empty call.
    pub fn call(&self) -> Call<'_> {
        Call {
            service: self,
            segments: Vec::new(),
            verb: Verb::default(),
            context: self.context.clone(),
            options: Options::default(),
        }
    }

    /// Start a call with its first path segment.
    pub fn segment(&self, name: impl Into<String>) -> Call<'_> {
        self.call().segment(name)
    }
}

/// Values from the calling context forwarded as request headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Trace id sent as `x-request-id`, generated per call when absent.
    pub trace_id: Option<String>,
    /// User id sent as `x-user-id`, `0` when absent.
    pub user_id: Option<String>,
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trace id.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Set the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// One call chain: accumulated path, verb and options.
///
/// Dispatch methods take `self`, so the path and verb are consumed exactly
/// once whatever the outcome.
#[derive(Debug)]
pub struct Call<'a> {
    service: &'a Service,
    segments: Vec<String>,
    verb: Verb,
    context: RequestContext,
    options: Options,
}

impl Call<'_> {
    /// Append a path segment.
    ///
    /// A name already present in the path is not appended again.
    pub fn segment(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.segments.contains(&name) {
            self.segments.push(name);
        }
        self
    }

    /// Use `verb` for this call instead of the default `get`.
    pub fn method(mut self, verb: Verb) -> Self {
        self.verb = verb;
        self
    }

    /// Override the request context for this call.
    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Caller options, merged over the defaults at dispatch.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Accumulated path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path relative to the client's base uri.
    pub fn url(&self) -> String {
        self.segments.join("/")
    }

    /// Verb this call will be dispatched with.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Dispatch with `GET`.
    pub async fn get<T: Serialize + ?Sized>(self, args: &T) -> Result<Value> {
        self.method(Verb::Get).send(args).await
    }

    /// Dispatch with a form `POST`.
    pub async fn post<T: Serialize + ?Sized>(self, args: &T) -> Result<Value> {
        self.method(Verb::Post).send(args).await
    }

    /// Dispatch with a JSON `POST`.
    pub async fn json<T: Serialize + ?Sized>(self, args: &T) -> Result<Value> {
        self.method(Verb::Json).send(args).await
    }

    /// Dispatch with a multipart `POST`.
    pub async fn multi_post(self, form: Multipart) -> Result<Value> {
        let Call {
            service,
            segments,
            context,
            options,
            ..
        } = self;
        let url = segments.join("/");
        let options =
            default_options(&context, &service.client.full_url(&url))?.merge(options);
        let args = Value::Array(
            form.text_fields()
                .into_iter()
                .map(|(k, v)| Value::Array(vec![k.into(), v.into()]))
                .collect(),
        );

        let log = RequestLog::before(service, Verb::MultiPost, &url, &args, &options);
        let resp = service
            .client
            .multi_post(&url, form, options)
            .await?;
        log.after(&resp);

        envelope::validate(&resp, &service.client.full_url(&url))
    }

    /// Dispatch with the configured verb.
    pub async fn send<T: Serialize + ?Sized>(self, args: &T) -> Result<Value> {
        let Call {
            service,
            segments,
            verb,
            context,
            options,
        } = self;
        let url = segments.join("/");
        let args = serde_json::to_value(args).map_err(|e| {
            Error::api(NO_RESPONSE, e.to_string())
                .with_url(service.client.full_url(&url))
                .with_source(e)
        })?;
        let options =
            default_options(&context, &service.client.full_url(&url))?.merge(options);

        let log = RequestLog::before(service, verb, &url, &args, &options);
        let resp = service
            .client
            .dispatch(verb, &url, &args, options)
            .await?;
        log.after(&resp);

        envelope::validate(&resp, &service.client.full_url(&url))
    }
}

fn default_options(context: &RequestContext, url: &str) -> Result<Options> {
    let trace_id = context.trace_id.clone().unwrap_or_else(unique_id);
    let user_id = context.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);

    let build = || -> Result<Options> {
        Options::new()
            .with_debug(false)
            .with_header("accept", "application/json")?
            .with_header("x-request-id", &trace_id)?
            .with_header("x-user-id", user_id)
    };
    // Calls never report ConfigInvalid.
    build().map_err(|e| Error::api(NO_RESPONSE, e.message().to_string()).with_url(url))
}

/// before_request / after_request events, emitted only when info logging
/// is enabled.
struct RequestLog {
    request_id: String,
    start: Instant,
    enabled: bool,
}

impl RequestLog {
    fn before(service: &Service, verb: Verb, url: &str, args: &Value, options: &Options) -> Self {
        let enabled = log_enabled!(Level::Info);
        let request_id = if enabled { unique_id() } else { String::new() };
        if enabled {
            info!(
                "{request_id} before_request verb={verb} url={} args={args} options={options:?}",
                service.client.full_url(url)
            );
        }

        Self {
            request_id,
            start: Instant::now(),
            enabled,
        }
    }

    fn after(&self, resp: &str) {
        if self.enabled {
            info!(
                "{} after_request elapsed={:.6}s response={resp}",
                self.request_id,
                self.start.elapsed().as_secs_f64()
            );
        }
    }
}
