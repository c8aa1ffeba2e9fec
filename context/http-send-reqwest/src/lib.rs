//! [`HttpSend`] implementation backed by reqwest.
//!
//! Every response is returned as is, whatever its status. Failures without a
//! response are reported as [`TransportError`] with a [`ConnectFailure`]
//! signal so that the client can tell timeouts from other connection errors.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use remote_api_core::{Body, ConnectFailure, HttpSend, Multipart, PartContents, TransportError};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

/// Messages hyper reports when the peer closed without answering.
const NOTHING_RECEIVED: [&str; 2] = [
    "connection closed before message completed",
    "empty reply",
];

/// HttpSend built on a [`reqwest::Client`].
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a new ReqwestHttpSend with the given timeouts.
    ///
    /// `timeout` covers the whole request, `connect_timeout` only the
    /// connection phase.
    pub fn with_timeouts(
        timeout: Option<Duration>,
        connect_timeout: Option<Duration>,
    ) -> reqwest::Result<Self> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        if let Some(t) = connect_timeout {
            builder = builder.connect_timeout(t);
        }
        Ok(Self::new(builder.build()?))
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(
        &self,
        req: http::Request<Body>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        let (parts, body) = req.into_parts();

        let mut builder = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers);
        builder = match body {
            Body::Empty => builder,
            Body::Bytes(bs) => builder.body(bs),
            Body::Multipart(form) => builder.multipart(into_form(form)),
        };

        let resp = builder.send().await.map_err(into_transport_error)?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let bs = resp.bytes().await.map_err(into_transport_error)?;

        let mut out = http::Response::new(bs);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

fn into_form(form: Multipart) -> Form {
    form.parts()
        .iter()
        .fold(Form::new(), |f, part| match &part.contents {
            PartContents::Text(v) => f.text(part.name.clone(), v.clone()),
            PartContents::File { filename, data } => f.part(
                part.name.clone(),
                Part::bytes(data.to_vec()).file_name(filename.clone()),
            ),
        })
}

fn into_transport_error(err: reqwest::Error) -> TransportError {
    let message = error_chain(&err);
    debug!("reqwest failed: {message}");

    if err.is_timeout() {
        return TransportError::connect(ConnectFailure::TimedOut, message);
    }
    let lower = message.to_lowercase();
    if NOTHING_RECEIVED.iter().any(|m| lower.contains(m)) {
        return TransportError::connect(ConnectFailure::NothingReceived, message);
    }
    if err.is_connect() {
        return TransportError::connect(ConnectFailure::Other, message);
    }
    TransportError::request(message, None)
}

/// Join an error with all of its sources.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut s = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        s.push_str(": ");
        s.push_str(&e.to_string());
        source = e.source();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.1.as_deref().map(|e| e as _)
        }
    }

    #[test]
    fn test_error_chain() {
        let err = Layer(
            "error sending request",
            Some(Box::new(Layer(
                "client error (SendRequest)",
                Some(Box::new(Layer("connection closed before message completed", None))),
            ))),
        );
        assert_eq!(
            error_chain(&err),
            "error sending request: client error (SendRequest): connection closed before message completed"
        );
    }
}
