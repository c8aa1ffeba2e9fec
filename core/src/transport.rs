use std::fmt::Debug;

use bytes::Bytes;
use thiserror::Error;

use crate::Body;

/// HttpSend is the transport used by the client to send requests.
///
/// Implementations must return every response they receive, including 4xx
/// and 5xx ones: deciding which status is a failure is the client's job.
/// Only failures without a usable response are reported as [`TransportError`].
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(
        &self,
        req: http::Request<Body>,
    ) -> std::result::Result<http::Response<Bytes>, TransportError>;
}

/// Failure signalled by a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The connection could not be established or broke before any response.
    #[error("{message}")]
    Connect {
        /// What went wrong at connection level.
        reason: ConnectFailure,
        /// Underlying failure text.
        message: String,
    },
    /// The request failed after the connection was established.
    #[error("{message}")]
    Request {
        /// Underlying failure text.
        message: String,
        /// The response, if the remote side sent one.
        response: Option<http::Response<Bytes>>,
    },
}

impl TransportError {
    /// Create a connect failure.
    pub fn connect(reason: ConnectFailure, message: impl Into<String>) -> Self {
        TransportError::Connect {
            reason,
            message: message.into(),
        }
    }

    /// Create a request failure.
    pub fn request(message: impl Into<String>, response: Option<http::Response<Bytes>>) -> Self {
        TransportError::Request {
            message: message.into(),
            response,
        }
    }
}

/// Connection level failure signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The operation timed out.
    TimedOut,
    /// The connection closed without any response data.
    NothingReceived,
    /// Any other connection failure: refused, dns, tls.
    Other,
}

impl ConnectFailure {
    /// Returns true if this failure counts as a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectFailure::TimedOut | ConnectFailure::NothingReceived)
    }
}
