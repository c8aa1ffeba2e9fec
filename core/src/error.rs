//! Error taxonomy shared by every client.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Code reported when the transport gave up waiting for the remote side.
pub const TIMEOUT: i64 = 20001;
/// Code reported for every connection failure that is not a timeout.
pub const CONNECTION: i64 = 20002;
/// Code reported when a request failed without any response.
pub const NO_RESPONSE: i64 = 100;
/// Code used when a remote error payload carries no `code` of its own.
pub const UNKNOWN: i64 = 999999;
/// Code reported when a response body is not valid JSON.
pub const JSON_SYNTAX: i64 = 4;
/// Code reported when a response body is JSON that can't be represented.
pub const JSON_DATA: i64 = 5;

const DEFAULT_MESSAGE: &str = "api error";

/// The error type for remote api calls.
///
/// Every failure below the client boundary (transport, HTTP status, JSON
/// parsing, envelope code) is folded into one of the call kinds. Callers
/// never see raw transport errors.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    code: Code,
    message: String,
    url: String,
    info: Option<Value>,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote HTTP or application level failure, or a malformed response.
    Api,

    /// Transport level connection failure other than a timeout.
    Connection,

    /// The transport timed out or received nothing at all.
    Timeout,

    /// Invalid configuration, only raised while constructing clients.
    ConfigInvalid,
}

impl Error {
    /// Create a new error with the given kind, code and message
    pub fn new(kind: ErrorKind, code: impl Into<Code>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            url: String::new(),
            info: None,
            source: None,
        }
    }

    /// Attach the resolved request url.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Attach the remote payload this error was built from.
    pub fn with_info(mut self, info: Value) -> Self {
        self.info = Some(info);
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error code.
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the resolved url of the failed request.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the remote payload, if the remote side returned one.
    pub fn info(&self) -> Option<&Value> {
        self.info.as_ref()
    }

    /// Message followed by the request url, handy for log lines.
    pub fn custom_message(&self) -> String {
        if self.url.is_empty() {
            self.message.clone()
        } else {
            format!("{} {}", self.message, self.url)
        }
    }

    /// Check if this error was caused by the transport instead of the remote api.
    pub fn is_transport_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Connection | ErrorKind::Timeout)
    }
}

// Convenience constructors
impl Error {
    /// Create an api error.
    pub fn api(code: impl Into<Code>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, code, message)
    }

    /// Create a connection error with the reserved connection code.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, CONNECTION, message)
    }

    /// Create a timeout error with the reserved timeout code.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, TIMEOUT, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, 0i64, message)
    }

    /// Build an api error from a remote payload.
    ///
    /// Remote `code` and `message` (or `msg`) win. Missing fields fall back
    /// to [`UNKNOWN`] and a generic message. The payload is kept as `info`.
    pub fn from_remote(payload: Value) -> Self {
        let code = payload
            .get("code")
            .filter(|v| !v.is_null())
            .map(Code::from_value)
            .unwrap_or(Code::Number(UNKNOWN));
        let message = ["message", "msg"]
            .iter()
            .filter_map(|k| payload.get(*k))
            .find_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                v => Some(v.to_string()),
            })
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

        Self::api(code, message).with_info(payload)
    }

    /// Build an api error from a JSON parse failure.
    pub fn from_json(err: serde_json::Error) -> Self {
        let code = match err.classify() {
            serde_json::error::Category::Data => JSON_DATA,
            _ => JSON_SYNTAX,
        };
        Self::api(code, err.to_string()).with_source(err)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Api => write!(f, "api error"),
            ErrorKind::Connection => write!(f, "connection error"),
            ErrorKind::Timeout => write!(f, "timeout error"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// Error code as reported by the remote side or by this crate.
///
/// Remote envelopes are free to use numbers or strings, the representation
/// is preserved as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    /// Integer code.
    Number(i64),
    /// Any other representation, kept verbatim.
    Text(String),
}

impl Code {
    /// Convert a JSON value into a code.
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Code::Number(i),
                None => Code::Text(n.to_string()),
            },
            Value::String(s) => Code::Text(s.clone()),
            v => Code::Text(v.to_string()),
        }
    }

    /// Numeric value of this code, parsing text codes when possible.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Code::Number(i) => Some(*i),
            Code::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Number(i) => write!(f, "{i}"),
            Code::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Code {
    fn from(v: i64) -> Self {
        Code::Number(v)
    }
}

impl From<u16> for Code {
    fn from(v: u16) -> Self {
        Code::Number(v.into())
    }
}

impl From<&str> for Code {
    fn from(v: &str) -> Self {
        Code::Text(v.to_string())
    }
}

impl From<String> for Code {
    fn from(v: String) -> Self {
        Code::Text(v)
    }
}

impl PartialEq<i64> for Code {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Code::Number(i) if i == other)
    }
}

impl PartialEq<&str> for Code {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Code::Text(s) if s == other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_remote_prefers_remote_fields() {
        let err = Error::from_remote(json!({"code": "1001", "message": "invalid token"}));
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.code(), &"1001");
        assert_eq!(err.message(), "invalid token");
        assert_eq!(
            err.info(),
            Some(&json!({"code": "1001", "message": "invalid token"}))
        );
    }

    #[test]
    fn test_from_remote_fallbacks() {
        let err = Error::from_remote(json!({"msg": "legacy"}));
        assert_eq!(err.code(), &UNKNOWN);
        assert_eq!(err.message(), "legacy");

        let err = Error::from_remote(json!({"data": 1}));
        assert_eq!(err.message(), "api error");
    }

    #[test]
    fn test_from_json() {
        let err = serde_json::from_str::<Value>("{not json").unwrap_err();
        let err = Error::from_json(err);
        assert_eq!(err.code(), &JSON_SYNTAX);
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_custom_message() {
        let err = Error::timeout("request timeout").with_url("http://example.com/a");
        assert_eq!(err.code(), &TIMEOUT);
        assert!(err.is_transport_error());
        assert_eq!(err.custom_message(), "request timeout http://example.com/a");
    }

    #[test]
    fn test_config_invalid() {
        let err = Error::config_invalid("need app_key and app_secret");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.code(), &Code::Number(0));
        assert!(!err.is_transport_error());
    }

    #[test]
    fn test_code_as_i64() {
        assert_eq!(Code::from("42").as_i64(), Some(42));
        assert_eq!(Code::from_value(&json!(1.5)), Code::Text("1.5".to_string()));
        assert_eq!(Code::from("abc").as_i64(), None);
    }
}
