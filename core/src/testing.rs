//! Scripted transport for unit tests.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::HeaderMap;

use crate::{Body, ConnectFailure, HttpSend, TransportError};

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, &'static str),
    Connect(ConnectFailure),
    FailedWithResponse(u16, &'static str),
    FailedWithoutResponse,
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub method: http::Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Seen {
    pub fn query(&self) -> Vec<(String, String)> {
        self.uri
            .split_once('?')
            .map(|(_, q)| crate::query::parse_query(q))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct MockHttpSend {
    reply: Reply,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockHttpSend {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            seen: Arc::default(),
        }
    }

    pub fn ok(body: &'static str) -> Self {
        Self::new(Reply::Status(200, body))
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Seen {
        self.seen().pop().expect("no request was sent")
    }
}

fn response(status: u16, body: &'static str) -> http::Response<Bytes> {
    http::Response::builder()
        .status(status)
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
}

#[async_trait::async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(
        &self,
        req: http::Request<Body>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        let (parts, body) = req.into_parts();
        self.seen.lock().unwrap().push(Seen {
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body,
        });

        match &self.reply {
            Reply::Status(status, body) => Ok(response(*status, body)),
            Reply::Connect(reason) => Err(TransportError::connect(*reason, "connect failed")),
            Reply::FailedWithResponse(status, body) => Err(TransportError::request(
                "request failed",
                Some(response(*status, body)),
            )),
            Reply::FailedWithoutResponse => {
                Err(TransportError::request("could not resolve host", None))
            }
        }
    }
}
