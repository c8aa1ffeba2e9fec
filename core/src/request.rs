use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use http::HeaderMap;

use crate::{Error, Result};

/// Verb selects which client entry point a call is dispatched to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `GET` with the payload encoded into the query string.
    #[default]
    Get,
    /// `POST` with a form encoded body.
    Post,
    /// `POST` with a multipart body.
    MultiPost,
    /// `POST` with a JSON body.
    Json,
}

impl Verb {
    /// Name of the verb as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::MultiPost => "multiPost",
            Verb::Json => "json",
        }
    }

    /// HTTP method sent on the wire for this verb.
    pub fn method(&self) -> http::Method {
        match self {
            Verb::Get => http::Method::GET,
            Verb::Post | Verb::MultiPost | Verb::Json => http::Method::POST,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Verb::Get),
            "post" => Ok(Verb::Post),
            "multipost" | "multi_post" => Ok(Verb::MultiPost),
            "json" => Ok(Verb::Json),
            v => Err(Error::config_invalid(format!("unknown verb: {v}"))),
        }
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No body at all.
    #[default]
    Empty,
    /// Already encoded bytes, form or JSON.
    Bytes(Bytes),
    /// Multipart form, encoded by the transport.
    Multipart(Multipart),
}

impl Body {
    /// Returns true if this body carries a multipart form.
    pub fn is_multipart(&self) -> bool {
        matches!(self, Body::Multipart(_))
    }

    /// Raw bytes of an encoded body, empty for the other variants.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Bytes(bs) => bs,
            _ => &[],
        }
    }

    /// Size of an encoded body.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if there are no encoded bytes to send.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for Body {
    fn from(bs: Bytes) -> Self {
        Body::Bytes(bs)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bs: Vec<u8>) -> Self {
        Body::Bytes(bs.into())
    }
}

impl From<Multipart> for Body {
    fn from(m: Multipart) -> Self {
        Body::Multipart(m)
    }
}

/// Ordered multipart form.
#[derive(Debug, Clone, Default)]
pub struct Multipart {
    parts: Vec<Part>,
}

impl Multipart {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part::text(name, value));
        self
    }

    /// Append a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part::file(name, filename, data));
        self
    }

    /// Append a part.
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// All parts in insertion order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Name and value of every non-file part.
    pub fn text_fields(&self) -> Vec<(String, String)> {
        self.parts
            .iter()
            .filter_map(|p| match &p.contents {
                PartContents::Text(v) => Some((p.name.clone(), v.clone())),
                PartContents::File { .. } => None,
            })
            .collect()
    }
}

impl From<Vec<Part>> for Multipart {
    fn from(parts: Vec<Part>) -> Self {
        Self { parts }
    }
}

/// A single field of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    /// Field name.
    pub name: String,
    /// Field contents.
    pub contents: PartContents,
}

impl Part {
    /// Create a text part.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: PartContents::Text(value.into()),
        }
    }

    /// Create a file part.
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            contents: PartContents::File {
                filename: filename.into(),
                data: data.into(),
            },
        }
    }

    /// Returns true if this part is a file.
    pub fn is_file(&self) -> bool {
        matches!(self.contents, PartContents::File { .. })
    }
}

/// Contents of a multipart field.
#[derive(Debug, Clone)]
pub enum PartContents {
    /// Plain text value.
    Text(String),
    /// File upload.
    File {
        /// File name sent in the content disposition.
        filename: String,
        /// File content.
        data: Bytes,
    },
}

/// Per call request options.
///
/// `None` means "not provided", so that merging only overrides what the
/// caller explicitly set.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Query pairs appended to the url.
    pub query: Option<Vec<(String, String)>>,
    /// Extra headers.
    pub headers: HeaderMap,
    /// Log the outgoing request in detail.
    pub debug: Option<bool>,
}

impl Options {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set query pairs.
    pub fn with_query<K, V>(mut self, query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query = Some(
            query
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Insert a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name: http::HeaderName = name
            .parse()
            .map_err(|e| Error::config_invalid(format!("invalid header name {name}: {e}")))?;
        let value: http::HeaderValue = value
            .parse()
            .map_err(|e| Error::config_invalid(format!("invalid header value {value}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Set the debug flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Whether the debug flag is on.
    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    /// Merge `other` on top of `self`.
    ///
    /// Fields set in `other` replace ours. Headers are merged per name, so
    /// a caller header replaces only the default header of the same name.
    pub fn merge(mut self, other: Options) -> Self {
        if other.query.is_some() {
            self.query = other.query;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }
        let mut last = None;
        for (name, value) in other.headers {
            // `None` means another value for the previous name.
            if let Some(name) = name {
                self.headers.remove(&name);
                last = Some(name);
            }
            if let Some(name) = &last {
                self.headers.append(name.clone(), value);
            }
        }
        self
    }

    /// Append pairs to the query, replacing existing keys in place.
    pub fn merge_query(&mut self, pairs: Vec<(String, String)>) {
        let query = self.query.get_or_insert_with(Vec::new);
        for (k, v) in pairs {
            match query.iter_mut().find(|(qk, _)| *qk == k) {
                Some(slot) => slot.1 = v,
                None => query.push((k, v)),
            }
        }
    }
}
