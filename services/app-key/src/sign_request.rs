use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::uri::PathAndQuery;
use http::Uri;
use log::debug;
use remote_api_core::error::NO_RESPONSE;
use remote_api_core::hash::{base64_hmac_sha256, hex_md5};
use remote_api_core::query::{build_flat_query, build_query, decode_nested, parse_query};
use remote_api_core::time::{now, DateTime};
use remote_api_core::utils::unique_id;
use remote_api_core::{Body, Context, Error, Result, SignRequest};
use serde_json::Value;

use crate::constants::*;
use crate::Credential;

/// RequestSigner that implements app key signing.
///
/// The signature covers the query parameters, the decoded body parameters
/// and the signature parameters themselves. Only top level keys are sorted:
/// arrays and objects keep their own order, so `ids[2]` stays before
/// `ids[10]` and `tags[0]` before `tagsX`. `appkey`,
/// `nonce`, `expires` and `signature` are attached to the query string; the
/// body is never modified.
///
/// ## Format
///
/// ```text
/// canonical = build_query(sort_top_level(query + body + {appkey, nonce, expires}))
/// signature = hex(md5(base64(hmac_sha256(app_secret, canonical))))[5..15]
/// ```
#[derive(Debug)]
pub struct RequestSigner {
    credential: Credential,
    ttl: Duration,

    time: Option<DateTime>,
    nonce: Option<String>,
}

impl RequestSigner {
    /// Create a new signer with the default ttl.
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            time: None,
            nonce: None,
        }
    }

    /// Set how long signatures stay valid.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Configured ttl.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Specify the nonce.
    ///
    /// # Note
    ///
    /// Every request needs a fresh nonce. Only use this function for testing.
    #[cfg(test)]
    pub fn with_nonce(mut self, nonce: &str) -> Self {
        self.nonce = Some(nonce.to_string());
        self
    }

    fn nonce_and_expires(&self) -> (String, i64) {
        let nonce = self.nonce.clone().unwrap_or_else(unique_id);
        let time = self.time.unwrap_or_else(now);
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        (nonce, time.timestamp().saturating_add(ttl))
    }

    /// Compute the signature pairs for `params` with a fixed nonce and expiry.
    ///
    /// `params` are top level entries: later entries and then the signature
    /// parameters win over same-named ones. Nested values are signed in
    /// their own order. The result is, in order: `appkey`, `nonce`,
    /// `expires`, `signature`.
    pub fn sign_params<I>(&self, params: I, nonce: &str, expires: i64) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut signs = vec![
            (APPKEY.to_string(), self.credential.app_key.clone()),
            (NONCE.to_string(), nonce.to_string()),
            (EXPIRES.to_string(), expires.to_string()),
        ];

        let mut sorted: BTreeMap<String, Value> = params.into_iter().collect();
        for (k, v) in &signs {
            sorted.insert(k.clone(), Value::String(v.clone()));
        }
        let canonical = build_query(sorted.iter().map(|(k, v)| (k.as_str(), v)));
        debug!("canonical string to sign: {canonical}");

        signs.push((SIGNATURE.to_string(), self.signature(&canonical)));
        signs
    }

    /// Compute the signature of a canonical string.
    pub fn signature(&self, canonical: &str) -> String {
        let digest = hex_md5(
            base64_hmac_sha256(
                self.credential.app_secret.as_bytes(),
                canonical.as_bytes(),
            )
            .as_bytes(),
        );
        digest[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_LEN].to_string()
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    async fn sign_request(
        &self,
        _ctx: &Context,
        parts: &mut http::request::Parts,
        body: &Body,
    ) -> Result<()> {
        // Multipart fields are signed up front by `sign_fields`.
        if body.is_multipart() {
            return Ok(());
        }

        let mut query = parts.uri.query().map(parse_query).unwrap_or_default();
        let mut params: Vec<(String, Value)> = decode_nested(query.clone()).into_iter().collect();
        params.extend(body_params(parts, body));

        let (nonce, expires) = self.nonce_and_expires();
        for (k, v) in self.sign_params(params, &nonce, expires) {
            match query.iter_mut().find(|(qk, _)| *qk == k) {
                Some(slot) => slot.1 = v,
                None => query.push((k, v)),
            }
        }

        let paq = format!("{}?{}", parts.uri.path(), build_flat_query(&query));
        let mut uri = std::mem::take(&mut parts.uri).into_parts();
        uri.path_and_query = Some(PathAndQuery::from_str(&paq).map_err(invalid_uri)?);
        parts.uri = Uri::from_parts(uri).map_err(invalid_uri)?;

        Ok(())
    }

    fn sign_fields(&self, fields: Vec<(String, String)>) -> Result<Vec<(String, String)>> {
        let (nonce, expires) = self.nonce_and_expires();
        Ok(self.sign_params(decode_nested(fields), &nonce, expires))
    }
}

/// Decode body parameters: JSON objects when the content type contains
/// `/json`, form pairs otherwise.
fn body_params(parts: &http::request::Parts, body: &Body) -> Vec<(String, Value)> {
    if body.is_empty() {
        return Vec::new();
    }

    let is_json = parts
        .headers
        .get_all(CONTENT_TYPE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("/json"));

    if is_json {
        match serde_json::from_slice::<Value>(body.as_bytes()) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => {
                debug!("json body is not an object, not signed");
                Vec::new()
            }
        }
    } else {
        decode_nested(parse_query(&String::from_utf8_lossy(body.as_bytes())))
            .into_iter()
            .collect()
    }
}

fn invalid_uri(e: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::api(NO_RESPONSE, format!("invalid signed uri: {e}")).with_source(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use remote_api_core::query::payload_to_pairs;
    use remote_api_core::Multipart;
    use serde_json::json;

    const NONCE_FIXED: &str = "5f1a2b3c4d5e6f70";
    const EXPIRES_FIXED: &str = "1700000060";

    fn signer() -> RequestSigner {
        let _ = env_logger::builder().is_test(true).try_init();
        RequestSigner::new(Credential::new("test-key", "test-secret").unwrap())
            .with_time(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
            .with_nonce(NONCE_FIXED)
    }

    fn pairs(v: &[(&str, &str)]) -> Vec<(String, String)> {
        v.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn sign(req: http::Request<Body>) -> Result<(http::request::Parts, Body)> {
        let (mut parts, body) = req.into_parts();
        signer()
            .sign_request(&Context::new(), &mut parts, &body)
            .await?;
        Ok((parts, body))
    }

    #[test]
    fn test_signature_window() {
        let s = signer();
        assert_eq!(s.signature("appkey=test-key"), "29f838a4f4");
        assert_eq!(s.signature("appkey=test-key").len(), 10);
    }

    #[test]
    fn test_sign_params_empty() {
        let signs = signer().sign_params(Vec::new(), NONCE_FIXED, 1_700_000_060);
        assert_eq!(
            signs,
            pairs(&[
                ("appkey", "test-key"),
                ("nonce", NONCE_FIXED),
                ("expires", EXPIRES_FIXED),
                ("signature", "51ed011585"),
            ])
        );
    }

    #[test]
    fn test_sign_params_is_order_independent() {
        let s = signer();
        let a = s.sign_params(
            vec![("q".to_string(), json!("a b")), ("page".to_string(), json!("1"))],
            NONCE_FIXED,
            1_700_000_060,
        );
        let b = s.sign_params(
            vec![("page".to_string(), json!("1")), ("q".to_string(), json!("a b"))],
            NONCE_FIXED,
            1_700_000_060,
        );
        assert_eq!(a, b);
        assert_eq!(a[3].1, "17619f4629");
    }

    #[test]
    fn test_sign_params_is_sensitive() {
        let s = signer();
        let a = s.sign_params(
            vec![("page".to_string(), json!("1"))],
            NONCE_FIXED,
            1_700_000_060,
        );
        let b = s.sign_params(
            vec![("page".to_string(), json!("2"))],
            NONCE_FIXED,
            1_700_000_060,
        );
        let c = s.sign_params(
            vec![("page".to_string(), json!("1"))],
            "another-nonce",
            1_700_000_060,
        );
        assert_ne!(a[3], b[3]);
        assert_ne!(a[3], c[3]);
    }

    #[test]
    fn test_signature_params_win() {
        let signs = signer().sign_params(
            vec![
                ("page".to_string(), json!("1")),
                ("appkey".to_string(), json!("spoofed")),
            ],
            NONCE_FIXED,
            1_700_000_060,
        );
        assert_eq!(signs[0].1, "test-key");
        assert_eq!(signs[3].1, "db0652377b");
    }

    #[tokio::test]
    async fn test_sign_get() -> Result<()> {
        let req = http::Request::get("http://api.example.com/users/list?page=1&q=a+b")
            .body(Body::Empty)
            .unwrap();
        let (parts, _) = sign(req).await?;

        assert_eq!(parts.uri.path(), "/users/list");
        assert_eq!(
            parse_query(parts.uri.query().unwrap()),
            pairs(&[
                ("page", "1"),
                ("q", "a b"),
                ("appkey", "test-key"),
                ("nonce", NONCE_FIXED),
                ("expires", EXPIRES_FIXED),
                ("signature", "17619f4629"),
            ])
        );
        assert_eq!(parts.uri.authority().unwrap().as_str(), "api.example.com");
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_json_body() -> Result<()> {
        let req = http::Request::post("http://api.example.com/users?q=1")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                br#"{"b":2,"a":"x y","tags":["red","blue"]}"#.to_vec(),
            ))
            .unwrap();
        let (parts, body) = sign(req).await?;

        let query = parse_query(parts.uri.query().unwrap());
        assert_eq!(query[0], ("q".to_string(), "1".to_string()));
        assert_eq!(query[4], ("signature".to_string(), "eea5332614".to_string()));
        // The body is left untouched.
        assert_eq!(
            body.as_bytes(),
            br#"{"b":2,"a":"x y","tags":["red","blue"]}"#
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_form_body() -> Result<()> {
        let req = http::Request::post("http://api.example.com/users")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(b"name=alice&age=30".to_vec()))
            .unwrap();
        let (parts, body) = sign(req).await?;

        let query = parse_query(parts.uri.query().unwrap());
        assert_eq!(query.len(), 4);
        assert_eq!(query[3], ("signature".to_string(), "e0304e289b".to_string()));
        assert_eq!(body.as_bytes(), b"name=alice&age=30");
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_keeps_array_index_order() -> Result<()> {
        let ids = payload_to_pairs(&json!({"ids": (0..=10).collect::<Vec<_>>()}))?;
        let uri = format!("http://api.example.com/users?{}", build_flat_query(&ids));
        let req = http::Request::get(uri).body(Body::Empty).unwrap();
        let (parts, _) = sign(req).await?;

        // appkey=test-key&expires=1700000060&ids%5B0%5D=0&ids%5B1%5D=1&...
        // &ids%5B9%5D=9&ids%5B10%5D=10&nonce=5f1a2b3c4d5e6f70
        let query = parse_query(parts.uri.query().unwrap());
        assert_eq!(&query[..11], &ids[..]);
        assert_eq!(query.last().unwrap().1, "0cd02b8e24");
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_json_keeps_nested_key_order() -> Result<()> {
        let req = http::Request::post("http://api.example.com/users")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(br#"{"filter":{"b":"1","a":"2"}}"#.to_vec()))
            .unwrap();
        let (parts, _) = sign(req).await?;

        // appkey=test-key&expires=1700000060&filter%5Bb%5D=1&filter%5Ba%5D=2&nonce=...
        let query = parse_query(parts.uri.query().unwrap());
        assert_eq!(query[3], ("signature".to_string(), "376cc5e215".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_form_sorts_top_level_keys_only() -> Result<()> {
        let req = http::Request::post("http://api.example.com/users")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(b"tagsX=c&tags%5B0%5D=a&tags%5B1%5D=b".to_vec()))
            .unwrap();
        let (parts, _) = sign(req).await?;

        // ...&nonce=5f1a2b3c4d5e6f70&tags%5B0%5D=a&tags%5B1%5D=b&tagsX=c
        let query = parse_query(parts.uri.query().unwrap());
        assert_eq!(query[3], ("signature".to_string(), "07a0ccc01c".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_query_and_nested_json_body() -> Result<()> {
        let ids = payload_to_pairs(&json!({"ids": (0..=10).collect::<Vec<_>>()}))?;
        let uri = format!("http://api.example.com/users?{}", build_flat_query(&ids));
        let req = http::Request::post(uri)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(br#"{"filter":{"b":"1","a":"2"}}"#.to_vec()))
            .unwrap();
        let (parts, _) = sign(req).await?;

        let query = parse_query(parts.uri.query().unwrap());
        assert_eq!(query.last().unwrap().1, "a2cb5b7091");
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_replaces_spoofed_query() -> Result<()> {
        let req = http::Request::get("http://api.example.com/users?nonce=evil&page=1")
            .body(Body::Empty)
            .unwrap();
        let (parts, _) = sign(req).await?;

        let query = parse_query(parts.uri.query().unwrap());
        assert_eq!(query[0], ("nonce".to_string(), NONCE_FIXED.to_string()));
        assert_eq!(query[1], ("page".to_string(), "1".to_string()));
        assert_eq!(query.last().unwrap().1, "db0652377b");
        Ok(())
    }

    #[tokio::test]
    async fn test_multipart_passes_through() -> Result<()> {
        let form = Multipart::new()
            .text("title", "report")
            .file("upload", "a.txt", Bytes::from_static(b"hello"));
        let req = http::Request::post("http://api.example.com/files?v=1")
            .body(Body::from(form))
            .unwrap();
        let (parts, _) = sign(req).await?;

        assert_eq!(parts.uri.to_string(), "http://api.example.com/files?v=1");
        Ok(())
    }

    #[test]
    fn test_sign_fields() -> Result<()> {
        let form = Multipart::new()
            .text("title", "report")
            .file("upload", "a.txt", Bytes::from_static(b"hello"));
        let signs = signer().sign_fields(form.text_fields())?;

        assert_eq!(signs[3], ("signature".to_string(), "ad79d6c58e".to_string()));
        Ok(())
    }

    #[test]
    fn test_sign_fields_appends_bracket_pairs() -> Result<()> {
        let form = Multipart::new().text("a[]", "1").text("a[]", "2");
        let signs = signer().sign_fields(form.text_fields())?;

        // a%5B0%5D=1&a%5B1%5D=2&appkey=test-key&expires=1700000060&nonce=...
        assert_eq!(signs[3], ("signature".to_string(), "6fa16baeae".to_string()));
        Ok(())
    }

    #[test]
    fn test_expires_saturates() -> Result<()> {
        let signs = signer()
            .with_ttl(Duration::from_secs(u64::MAX))
            .sign_fields(Vec::new())?;
        assert_eq!(signs[2], ("expires".to_string(), i64::MAX.to_string()));
        Ok(())
    }

    #[test]
    fn test_fresh_nonce_per_request() -> Result<()> {
        let s = RequestSigner::new(Credential::new("k", "s")?);
        let a = s.sign_fields(Vec::new())?;
        let b = s.sign_fields(Vec::new())?;
        assert_ne!(a[1], b[1]);
        Ok(())
    }
}
