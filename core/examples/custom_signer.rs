use async_trait::async_trait;
use bytes::Bytes;
use http::request::Parts;
use http::HeaderValue;
use remote_api_core::error::NO_RESPONSE;
use remote_api_core::hash::base64_hmac_sha256;
use remote_api_core::{
    Body, Client, Context, Error, HttpSend, Result, Service, SignRequest, TransportError,
};
use serde_json::json;

// A signer that puts the signature in headers instead of the query.
#[derive(Debug)]
struct HeaderSigner {
    api_key: String,
    api_secret: String,
}

#[async_trait]
impl SignRequest for HeaderSigner {
    async fn sign_request(&self, _ctx: &Context, req: &mut Parts, body: &Body) -> Result<()> {
        let to_sign = format!("{}\n{}\n{}", req.method, req.uri, body.len());
        let signature = base64_hmac_sha256(self.api_secret.as_bytes(), to_sign.as_bytes());

        for (name, value) in [("x-api-key", &self.api_key), ("x-api-signature", &signature)] {
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::api(NO_RESPONSE, e.to_string()).with_source(e))?;
            req.headers.insert(name, value);
        }
        Ok(())
    }

    fn sign_fields(&self, _fields: Vec<(String, String)>) -> Result<Vec<(String, String)>> {
        // Multipart requests are signed by headers as well.
        Ok(Vec::new())
    }
}

// Answers every request locally and echoes the signature header.
#[derive(Debug)]
struct EchoHttpSend;

#[async_trait]
impl HttpSend for EchoHttpSend {
    async fn http_send(
        &self,
        req: http::Request<Body>,
    ) -> std::result::Result<http::Response<Bytes>, TransportError> {
        let signature = req
            .headers()
            .get("x-api-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let body = json!({"code": 0, "uri": req.uri().to_string(), "signature": signature});
        Ok(http::Response::new(Bytes::from(body.to_string())))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let ctx = Context::new().with_http_send(EchoHttpSend);
    let client = Client::new(ctx)
        .with_base_uri("https://api.example.com/v1")
        .with_signer(HeaderSigner {
            api_key: "demo-api-key".to_string(),
            api_secret: "demo-api-secret".to_string(),
        });

    let svc = Service::new(client);
    match svc.segment("users").get(&json!({"page": 1})).await {
        Ok(resp) => println!("Request signed successfully: {resp}"),
        Err(e) => eprintln!("Failed to send request: {}", e.custom_message()),
    }

    Ok(())
}
