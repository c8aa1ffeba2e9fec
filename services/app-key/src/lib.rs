//! App key request signer.
//!
//! Signs outgoing requests with an app key and secret. The signature is
//! attached as query parameters together with the key, a random nonce and
//! an expiry timestamp.
//!
//! ## Example
//!
//! ```no_run
//! use remote_api_app_key::Config;
//! use remote_api_core::{Client, Context, Service};
//! use serde_json::json;
//!
//! # async fn example(ctx: Context) -> remote_api_core::Result<()> {
//! let signer = Config::new()
//!     .with_app_key("my-key")
//!     .with_app_secret("my-secret")
//!     .into_signer()?;
//!
//! let client = Client::new(ctx)
//!     .with_base_uri("https://api.example.com")
//!     .with_signer(signer);
//!
//! let users = Service::new(client)
//!     .segment("users")
//!     .get(&json!({"page": 1}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod constants;
