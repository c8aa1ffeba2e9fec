//! Call remote platform APIs with signed requests.
//!
//! This crate bundles the core client, the app key signer and the reqwest
//! transport, and wires them from per platform configuration.
//!
//! ```no_run
//! use remote_api::Platforms;
//! use serde_json::json;
//!
//! # async fn example() -> remote_api::Result<()> {
//! let platforms = Platforms::from_toml_str(
//!     r#"
//!     [shop]
//!     base_uri = "https://shop.example.com/api"
//!     app_key = "my-key"
//!     app_secret = "my-secret"
//!     timeout = 5
//!     "#,
//! )?;
//!
//! let shop = platforms.get("shop").expect("shop is configured");
//! let orders = shop.segment("orders").segment("list").get(&json!({"page": 1})).await?;
//! # Ok(())
//! # }
//! ```

pub use remote_api_core::*;

/// App key signing.
pub mod app_key {
    pub use remote_api_app_key::*;
}

pub use remote_api_http_send_reqwest::ReqwestHttpSend;

mod config;
pub use config::PlatformConfig;

mod platforms;
pub use platforms::{build_client, default_context, Platforms};
