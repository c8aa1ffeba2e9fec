use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, warn};
use remote_api_app_key::Config;
use remote_api_core::{Client, Context, Error, Result, Service};
use remote_api_http_send_reqwest::ReqwestHttpSend;

use crate::PlatformConfig;

/// Build a [`Context`] sending through reqwest with the timeouts of `config`.
pub fn default_context(config: &PlatformConfig) -> Result<Context> {
    let http = ReqwestHttpSend::with_timeouts(config.timeout()?, config.connect_timeout()?)
        .map_err(|e| Error::config_invalid(format!("build http client: {e}")).with_source(e))?;
    Ok(Context::new().with_http_send(http))
}

/// Build the client variant selected by `config`.
///
/// With both `app_key` and `app_secret` set every request is signed,
/// otherwise requests are sent as they are.
pub fn build_client(ctx: Context, config: &PlatformConfig) -> Result<Client> {
    let mut client = Client::new(ctx);
    if let Some(base_uri) = &config.base_uri {
        client = client.with_base_uri(base_uri);
    }

    match (&config.app_key, &config.app_secret) {
        (Some(app_key), Some(app_secret)) => {
            let mut signer = Config::new()
                .with_app_key(app_key)
                .with_app_secret(app_secret);
            if let Some(ttl) = config.ttl {
                signer = signer.with_ttl(Duration::from_secs(ttl));
            }
            Ok(client.with_signer(signer.into_signer()?))
        }
        (None, None) => Ok(client),
        _ => {
            warn!("only one of app_key and app_secret is set, requests won't be signed");
            Ok(client)
        }
    }
}

/// Named platform services built from configuration.
#[derive(Debug, Clone, Default)]
pub struct Platforms {
    services: BTreeMap<String, Service>,
}

impl Platforms {
    /// Build a service for every configured platform.
    pub fn from_configs<I, K>(configs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, PlatformConfig)>,
        K: Into<String>,
    {
        let mut services = BTreeMap::new();
        for (name, config) in configs {
            let name = name.into();
            let client = default_context(&config)
                .and_then(|ctx| build_client(ctx, &config))
                .map_err(|e| {
                    let message = format!("platform {name}: {}", e.message());
                    Error::config_invalid(message).with_source(e)
                })?;
            debug!("platform {name} loaded with {config:?}");
            services.insert(name, Service::new(client));
        }
        Ok(Self { services })
    }

    /// Load platforms from a toml document with one table per platform.
    ///
    /// ```toml
    /// [shop]
    /// base_uri = "https://shop.example.com/api"
    /// app_key = "key"
    /// app_secret = "secret"
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let configs: BTreeMap<String, PlatformConfig> = toml::from_str(s).map_err(|e| {
            Error::config_invalid(format!("parse platforms: {}", e.message())).with_source(e)
        })?;
        Self::from_configs(configs)
    }

    /// Service of platform `name`.
    pub fn get(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Names of all platforms, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Service)> for Platforms {
    fn from_iter<T: IntoIterator<Item = (String, Service)>>(iter: T) -> Self {
        Self {
            services: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use remote_api_core::ErrorKind;
    use test_case::test_case;

    #[test_case(PlatformConfig::new(), false; "no credential")]
    #[test_case(PlatformConfig::new().with_app_key("key", "secret"), true; "full credential")]
    #[test_case(PlatformConfig { app_key: Some("key".to_string()), ..Default::default() }, false; "key only")]
    #[test_case(PlatformConfig { app_secret: Some("secret".to_string()), ..Default::default() }, false; "secret only")]
    fn test_build_client_variant(config: PlatformConfig, signing: bool) {
        let client = build_client(Context::new(), &config).unwrap();
        assert_eq!(client.is_signing(), signing);
    }

    #[test]
    fn test_build_client_empty_secret() {
        let config = PlatformConfig::new().with_app_key("key", "");
        let err = build_client(Context::new(), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_build_client_base_uri() {
        let config = PlatformConfig::new().with_base_uri("https://api.example.com/v1");
        let client = build_client(Context::new(), &config).unwrap();
        assert_eq!(client.full_url("users"), "https://api.example.com/v1/users");
    }

    #[test]
    fn test_from_toml_str() {
        let platforms = Platforms::from_toml_str(
            r#"
            [shop]
            base_uri = "https://shop.example.com"
            app_key = "key"
            app_secret = "secret"
            ttl = 120

            [crm]
            base_uri = "https://crm.example.com"
            timeout = 3
            "#,
        )
        .unwrap();

        assert_eq!(platforms.names().collect::<Vec<_>>(), vec!["crm", "shop"]);
        assert!(platforms.get("shop").unwrap().client().is_signing());
        assert!(!platforms.get("crm").unwrap().client().is_signing());
        assert!(platforms.get("erp").is_none());
    }

    #[test]
    fn test_collect_services() {
        let service = Service::new(Client::new(Context::new()));
        let platforms: Platforms = [("custom".to_string(), service)].into_iter().collect();
        assert_eq!(platforms.names().collect::<Vec<_>>(), vec!["custom"]);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = Platforms::from_toml_str("[shop]\ntimeout = \"soon\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = Platforms::from_toml_str("[shop]\napp_key = \"key\"\napp_secret = \"\"")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().starts_with("platform shop: "));
    }
}
