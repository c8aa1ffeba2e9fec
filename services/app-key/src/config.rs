// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use remote_api_core::utils::Redact;
use remote_api_core::Result;

use crate::constants::DEFAULT_TTL_SECS;
use crate::{Credential, RequestSigner};

/// Config carries all the configuration for app key signing.
#[derive(Clone, Default)]
pub struct Config {
    /// App key sent as `appkey`.
    pub app_key: Option<String>,
    /// Secret used to compute the signature.
    pub app_secret: Option<String>,
    /// How long a signature stays valid, 60 seconds by default.
    pub ttl: Option<Duration>,
}

impl Config {
    /// Create a new Config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set app_key
    pub fn with_app_key(mut self, app_key: impl Into<String>) -> Self {
        self.app_key = Some(app_key.into());
        self
    }

    /// Set app_secret
    pub fn with_app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Set ttl
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Build the signer, failing if the key or the secret is missing.
    pub fn into_signer(self) -> Result<RequestSigner> {
        let cred = Credential::new(
            self.app_key.unwrap_or_default(),
            self.app_secret.unwrap_or_default(),
        )?;
        Ok(RequestSigner::new(cred)
            .with_ttl(self.ttl.unwrap_or(Duration::from_secs(DEFAULT_TTL_SECS))))
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_key", &self.app_key.as_ref().map(Redact::from))
            .field("app_secret", &self.app_secret.as_ref().map(Redact::from))
            .field("ttl", &self.ttl)
            .finish()
    }
}
