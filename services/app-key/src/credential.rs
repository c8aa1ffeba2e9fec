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

use remote_api_core::utils::Redact;
use remote_api_core::{Error, Result};

/// Credential for app key signing.
#[derive(Clone)]
pub struct Credential {
    /// App key sent with every request as `appkey`.
    pub app_key: String,
    /// Secret used as the HMAC key, never sent.
    pub app_secret: String,
}

impl Credential {
    /// Create a new credential.
    ///
    /// Both the key and the secret must be non-empty.
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Result<Self> {
        let cred = Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        };
        if !cred.is_valid() {
            return Err(Error::config_invalid("need app_key and app_secret"));
        }
        Ok(cred)
    }

    /// Check if the credential can sign requests.
    pub fn is_valid(&self) -> bool {
        !self.app_key.is_empty() && !self.app_secret.is_empty()
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("app_key", &Redact::from(&self.app_key))
            .field("app_secret", &Redact::from(&self.app_secret))
            .finish()
    }
}
