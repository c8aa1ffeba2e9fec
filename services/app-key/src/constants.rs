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

// Query parameters attached by the signer.
pub const APPKEY: &str = "appkey";
pub const NONCE: &str = "nonce";
pub const EXPIRES: &str = "expires";
pub const SIGNATURE: &str = "signature";

/// Seconds a signature stays valid when no ttl is configured.
pub const DEFAULT_TTL_SECS: u64 = 60;

// The signature is this window of the hex digest.
pub const SIGNATURE_OFFSET: usize = 5;
pub const SIGNATURE_LEN: usize = 10;
