//! Core components for calling remote platform APIs.
//!
//! This crate provides the foundational types and traits for the remote-api
//! ecosystem: the error taxonomy, the transport seam, the base client and
//! the fluent call path builder.
//!
//! ## Overview
//!
//! The crate is built around several key concepts:
//!
//! - **Context**: A container that holds the transport implementation
//! - **Client**: Verb oriented dispatcher that classifies every failure into [`ErrorKind`]
//! - **SignRequest**: Hook used by signing clients to attach a signature before sending
//! - **Service**: Fluent builder mapping call paths onto client requests and
//!   validating the response envelope
//!
//! ## Example
//!
//! ```no_run
//! use remote_api_core::{Client, Context, Service};
//! use serde_json::json;
//!
//! # async fn example(ctx: Context) -> remote_api_core::Result<()> {
//! let client = Client::new(ctx).with_base_uri("https://api.example.com");
//! let svc = Service::new(client);
//!
//! // GET https://api.example.com/users/list?page=1
//! let users = svc.segment("users").segment("list").get(&json!({"page": 1})).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Every call fails with exactly one of three kinds:
//!
//! - [`ErrorKind::Api`]: HTTP error status, malformed JSON or non-zero envelope code
//! - [`ErrorKind::Connection`]: connection failure other than a timeout
//! - [`ErrorKind::Timeout`]: the transport timed out or received nothing
//!
//! Nothing is retried by this crate.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod envelope;
pub mod error;
pub mod hash;
pub mod query;
pub mod time;
pub mod utils;

pub use error::{Code, Error, ErrorKind, Result};

mod context;
pub use context::{Context, NoopHttpSend};
mod transport;
pub use transport::{ConnectFailure, HttpSend, TransportError};

mod api;
pub use api::SignRequest;
mod request;
pub use request::{Body, Multipart, Options, Part, PartContents, Verb};
mod client;
pub use client::Client;
mod service;
pub use service::{Call, RequestContext, Service};

#[cfg(test)]
mod testing;
