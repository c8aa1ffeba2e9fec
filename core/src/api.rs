use std::fmt::Debug;

use crate::{Body, Context, Result};

/// SignRequest is the trait used by the client to sign outgoing requests.
///
/// A signer runs right before the request is handed to the transport. It may
/// rewrite the request parts (usually the query string) but never the body.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + 'static {
    /// Sign the request in place.
    ///
    /// ## Body
    ///
    /// The body is passed for inspection only. Implementations decide which
    /// body types take part in the signature; multipart bodies are expected
    /// to pass through untouched because their fields are signed up front
    /// by [`SignRequest::sign_fields`].
    async fn sign_request(
        &self,
        ctx: &Context,
        parts: &mut http::request::Parts,
        body: &Body,
    ) -> Result<()>;

    /// Sign a set of plain fields and return the signature pairs to attach
    /// to the query string.
    ///
    /// Used for multipart uploads where the body can't be rewound and
    /// inspected once it is built.
    fn sign_fields(&self, fields: Vec<(String, String)>) -> Result<Vec<(String, String)>>;
}
