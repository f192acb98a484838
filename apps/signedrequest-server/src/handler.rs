//! Echo handler describing each verified request back to the caller.

use bytes::Bytes;
use chrono::SecondsFormat;
use http::StatusCode;
use serde::Serialize;
use signedrequest_auth::{SignedRequest, VerifiedKey};
use signedrequest_http::response::{INTERNAL_BODY, json_response, text_response};
use signedrequest_http::{HandlerFuture, SignedHandler};
use tracing::error;

/// JSON body returned for a verified request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoResponse {
    /// HTTP method covered by the signature.
    pub method: String,
    /// URL covered by the signature.
    pub url: String,
    /// Expiration as RFC 3339.
    pub expiration: String,
    /// Lowercase names of the signed headers.
    pub signed_headers: Vec<String>,
    /// Name of the certificate that verified the signature.
    pub key_name: String,
    /// Length of the (unsigned) request body.
    pub body_length: usize,
}

impl EchoResponse {
    /// Describe a verified envelope.
    #[must_use]
    pub fn new(envelope: &SignedRequest, verified: &VerifiedKey, body: &Bytes) -> Self {
        Self {
            method: envelope.method.clone(),
            url: envelope.url.clone(),
            expiration: envelope
                .expiration
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            signed_headers: envelope
                .headers
                .keys()
                .map(|name| name.as_str().to_owned())
                .collect(),
            key_name: verified.key_name.clone(),
            body_length: body.len(),
        }
    }
}

/// Handler that echoes the verified envelope as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl SignedHandler for EchoHandler {
    fn handle_signed(
        &self,
        envelope: SignedRequest,
        verified: VerifiedKey,
        _parts: http::request::Parts,
        body: Bytes,
    ) -> HandlerFuture {
        let echo = EchoResponse::new(&envelope, &verified, &body);
        Box::pin(async move {
            match serde_json::to_vec(&echo) {
                Ok(json) => json_response(StatusCode::OK, json),
                Err(e) => {
                    error!(error = %e, "failed to serialize echo response");
                    text_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_BODY)
                }
            }
        })
    }
}
