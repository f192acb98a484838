//! The handler boundary for verified requests.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::Full;
use signedrequest_auth::{SignedRequest, VerifiedKey};

/// Boxed future returned by [`SignedHandler::handle_signed`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = http::Response<Full<Bytes>>> + Send>>;

/// Business logic invoked only for requests whose signature verified and
/// whose expiration has not passed.
///
/// The handler receives the verified envelope, the certificate that matched,
/// and the raw request parts and body. The body is not covered by the
/// signature.
pub trait SignedHandler: Send + Sync + 'static {
    /// Handle a verified request and produce a response.
    fn handle_signed(
        &self,
        envelope: SignedRequest,
        verified: VerifiedKey,
        parts: http::request::Parts,
        body: Bytes,
    ) -> HandlerFuture;
}
