//! The hyper service that admits only verified signed requests.
//!
//! [`SignedRequestService`] runs each request through:
//!
//! 1. Health check interception (`GET /_signedrequest/health`)
//! 2. Envelope reconstruction from the request head
//! 3. Signature and expiration verification on the blocking pool
//! 4. Request body collection
//! 5. Dispatch to the [`SignedHandler`]
//! 6. Common response headers (`x-request-id`)
//!
//! Verification happens before the body is read, so unauthenticated requests
//! never have their bodies buffered.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::HeaderValue;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::service::Service;
use signedrequest_auth::{CertificateSource, SignedRequest};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::handler::SignedHandler;
use crate::response::{INTERNAL_BODY, json_response, rejection_response, text_response};

/// Path answered by the built-in health check.
pub const HEALTH_PATH: &str = "/_signedrequest/health";

/// Header carrying the per-request identifier on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A hyper service verifying signed requests before dispatching them.
///
/// # Type Parameters
///
/// - `H`: The business logic handler implementing [`SignedHandler`].
pub struct SignedRequestService<H: SignedHandler> {
    handler: Arc<H>,
    certificates: Arc<dyn CertificateSource>,
}

impl<H: SignedHandler> SignedRequestService<H> {
    /// Create a service verifying against `certificates` and dispatching to `handler`.
    #[must_use]
    pub fn new(handler: H, certificates: Arc<dyn CertificateSource>) -> Self {
        Self {
            handler: Arc::new(handler),
            certificates,
        }
    }

    /// Create a service from an `Arc<H>` handler.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, certificates: Arc<dyn CertificateSource>) -> Self {
        Self {
            handler,
            certificates,
        }
    }
}

impl<H: SignedHandler> Clone for SignedRequestService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            certificates: Arc::clone(&self.certificates),
        }
    }
}

impl<H: SignedHandler> fmt::Debug for SignedRequestService<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRequestService").finish_non_exhaustive()
    }
}

impl<H, B> Service<http::Request<B>> for SignedRequestService<H>
where
    H: SignedHandler,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: fmt::Display,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let certificates = Arc::clone(&self.certificates);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response = process_request(req, handler.as_ref(), certificates, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Process an incoming HTTP request through the verification pipeline.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    certificates: Arc<dyn CertificateSource>,
    request_id: &str,
) -> http::Response<Full<Bytes>>
where
    H: SignedHandler,
    B: http_body::Body,
    B::Error: fmt::Display,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing signed request");

    if method == Method::GET && uri.path() == HEALTH_PATH {
        return json_response(StatusCode::OK, r#"{"status":"running"}"#);
    }

    let (parts, body) = req.into_parts();

    let envelope = match SignedRequest::from_parts(&parts) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "not a valid signed request");
            return rejection_response(&err);
        }
    };

    // Certificate sources may block on I/O.
    let verification = tokio::task::spawn_blocking(move || {
        let result = envelope.verify(certificates.as_ref());
        (envelope, result)
    })
    .await;

    let (envelope, verified) = match verification {
        Ok((envelope, Ok(verified))) => (envelope, verified),
        Ok((_, Err(err))) => {
            warn!(%method, %uri, error = %err, request_id, "signed request rejected");
            return rejection_response(&err);
        }
        Err(err) => {
            error!(error = %err, request_id, "verification task failed");
            return text_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_BODY);
        }
    };

    info!(
        %method,
        %uri,
        key_name = %verified.key_name,
        request_id,
        "verified signed request"
    );

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            error!(error = %err, request_id, "failed to collect request body");
            return text_response(StatusCode::BAD_REQUEST, "Failed to read request body.");
        }
    };

    handler.handle_signed(envelope, verified, parts, body).await
}

/// Add headers common to every response.
fn add_common_headers(
    mut response: http::Response<Full<Bytes>>,
    request_id: &str,
) -> http::Response<Full<Bytes>> {
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }
    response
}
