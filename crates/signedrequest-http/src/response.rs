//! HTTP responses for rejected signed requests.
//!
//! Rejections are deliberately vague: the body says whether the request was
//! not a signed request, expired, or not authentic, but never which
//! certificate failed or why.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;
use signedrequest_auth::{AuthError, Rejection};

/// Body sent for requests that are not signed requests at all.
pub const MALFORMED_BODY: &str = "Not a valid signed request.";

/// Body sent for authentic requests past their expiration.
pub const EXPIRED_BODY: &str = "Signed URL expired.";

/// Body sent for requests whose signature does not authenticate them.
pub const UNAUTHORIZED_BODY: &str = "Invalid request signature.";

/// Body sent when verification could not be performed.
pub const INTERNAL_BODY: &str = "Internal server error.";

/// Build a `text/plain` response.
#[must_use]
pub fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Build a JSON response from an already serialized body.
#[must_use]
pub fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Map a verification failure to the response sent to the client.
///
/// | Rejection | Status | Body |
/// |-----------|--------|------|
/// | bad request | 400 | [`MALFORMED_BODY`] |
/// | expired | 400 | [`EXPIRED_BODY`] |
/// | unauthorized | 401 | [`UNAUTHORIZED_BODY`] |
/// | internal | 500 | [`INTERNAL_BODY`] |
#[must_use]
pub fn rejection_response(err: &AuthError) -> Response<Full<Bytes>> {
    match err.rejection() {
        Rejection::BadRequest => text_response(StatusCode::BAD_REQUEST, MALFORMED_BODY),
        Rejection::Expired => text_response(StatusCode::BAD_REQUEST, EXPIRED_BODY),
        Rejection::Unauthorized => text_response(StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY),
        Rejection::Internal => text_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_BODY),
    }
}
