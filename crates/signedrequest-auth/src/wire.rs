//! Conversion between [`SignedRequest`] and HTTP requests.
//!
//! The envelope travels as an ordinary HTTP request. Method and URL are the
//! request's own; the selected headers are sent as regular headers; three
//! dedicated headers carry the rest:
//!
//! - `Signature` - base64 signature
//! - `Signature-Expiration` - RFC 3339 timestamp with whole seconds
//! - `Signed-Headers` - comma-separated names of the selected headers
//!
//! `Signed-Headers` tells the verifier exactly which subset of the message's
//! headers to canonicalize; other headers added in transit are ignored. The
//! request body is never part of the signature.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use http::header::GetAll;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

use crate::envelope::SignedRequest;
use crate::error::AuthError;

/// Header carrying the base64 signature.
pub const SIGNATURE_HEADER: &str = "signature";

/// Header carrying the RFC 3339 expiration.
pub const SIGNATURE_EXPIRATION_HEADER: &str = "signature-expiration";

/// Header listing the names of the signed headers.
pub const SIGNED_HEADERS_HEADER: &str = "signed-headers";

const RESERVED_HEADERS: [&str; 3] = [
    SIGNATURE_HEADER,
    SIGNATURE_EXPIRATION_HEADER,
    SIGNED_HEADERS_HEADER,
];

fn is_reserved(name: &HeaderName) -> bool {
    RESERVED_HEADERS.contains(&name.as_str())
}

impl SignedRequest {
    /// Build an HTTP request carrying this envelope.
    ///
    /// `Signed-Headers` is always written, empty when no headers were
    /// selected.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedEnvelope`] if the method or URL is not
    /// valid HTTP, if the URL is not already in the form the request line will
    /// carry, if a selected header uses one of the dedicated header names, if
    /// the expiration year is outside `0000..=9999`, or if the signature is
    /// not a valid header value.
    pub fn to_request<B>(&self, body: B) -> Result<http::Request<B>, AuthError> {
        let method = Method::from_bytes(self.method.as_bytes()).map_err(|_| {
            AuthError::MalformedEnvelope(format!("invalid method: {}", self.method))
        })?;
        let uri: Uri = self
            .url
            .parse()
            .map_err(|e| AuthError::MalformedEnvelope(format!("invalid url {}: {e}", self.url)))?;
        // The verifier signs over the URI as it appears on the wire.
        if uri.to_string() != self.url {
            return Err(AuthError::MalformedEnvelope(format!(
                "url {} is not normalized, use {uri}",
                self.url
            )));
        }

        if let Some(name) = self.headers.keys().find(|name| is_reserved(name)) {
            return Err(AuthError::MalformedEnvelope(format!(
                "{name} cannot be a signed header"
            )));
        }
        // RFC 3339 only has four-digit years.
        if !(0..=9999).contains(&self.expiration.year()) {
            return Err(AuthError::MalformedEnvelope(format!(
                "expiration {} is not representable in RFC 3339",
                self.expiration
            )));
        }

        let mut request = http::Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;

        let headers = request.headers_mut();
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }

        let signature = HeaderValue::from_str(&self.signature).map_err(|_| {
            AuthError::MalformedEnvelope("signature is not a valid header value".to_owned())
        })?;
        headers.insert(HeaderName::from_static(SIGNATURE_HEADER), signature);

        let expiration = self.expiration.to_rfc3339_opts(SecondsFormat::Secs, true);
        headers.insert(
            HeaderName::from_static(SIGNATURE_EXPIRATION_HEADER),
            HeaderValue::from_str(&expiration).map_err(|_| {
                AuthError::MalformedEnvelope(format!("invalid expiration: {expiration}"))
            })?,
        );

        let signed_names: Vec<&str> = self.headers.keys().map(HeaderName::as_str).collect();
        headers.insert(
            HeaderName::from_static(SIGNED_HEADERS_HEADER),
            HeaderValue::from_str(&signed_names.join(",")).map_err(|_| {
                AuthError::MalformedEnvelope("invalid signed header names".to_owned())
            })?,
        );

        Ok(request)
    }

    /// Reconstruct an envelope from the head of a received HTTP request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedEnvelope`] if `Signature-Expiration` is
    /// missing or not RFC 3339, or if `Signed-Headers` names a header that is
    /// invalid or absent from the request. A missing `Signature` yields an
    /// unsigned envelope and a missing `Signed-Headers` yields no selected
    /// headers; both are rejected later by [`verify`](SignedRequest::verify)
    /// if they do not match what was signed.
    pub fn from_parts(parts: &http::request::Parts) -> Result<Self, AuthError> {
        parse_envelope(&parts.method, &parts.uri, &parts.headers)
    }

    /// Reconstruct an envelope from a received HTTP request.
    ///
    /// # Errors
    ///
    /// See [`from_parts`](Self::from_parts).
    pub fn from_request<B>(request: &http::Request<B>) -> Result<Self, AuthError> {
        parse_envelope(request.method(), request.uri(), request.headers())
    }
}

fn parse_envelope(
    method: &Method,
    uri: &Uri,
    message_headers: &HeaderMap,
) -> Result<SignedRequest, AuthError> {
    let signature = message_headers
        .get(SIGNATURE_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default();

    let expiration = parse_expiration(message_headers)?;
    let headers = collect_signed_headers(
        message_headers,
        message_headers.get_all(SIGNED_HEADERS_HEADER),
    )?;

    Ok(SignedRequest {
        method: method.as_str().to_owned(),
        url: uri.to_string(),
        expiration,
        headers,
        signature,
    })
}

fn parse_expiration(headers: &HeaderMap) -> Result<DateTime<Utc>, AuthError> {
    let value = headers.get(SIGNATURE_EXPIRATION_HEADER).ok_or_else(|| {
        AuthError::MalformedEnvelope("missing Signature-Expiration header".to_owned())
    })?;
    let text = value.to_str().map_err(|_| {
        AuthError::MalformedEnvelope("Signature-Expiration is not valid ASCII".to_owned())
    })?;

    DateTime::parse_from_rfc3339(text.trim())
        .map(|expiration| expiration.with_timezone(&Utc))
        .map_err(|e| {
            AuthError::MalformedEnvelope(format!("invalid Signature-Expiration {text:?}: {e}"))
        })
}

/// Copy every value of each listed header from the message, in order.
fn collect_signed_headers(
    message_headers: &HeaderMap,
    signed_header_lists: GetAll<'_, HeaderValue>,
) -> Result<HeaderMap, AuthError> {
    let mut selected = HeaderMap::new();

    for list in signed_header_lists {
        let list = list.to_str().map_err(|_| {
            AuthError::MalformedEnvelope("Signed-Headers is not valid ASCII".to_owned())
        })?;

        for raw_name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let name = HeaderName::from_bytes(raw_name.as_bytes()).map_err(|_| {
                AuthError::MalformedEnvelope(format!("invalid signed header name: {raw_name}"))
            })?;
            if is_reserved(&name) {
                return Err(AuthError::MalformedEnvelope(format!(
                    "{name} cannot be a signed header"
                )));
            }
            if selected.contains_key(&name) {
                continue;
            }

            let mut values = message_headers.get_all(&name).iter().peekable();
            if values.peek().is_none() {
                return Err(AuthError::MalformedEnvelope(format!(
                    "missing signed header: {name}"
                )));
            }
            for value in values {
                selected.append(name.clone(), value.clone());
            }
        }
    }

    Ok(selected)
}
