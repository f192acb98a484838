//! The signed request envelope.
//!
//! A [`SignedRequest`] describes one authenticated request: method, URL,
//! expiration, the headers chosen for signing, and the signature over all of
//! them. Its lifecycle is construct, [`sign`](SignedRequest::sign), send (see
//! [`wire`](crate::wire)), parse, [`verify`](SignedRequest::verify).
//!
//! An envelope whose signature has not been verified must not be trusted.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::canonical::canonicalize;
use crate::certificates::CertificateSource;
use crate::error::AuthError;
use crate::signer::SignOracle;
use crate::verify::{VerifiedKey, verify_bytes};

/// Request parameters, an expiration, and a signature over both.
///
/// Every field except `signature` is covered by the signature. `headers`
/// holds only the headers the signer chose to include, not every header of
/// the HTTP message.
///
/// Besides the HTTP form (see [`wire`](crate::wire)) the envelope can travel
/// as JSON: `expiration` is RFC 3339 and `headers` maps each lowercase name to
/// its list of values.
///
/// ```json
/// {
///   "method": "PUT",
///   "url": "https://example.com/upload",
///   "expiration": "2030-01-01T00:00:00Z",
///   "headers": { "content-type": ["text/plain"] },
///   "signature": "..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    /// HTTP method, case-sensitive.
    pub method: String,
    /// Full request URL, case-sensitive.
    pub url: String,
    /// Instant after which the request is rejected.
    pub expiration: DateTime<Utc>,
    /// Headers included in the signature.
    #[serde(default, with = "header_lists")]
    pub headers: HeaderMap,
    /// Base64-encoded signature; empty until signed.
    #[serde(default)]
    pub signature: String,
}

impl SignedRequest {
    /// Create an unsigned envelope without selected headers.
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            expiration,
            headers: HeaderMap::new(),
            signature: String::new(),
        }
    }

    /// Add a value for a header that takes part in the signature.
    ///
    /// Calling this repeatedly with the same name adds further values.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// The canonical string covered by the signature.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        canonicalize(&self.method, &self.url, self.expiration, &self.headers)
    }

    /// Whether a signature has been set.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Sign the envelope, replacing any previous signature.
    ///
    /// The oracle is called exactly once. Re-signing unchanged fields is not
    /// guaranteed to produce the same signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SigningFailed`] if the oracle fails; the previous
    /// signature is left untouched in that case.
    pub fn sign(&mut self, oracle: &dyn SignOracle) -> Result<(), AuthError> {
        let canonical = self.canonical_string();
        let signed = oracle
            .sign_bytes(canonical.as_bytes())
            .map_err(AuthError::SigningFailed)?;

        debug!(
            key_name = %signed.key_name,
            method = %self.method,
            url = %self.url,
            "signed request"
        );
        self.signature = STANDARD.encode(signed.signature);
        Ok(())
    }

    /// Verify the signature and expiration against the current time.
    ///
    /// # Errors
    ///
    /// See [`verify_at`](Self::verify_at).
    pub fn verify(&self, source: &dyn CertificateSource) -> Result<VerifiedKey, AuthError> {
        self.verify_at(source, Utc::now())
    }

    /// Verify the signature, then check that `now` is not past the expiration.
    ///
    /// The signature is decoded before any certificate is fetched, and the
    /// expiration is only checked once the signature is known to be valid.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSignatureEncoding`] if the signature is empty or not base64
    /// - any error of [`verify_bytes`] if no current certificate validates it
    /// - [`AuthError::Expired`] if the signature is valid but `now` is after the expiration
    pub fn verify_at(
        &self,
        source: &dyn CertificateSource,
        now: DateTime<Utc>,
    ) -> Result<VerifiedKey, AuthError> {
        if self.signature.is_empty() {
            return Err(AuthError::InvalidSignatureEncoding(
                "signature is empty".to_owned(),
            ));
        }
        let signature = STANDARD
            .decode(&self.signature)
            .map_err(|e| AuthError::InvalidSignatureEncoding(e.to_string()))?;

        let canonical = self.canonical_string();
        let verified = verify_bytes(source, canonical.as_bytes(), &signature)?;

        if now > self.expiration {
            debug!(
                expiration = %self.expiration,
                key_name = %verified.key_name,
                "signed request expired"
            );
            return Err(AuthError::Expired {
                expiration: self.expiration,
            });
        }

        Ok(verified)
    }
}

/// `HeaderMap` as a map of name to value list.
mod header_lists {
    use std::collections::BTreeMap;

    use http::{HeaderMap, HeaderName, HeaderValue};
    use serde::de::Error as _;
    use serde::ser::{Error as _, SerializeMap};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        headers: &HeaderMap,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(headers.keys_len()))?;
        for name in headers.keys() {
            let values = headers
                .get_all(name)
                .iter()
                .map(|value| value.to_str().map_err(S::Error::custom))
                .collect::<Result<Vec<_>, _>>()?;
            map.serialize_entry(name.as_str(), &values)?;
        }
        map.end()
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HeaderMap, D::Error> {
        let lists = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        let mut headers = HeaderMap::new();
        for (name, values) in lists {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(D::Error::custom)?;
            for value in values {
                let value = HeaderValue::from_str(&value).map_err(D::Error::custom)?;
                headers.append(name.clone(), value);
            }
        }
        Ok(headers)
    }
}
