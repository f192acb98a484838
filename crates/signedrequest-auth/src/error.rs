//! Error types for signed-request authentication.
//!
//! All signing and verification failures are represented by [`AuthError`].
//! Failures tied to one certificate of the rotating set (`PemDecodeFailure`,
//! `CertificateParse`, `NotRsaPublicKey`, `SignatureMismatch`) are only
//! reported when no certificate in the set validated the signature.

use chrono::{DateTime, Utc};

/// Boxed error returned by external collaborators (sign oracle, certificate source).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while signing or verifying a signed request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The sign oracle failed to produce a signature.
    #[error("signing failed: {0}")]
    SigningFailed(#[source] BoxError),

    /// The certificate source could not supply the current certificate set.
    #[error("failed to fetch public certificates: {0}")]
    CertificateFetchFailed(#[source] BoxError),

    /// The certificate source returned an empty set.
    #[error("no public certificates available")]
    NoPublicCertificates,

    /// A certificate's data did not contain a decodable PEM block.
    #[error("failed to decode PEM block of certificate {key_name}")]
    PemDecodeFailure {
        /// Name of the offending certificate.
        key_name: String,
    },

    /// A certificate's DER body was not a valid X.509 certificate.
    #[error("failed to parse X.509 certificate {key_name}: {source}")]
    CertificateParse {
        /// Name of the offending certificate.
        key_name: String,
        /// The underlying DER decoding error.
        #[source]
        source: x509_cert::der::Error,
    },

    /// A certificate's public key is not an RSA key.
    #[error("certificate {key_name} does not carry an RSA public key")]
    NotRsaPublicKey {
        /// Name of the offending certificate.
        key_name: String,
    },

    /// The signature did not verify against the certificate's RSA key.
    #[error("signature does not match certificate {key_name}")]
    SignatureMismatch {
        /// Name of the certificate checked last.
        key_name: String,
        /// The underlying RSA verification error.
        #[source]
        source: rsa::Error,
    },

    /// The `signature` field was empty or not valid base64.
    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    /// The signature is valid but the request is past its expiration.
    #[error("signed request expired at {expiration}")]
    Expired {
        /// The expiration carried by the request.
        expiration: DateTime<Utc>,
    },

    /// The wire representation is missing a required field or is unparsable.
    #[error("malformed signed request: {0}")]
    MalformedEnvelope(String),
}

/// How an HTTP-facing caller should reject a request that failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The request is not a signed request at all.
    BadRequest,
    /// The request carries a signature that does not authenticate it.
    Unauthorized,
    /// The request was authentic but has expired.
    Expired,
    /// A collaborator failed; the request could not be judged.
    Internal,
}

impl AuthError {
    /// Classify this error for response mapping.
    ///
    /// The classification never distinguishes which certificate failed or why.
    #[must_use]
    pub fn rejection(&self) -> Rejection {
        match self {
            Self::MalformedEnvelope(_) => Rejection::BadRequest,
            Self::Expired { .. } => Rejection::Expired,
            Self::SigningFailed(_) | Self::CertificateFetchFailed(_) => Rejection::Internal,
            Self::NoPublicCertificates
            | Self::PemDecodeFailure { .. }
            | Self::CertificateParse { .. }
            | Self::NotRsaPublicKey { .. }
            | Self::SignatureMismatch { .. }
            | Self::InvalidSignatureEncoding(_) => Rejection::Unauthorized,
        }
    }
}
