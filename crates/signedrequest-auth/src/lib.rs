//! Signed HTTP request envelopes verified against rotating RSA certificates.
//!
//! A producer describes a request (method, URL, expiration and a chosen set of
//! headers), signs a canonical rendering of it with a private key it does not
//! hold directly, and sends it as an ordinary HTTP request. A consumer
//! rebuilds the envelope from that request and verifies the signature against
//! whichever public certificates are currently valid, then checks freshness.
//!
//! # Usage
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use http::{HeaderValue, header::CONTENT_TYPE};
//! use signedrequest_auth::{
//!     DirectoryCertificateSource, RsaKeySigner, SignedRequest,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let signer = RsaKeySigner::from_pem("2024-06", &std::fs::read_to_string("key.pem")?)?;
//!
//! let mut envelope = SignedRequest::new(
//!     "PUT",
//!     "https://example.com/upload",
//!     Utc::now() + Duration::hours(1),
//! )
//! .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
//! envelope.sign(&signer)?;
//! let request = envelope.to_request(())?;
//!
//! // On the receiving side:
//! let (parts, ()) = request.into_parts();
//! let received = SignedRequest::from_parts(&parts)?;
//! received.verify(&DirectoryCertificateSource::new("/etc/signedrequest/certs"))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical string construction
//! - [`certificates`] - Certificate source trait and implementations
//! - [`envelope`] - The [`SignedRequest`] envelope: sign and verify
//! - [`error`] - Authentication error types
//! - [`signer`] - Sign oracle trait and a local RSA signer
//! - [`verify`] - Verification against a rotating certificate set
//! - [`wire`] - Conversion to and from HTTP requests

pub mod canonical;
pub mod certificates;
pub mod envelope;
pub mod error;
mod pem;
pub mod signer;
pub mod verify;
pub mod wire;

pub use canonical::canonicalize;
pub use certificates::{
    CachingCertificateSource, CertificateSource, DirectoryCertificateSource, PublicCertificate,
    StaticCertificateSource,
};
pub use envelope::SignedRequest;
pub use error::{AuthError, BoxError, Rejection};
pub use signer::{RsaKeySigner, SignOracle, SignedBytes};
pub use verify::{VerifiedKey, verify_bytes};
pub use wire::{SIGNATURE_EXPIRATION_HEADER, SIGNATURE_HEADER, SIGNED_HEADERS_HEADER};
