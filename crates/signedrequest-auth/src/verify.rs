//! Signature verification against a rotating set of public certificates.
//!
//! During key rotation more than one certificate is valid at the same time:
//! the old key still covers requests signed before the switch while the new
//! key is already advertised. [`verify_bytes`] therefore accepts a signature
//! produced by *any* current certificate:
//!
//! 1. Fetch the current certificate set from the [`CertificateSource`].
//! 2. Walk the set in the order supplied, skipping certificates whose first
//!    PEM block cannot be decoded, parsed as X.509, or that do not carry an RSA key.
//! 3. Check the PKCS#1 v1.5 SHA-256 signature against each usable key. The
//!    first key that validates wins; later certificates are not examined.
//! 4. If nothing matched, report the failure recorded for the last certificate
//!    (or [`AuthError::NoPublicCertificates`] for an empty set).

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};
use x509_cert::Certificate;
use x509_cert::der::Decode;

use crate::certificates::{CertificateSource, PublicCertificate};
use crate::error::AuthError;
use crate::pem;

/// The certificate that validated a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedKey {
    /// Key name of the matching certificate.
    pub key_name: String,
    /// Position of the matching certificate in the fetched set.
    pub index: usize,
}

/// Verify `signature` over `payload` against the current certificate set.
///
/// # Errors
///
/// - [`AuthError::CertificateFetchFailed`] if the source is unavailable
/// - [`AuthError::NoPublicCertificates`] if the source returned nothing
/// - the failure recorded for the last certificate if none validated the
///   signature: [`AuthError::PemDecodeFailure`], [`AuthError::CertificateParse`],
///   [`AuthError::NotRsaPublicKey`] or [`AuthError::SignatureMismatch`]
pub fn verify_bytes(
    source: &dyn CertificateSource,
    payload: &[u8],
    signature: &[u8],
) -> Result<VerifiedKey, AuthError> {
    let certificates = source.current_public_certificates().map_err(|e| {
        error!(error = %e, "failed to fetch public certificates");
        AuthError::CertificateFetchFailed(e)
    })?;

    let hashed = Sha256::digest(payload);
    let mut last_error = AuthError::NoPublicCertificates;

    for (index, certificate) in certificates.iter().enumerate() {
        match verify_with_certificate(certificate, &hashed, signature) {
            Ok(()) => {
                debug!(
                    key_name = %certificate.key_name,
                    index,
                    "signature verified"
                );
                return Ok(VerifiedKey {
                    key_name: certificate.key_name.clone(),
                    index,
                });
            }
            Err(e) => {
                if matches!(e, AuthError::SignatureMismatch { .. }) {
                    debug!(key_name = %certificate.key_name, index, "signature does not match key");
                } else {
                    warn!(
                        key_name = %certificate.key_name,
                        index,
                        error = %e,
                        "skipping unusable public certificate"
                    );
                }
                last_error = e;
            }
        }
    }

    Err(last_error)
}

/// Check a SHA-256 digest and signature against one certificate.
fn verify_with_certificate(
    certificate: &PublicCertificate,
    hashed: &[u8],
    signature: &[u8],
) -> Result<(), AuthError> {
    let public_key = rsa_public_key(certificate)?;
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), hashed, signature)
        .map_err(|source| AuthError::SignatureMismatch {
            key_name: certificate.key_name.clone(),
            source,
        })
}

/// Extract the RSA public key from a PEM-encoded X.509 certificate.
///
/// # Errors
///
/// Returns [`AuthError::PemDecodeFailure`], [`AuthError::CertificateParse`]
/// or [`AuthError::NotRsaPublicKey`] depending on which step failed.
pub fn rsa_public_key(certificate: &PublicCertificate) -> Result<RsaPublicKey, AuthError> {
    let key_name = &certificate.key_name;

    let der = pem::decode_first(&certificate.data).ok_or_else(|| AuthError::PemDecodeFailure {
        key_name: key_name.clone(),
    })?;

    let parsed = Certificate::from_der(&der).map_err(|source| AuthError::CertificateParse {
        key_name: key_name.clone(),
        source,
    })?;

    let spki = &parsed.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
        return Err(AuthError::NotRsaPublicKey {
            key_name: key_name.clone(),
        });
    }

    RsaPublicKey::from_pkcs1_der(spki.subject_public_key.raw_bytes()).map_err(|_| {
        AuthError::NotRsaPublicKey {
            key_name: key_name.clone(),
        }
    })
}
