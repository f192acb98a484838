//! Certificate rotation as seen by a consumer.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use signedrequest_auth::{
    AuthError, CachingCertificateSource, CertificateSource, DirectoryCertificateSource,
    SignedRequest,
};

use crate::{CERT_A, CERT_B, KEY_A, KEY_B, certificates, signer};

fn signed_with(key_name: &str, pem: &str) -> SignedRequest {
    let mut envelope = SignedRequest::new("GET", "/report", Utc::now() + Duration::hours(1));
    envelope.sign(&signer(key_name, pem)).unwrap();
    envelope
}

#[test]
fn test_should_accept_requests_from_old_and_new_keys_during_rotation() {
    let source = certificates(&[("old", CERT_A), ("new", CERT_B)]);

    let old = signed_with("old", KEY_A).verify(source.as_ref()).unwrap();
    let new = signed_with("new", KEY_B).verify(source.as_ref()).unwrap();

    assert_eq!((old.key_name.as_str(), old.index), ("old", 0));
    assert_eq!((new.key_name.as_str(), new.index), ("new", 1));
}

#[test]
fn test_should_reject_requests_from_retired_key() {
    let source = certificates(&[("new", CERT_B)]);

    let err = signed_with("old", KEY_A).verify(source.as_ref()).unwrap_err();

    assert!(matches!(err, AuthError::SignatureMismatch { ref key_name, .. } if key_name == "new"));
}

#[test]
fn test_should_pick_up_rotated_certificates_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("2024-01.pem"), CERT_A).unwrap();
    let source = DirectoryCertificateSource::new(dir.path());
    let envelope = signed_with("2024-07", KEY_B);

    assert!(envelope.verify(&source).is_err());

    std::fs::write(dir.path().join("2024-07.pem"), CERT_B).unwrap();
    let verified = envelope.verify(&source).unwrap();
    assert_eq!(verified.key_name, "2024-07");

    std::fs::remove_file(dir.path().join("2024-01.pem")).unwrap();
    assert_eq!(source.current_public_certificates().unwrap().len(), 1);
    assert!(signed_with("2024-01", KEY_A).verify(&source).is_err());
}

#[test]
fn test_should_serve_cached_certificates_until_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("2024-01.pem"), CERT_A).unwrap();
    let source = CachingCertificateSource::new(
        DirectoryCertificateSource::new(dir.path()),
        StdDuration::from_secs(3600),
    );
    let envelope = signed_with("2024-07", KEY_B);

    assert!(envelope.verify(&source).is_err());
    std::fs::write(dir.path().join("2024-07.pem"), CERT_B).unwrap();
    assert!(envelope.verify(&source).is_err());

    source.invalidate();
    assert_eq!(envelope.verify(&source).unwrap().key_name, "2024-07");
}
