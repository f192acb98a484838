//! Sign, send, and verify through the in-process service.

use chrono::{Duration, Utc};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderName, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::service::Service;
use signedrequest_auth::{AuthError, SignedRequest};

use crate::{CERT_A, KEY_A, certificates, service, signer};

async fn json_body(response: http::Response<Full<bytes::Bytes>>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn signed_upload(expires_in: Duration) -> SignedRequest {
    let mut envelope = SignedRequest::new("PUT", "/upload?part=1", Utc::now() + expires_in)
        .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
        .with_header(
            HeaderName::from_static("x-upload-owner"),
            HeaderValue::from_static("alice"),
        );
    envelope.sign(&signer("key-a", KEY_A)).unwrap();
    envelope
}

#[test]
fn test_should_verify_envelope_reconstructed_from_wire() {
    let envelope = signed_upload(Duration::hours(1));
    let request = envelope.to_request(()).unwrap();

    let received = SignedRequest::from_request(&request).unwrap();

    assert_eq!(received.method, envelope.method);
    assert_eq!(received.url, envelope.url);
    assert_eq!(received.headers, envelope.headers);
    assert_eq!(received.canonical_string(), envelope.canonical_string());
    let verified = received
        .verify(certificates(&[("key-a", CERT_A)]).as_ref())
        .unwrap();
    assert_eq!(verified.key_name, "key-a");
}

#[test]
fn test_should_ignore_unsigned_headers_added_in_transit() {
    let envelope = signed_upload(Duration::hours(1));
    let mut request = envelope.to_request(()).unwrap();
    request
        .headers_mut()
        .insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));

    let received = SignedRequest::from_request(&request).unwrap();

    assert!(!received.headers.contains_key("x-forwarded-for"));
    assert!(received.verify(certificates(&[("key-a", CERT_A)]).as_ref()).is_ok());
}

#[test]
fn test_should_detect_signed_header_changed_in_transit() {
    let envelope = signed_upload(Duration::hours(1));
    let mut request = envelope.to_request(()).unwrap();
    request
        .headers_mut()
        .insert("x-upload-owner", HeaderValue::from_static("mallory"));

    let received = SignedRequest::from_request(&request).unwrap();
    let err = received
        .verify(certificates(&[("key-a", CERT_A)]).as_ref())
        .unwrap_err();

    assert!(matches!(err, AuthError::SignatureMismatch { .. }));
}

#[tokio::test]
async fn test_should_pass_verified_request_to_handler() {
    let envelope = signed_upload(Duration::minutes(5));
    let request = envelope
        .to_request(Full::new(bytes::Bytes::from_static(b"file contents")))
        .unwrap();

    let response = service(certificates(&[("key-a", CERT_A)]))
        .call(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["keyName"], "key-a");
    assert_eq!(json["url"], "/upload?part=1");
    assert_eq!(json["body"], "file contents");
}

#[tokio::test]
async fn test_should_reject_replay_with_different_method() {
    let envelope = signed_upload(Duration::minutes(5));
    let mut request = envelope
        .to_request(Full::new(bytes::Bytes::new()))
        .unwrap();
    *request.method_mut() = Method::DELETE;

    let response = service(certificates(&[("key-a", CERT_A)]))
        .call(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_should_reject_expired_request_with_valid_signature() {
    let envelope = signed_upload(-Duration::seconds(1));
    let request = envelope
        .to_request(Full::new(bytes::Bytes::new()))
        .unwrap();

    let response = service(certificates(&[("key-a", CERT_A)]))
        .call(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Signed URL expired.");
}
