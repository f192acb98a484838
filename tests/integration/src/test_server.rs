//! Signed requests over a real HTTP/1.1 connection.

use bytes::Bytes;
use chrono::{Duration, Utc};
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::Full;
use signedrequest_auth::SignedRequest;
use signedrequest_http::HEALTH_PATH;

use crate::{CERT_A, CERT_B, KEY_B, certificates, send_raw, serve_once, service, signer};

fn signed_post(body: &str) -> http::Request<Full<Bytes>> {
    let expiration = Utc::now() + Duration::minutes(5);
    let mut envelope = SignedRequest::new("POST", "/hooks/deploy", expiration)
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    envelope.sign(&signer("key-b", KEY_B)).unwrap();
    envelope
        .to_request(Full::new(Bytes::from(body.to_owned())))
        .unwrap()
}

#[tokio::test]
async fn test_should_accept_signed_request_over_tcp() {
    let addr = serve_once(service(certificates(&[("key-a", CERT_A), ("key-b", CERT_B)]))).await;
    let request = signed_post(r#"{"ref":"main"}"#);

    let response = send_raw(addr, &request, r#"{"ref":"main"}"#).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains("x-request-id: "));
    assert!(response.contains(r#""keyName":"key-b""#), "{response}");
    assert!(response.contains(r#""index":1"#), "{response}");
}

#[tokio::test]
async fn test_should_reject_unsigned_request_over_tcp() {
    let addr = serve_once(service(certificates(&[("key-a", CERT_A)]))).await;
    let request = http::Request::builder()
        .method("POST")
        .uri("/hooks/deploy")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = send_raw(addr, &request, "").await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request"), "{response}");
    assert!(response.ends_with("Not a valid signed request."), "{response}");
}

#[tokio::test]
async fn test_should_reject_signature_from_unknown_key_over_tcp() {
    let addr = serve_once(service(certificates(&[("key-a", CERT_A)]))).await;
    let request = signed_post("{}");

    let response = send_raw(addr, &request, "{}").await;

    assert!(response.starts_with("HTTP/1.1 401 Unauthorized"), "{response}");
    assert!(response.ends_with("Invalid request signature."), "{response}");
    assert!(!response.contains("key-a"));
}

#[tokio::test]
async fn test_should_answer_health_check_over_tcp() {
    let addr = serve_once(service(certificates(&[]))).await;
    let request = http::Request::builder()
        .method("GET")
        .uri(HEALTH_PATH)
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = send_raw(addr, &request, "").await;

    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains(r#"{"status":"running"}"#));
}
