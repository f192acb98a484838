//! End-to-end tests for signed requests.
//!
//! Each test plays both roles: a producer signs an envelope and turns it into
//! an HTTP request, and a consumer verifies it, either in-process through
//! [`SignedRequestService`] or over a real TCP connection.
//!
//! Run them with:
//! ```text
//! cargo test -p signedrequest-integration
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper_util::rt::TokioIo;
use signedrequest_auth::{
    CertificateSource, PublicCertificate, RsaKeySigner, SignedRequest, StaticCertificateSource,
    VerifiedKey,
};
use signedrequest_http::response::json_response;
use signedrequest_http::{HandlerFuture, SignedHandler, SignedRequestService};
use tokio::net::TcpListener;

/// Certificate matching [`KEY_A`].
pub const CERT_A: &str = include_str!("../../../crates/signedrequest-auth/testdata/cert-a.pem");
/// Certificate matching [`KEY_B`].
pub const CERT_B: &str = include_str!("../../../crates/signedrequest-auth/testdata/cert-b.pem");
/// PKCS#8 private key.
pub const KEY_A: &str = include_str!("../../../crates/signedrequest-auth/testdata/key-a.pem");
/// PKCS#1 private key.
pub const KEY_B: &str = include_str!("../../../crates/signedrequest-auth/testdata/key-b.pem");

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Load a signer from one of the fixture keys.
#[must_use]
pub fn signer(key_name: &str, pem: &str) -> RsaKeySigner {
    RsaKeySigner::from_pem(key_name, pem).expect("fixture key should load")
}

/// A certificate source holding the given `(key_name, pem)` pairs in order.
#[must_use]
pub fn certificates(entries: &[(&str, &str)]) -> Arc<dyn CertificateSource> {
    Arc::new(StaticCertificateSource::new(
        entries
            .iter()
            .map(|(name, pem)| PublicCertificate::new(*name, *pem)),
    ))
}

/// Handler answering with the matching key name and the received body.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyNameHandler;

impl SignedHandler for KeyNameHandler {
    fn handle_signed(
        &self,
        envelope: SignedRequest,
        verified: VerifiedKey,
        _parts: http::request::Parts,
        body: Bytes,
    ) -> HandlerFuture {
        let json = serde_json::json!({
            "keyName": verified.key_name,
            "index": verified.index,
            "url": envelope.url,
            "body": String::from_utf8_lossy(&body),
        });
        Box::pin(async move { json_response(StatusCode::OK, json.to_string()) })
    }
}

/// Build the service under test.
#[must_use]
pub fn service(source: Arc<dyn CertificateSource>) -> SignedRequestService<KeyNameHandler> {
    init_tracing();
    SignedRequestService::new(KeyNameHandler, source)
}

/// Serve a single HTTP/1.1 connection on an ephemeral port.
pub async fn serve_once(service: SignedRequestService<KeyNameHandler>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local address");

    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let conn = hyper::server::conn::http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service);
            if let Err(e) = conn.await {
                tracing::error!(error = %e, "connection error");
            }
        }
    });

    addr
}

/// Write `request` as raw HTTP/1.1 to `addr` and return the raw response.
pub async fn send_raw(
    addr: SocketAddr,
    request: &http::Request<Full<Bytes>>,
    body: &str,
) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let mut head = format!(
        "{} {} HTTP/1.1\r\nhost: {addr}\r\nconnection: close\r\ncontent-length: {}\r\n",
        request.method(),
        request.uri(),
        body.len()
    );
    for (name, value) in request.headers() {
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(value.to_str().expect("ascii header value"));
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head.push_str(body);

    let mut stream = TcpStream::connect(addr).await.expect("connect to server");
    stream.write_all(head.as_bytes()).await.expect("write request");

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    response
}

#[cfg(test)]
mod test_roundtrip;
#[cfg(test)]
mod test_rotation;
#[cfg(test)]
mod test_server;
