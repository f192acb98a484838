//! Signed request echo server.
//!
//! Serves a single verifying endpoint: every request must carry a valid
//! signature made by one of the certificates in `CERTIFICATE_DIR` and must
//! not be expired. Verified requests are echoed back as JSON.
//!
//! # Usage
//!
//! ```text
//! CERTIFICATE_DIR=/etc/signedrequest/certs signedrequest-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8787` | Bind address |
//! | `CERTIFICATE_DIR` | `/etc/signedrequest/certs` | Directory of `*.pem` certificates |
//! | `CERTIFICATE_CACHE_TTL_SECS` | `0` | Certificate cache lifetime (0 disables caching) |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod handler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use signedrequest_auth::{CachingCertificateSource, CertificateSource, DirectoryCertificateSource};
use signedrequest_core::SignedRequestConfig;
use signedrequest_http::{HEALTH_PATH, SignedHandler, SignedRequestService};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::EchoHandler;

/// Server version logged at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long `--health-check` waits for the health endpoint.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the certificate source described by the configuration.
fn build_certificate_source(config: &SignedRequestConfig) -> Arc<dyn CertificateSource> {
    let directory = DirectoryCertificateSource::new(&config.certificate_dir);

    if config.certificate_cache_ttl_secs == 0 {
        return Arc::new(directory);
    }

    Arc::new(CachingCertificateSource::new(
        directory,
        Duration::from_secs(config.certificate_cache_ttl_secs),
    ))
}

/// Resolves on Ctrl-C. A failure to install the handler is treated as a signal.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, shutting down");
    }
}

/// Accept connections until Ctrl-C, then wait for in-flight requests.
async fn serve<H: SignedHandler>(
    listener: TcpListener,
    service: SignedRequestService<H>,
) -> Result<()> {
    let graceful = GracefulShutdown::new();
    let builder = HttpConnBuilder::new(TokioExecutor::new());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer_addr) = tokio::select! {
            () = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
        };

        let conn = builder
            .serve_connection(TokioIo::new(stream), service.clone())
            .into_owned();
        let conn = graceful.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!(%peer_addr, error = %e, "connection failed");
            }
        });
    }

    info!("shutdown requested, draining open connections");
    graceful.shutdown().await;
    info!("stopped");
    Ok(())
}

/// Probe the health endpoint of a server listening on `addr`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let probe = async {
        let mut stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("cannot connect to {addr}"))?;
        let request =
            format!("GET {HEALTH_PATH} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await?;

        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        anyhow::Ok(response)
    };
    let response = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe)
        .await
        .with_context(|| format!("no answer from {addr} within {HEALTH_CHECK_TIMEOUT:?}"))??;

    let status_line = response.lines().next().unwrap_or_default();
    anyhow::ensure!(
        status_line.starts_with("HTTP/1.1 200"),
        "health endpoint of {addr} answered {status_line:?}"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = SignedRequestConfig::from_env();

    // Exit status for container health checks.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    config.validate().context("invalid configuration")?;
    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        certificate_dir = %config.certificate_dir,
        certificate_cache_ttl_secs = config.certificate_cache_ttl_secs,
        version = VERSION,
        "starting signed request server",
    );

    let certificates = build_certificate_source(&config);
    let service = SignedRequestService::new(EchoHandler, certificates);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
