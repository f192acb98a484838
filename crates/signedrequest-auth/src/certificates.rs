//! Public certificate sources.
//!
//! The verifier never owns certificates; it asks a [`CertificateSource`] for
//! the current set on every verification so that certificates added or removed
//! during key rotation take effect immediately. This module provides the
//! trait and three implementations:
//!
//! - [`StaticCertificateSource`] - a fixed list, for tests and embedded keys
//! - [`DirectoryCertificateSource`] - every `*.pem` file in a directory, re-read per call
//! - [`CachingCertificateSource`] - a TTL cache in front of any other source

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::BoxError;

/// A named PEM-encoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicCertificate {
    /// Name of the key this certificate belongs to (informational).
    pub key_name: String,
    /// PEM-encoded certificate bytes.
    pub data: Vec<u8>,
}

impl PublicCertificate {
    /// Create a certificate entry from a key name and PEM bytes.
    pub fn new(key_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key_name: key_name.into(),
            data: data.into(),
        }
    }
}

/// Supplier of the currently valid public certificates.
///
/// Implementations may block on I/O. The order of the returned certificates
/// is the order in which the verifier tries them.
pub trait CertificateSource: Send + Sync {
    /// Return the current certificate set.
    ///
    /// # Errors
    ///
    /// Returns an error if the set cannot be obtained right now.
    fn current_public_certificates(&self) -> Result<Vec<PublicCertificate>, BoxError>;
}

impl<T: CertificateSource + ?Sized> CertificateSource for Arc<T> {
    fn current_public_certificates(&self) -> Result<Vec<PublicCertificate>, BoxError> {
        (**self).current_public_certificates()
    }
}

/// A certificate source backed by a fixed list.
///
/// # Examples
///
/// ```
/// use signedrequest_auth::certificates::{
///     CertificateSource, PublicCertificate, StaticCertificateSource,
/// };
///
/// let source = StaticCertificateSource::new(vec![PublicCertificate::new("k1", "pem")]);
/// assert_eq!(source.current_public_certificates().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCertificateSource {
    certificates: Vec<PublicCertificate>,
}

impl StaticCertificateSource {
    /// Create a source that always returns `certificates`, in order.
    pub fn new(certificates: impl IntoIterator<Item = PublicCertificate>) -> Self {
        Self {
            certificates: certificates.into_iter().collect(),
        }
    }
}

impl CertificateSource for StaticCertificateSource {
    fn current_public_certificates(&self) -> Result<Vec<PublicCertificate>, BoxError> {
        Ok(self.certificates.clone())
    }
}

/// A certificate source that reads every `*.pem` file in a directory.
///
/// The directory is listed on every call. Files are returned sorted by file
/// name and each certificate's key name is the file stem, so
/// `certs/2024-06.pem` becomes key `2024-06`.
#[derive(Debug, Clone)]
pub struct DirectoryCertificateSource {
    dir: PathBuf,
}

impl DirectoryCertificateSource {
    /// Create a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this source reads from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CertificateSource for DirectoryCertificateSource {
    fn current_public_certificates(&self) -> Result<Vec<PublicCertificate>, BoxError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "pem") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut certificates = Vec::with_capacity(paths.len());
        for path in paths {
            let key_name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let data = std::fs::read(&path)?;
            certificates.push(PublicCertificate { key_name, data });
        }

        debug!(
            dir = %self.dir.display(),
            count = certificates.len(),
            "loaded public certificates"
        );
        Ok(certificates)
    }
}

/// A TTL cache in front of another certificate source.
///
/// A fetched set is reused until `ttl` has elapsed, after which the next call
/// fetches again. Failed fetches are not cached. A zero TTL disables caching.
#[derive(Debug)]
pub struct CachingCertificateSource<S> {
    inner: S,
    ttl: Duration,
    cached: Mutex<Option<(Instant, Vec<PublicCertificate>)>>,
}

impl<S: CertificateSource> CachingCertificateSource<S> {
    /// Wrap `inner`, reusing each fetched set for `ttl`.
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Drop the cached set so the next call fetches from the inner source.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

impl<S: CertificateSource> CertificateSource for CachingCertificateSource<S> {
    fn current_public_certificates(&self) -> Result<Vec<PublicCertificate>, BoxError> {
        let mut cached = self.cached.lock();
        if let Some((fetched_at, certificates)) = cached.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(certificates.clone());
            }
        }

        let certificates = self.inner.current_public_certificates()?;
        *cached = Some((Instant::now(), certificates.clone()));
        Ok(certificates)
    }
}
