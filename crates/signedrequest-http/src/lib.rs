//! hyper service that admits only verified signed requests.
//!
//! This crate puts the `signedrequest-auth` primitive in front of HTTP
//! business logic. [`SignedRequestService`] rebuilds the signed envelope from
//! each incoming request, verifies it against the configured
//! [`CertificateSource`](signedrequest_auth::CertificateSource), and calls the
//! [`SignedHandler`] only for authentic, unexpired requests. Everything else
//! is answered with a generic rejection (see [`response`]).
//!
//! The URL covered by the signature is the request target exactly as
//! received, so a producer must sign the same form (typically the path and
//! query) that the server sees.

pub mod handler;
pub mod response;
pub mod service;

pub use handler::{HandlerFuture, SignedHandler};
pub use service::{HEALTH_PATH, REQUEST_ID_HEADER, SignedRequestService};
