//! # canopy-remote
//!
//! Access to a remote, job-based geospatial compute API.
//!
//! This crate provides:
//! - [`TokenExchanger`]: signs a service-account assertion (RS256 JWT) and
//!   exchanges it for a short-lived bearer token using the
//!   `urn:ietf:params:oauth:grant-type:jwt-bearer` grant
//! - [`JobPoller`]: submits a serialized computation graph and polls the
//!   resulting job until it completes, fails, or the attempt budget runs out
//! - [`HttpTransport`]: the HTTP seam, implemented over a blocking `reqwest`
//!   client by [`ReqwestTransport`] and by [`ScriptedTransport`] for tests
//!
//! ## Errors
//!
//! Failures are reported as [`RemoteError`], split by what the caller can do
//! about them: configuration and authentication errors are fatal, transient
//! network errors may be retried by a higher layer, and remote computation
//! failures and timeouts are surfaced with their upstream detail.
//!
//! ## Example
//!
//! ```no_run
//! use canopy_remote::{JobPoller, PollPolicy, ReqwestTransport, ServiceAccountCredential, TokenExchanger};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(60))?);
//! let credential = ServiceAccountCredential::from_file("service-account.json")?;
//! let token = TokenExchanger::new(transport.clone(), canopy_remote::DEFAULT_SCOPE)
//!     .get_access_token(&credential)?;
//!
//! let poller = JobPoller::new(
//!     transport,
//!     "https://compute.example.com/v1/projects/demo/value:compute",
//!     "https://compute.example.com/v1",
//!     PollPolicy::default(),
//! );
//! let result = poller.submit_and_await(&token, &serde_json::json!({"constantValue": 1}), Some("demo"))?;
//! println!("{result}");
//! # Ok::<(), canopy_remote::RemoteError>(())
//! ```

mod credential;
mod error;
mod poller;
mod scripted;
mod token;
mod transport;

pub use credential::ServiceAccountCredential;
pub use error::RemoteError;
pub use poller::{JobError, JobHandle, JobPoller, PollPolicy, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
pub use scripted::{RecordedRequest, ScriptedTransport};
pub use token::{
    AccessToken, AssertionClaims, TokenExchanger, DEFAULT_SCOPE, DEFAULT_TOKEN_URI, JWT_BEARER_GRANT,
    TOKEN_LIFETIME_SECS,
};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
