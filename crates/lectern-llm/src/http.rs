//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Create the HTTP client used by remote providers.
///
/// Config: 30s connect timeout, 120s request timeout, rustls TLS,
/// `lectern/{version}` user-agent, redirect limit 10.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn default_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("lectern/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}
