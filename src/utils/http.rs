use lazy_static::lazy_static;
use std::time::Duration;

/// Outbound request timeout for identity provider calls
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

lazy_static! {
    /// Shared HTTP client (connection pool reused across requests)
    pub static ref HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("team-service/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client");
}
