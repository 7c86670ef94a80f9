//! HTTP client shared by the provider backends.

use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// One client for both the chat and embeddings endpoints. Generation
/// can run long on big prompts, so the overall timeout is generous
/// while the connect timeout stays short.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("docent/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("HTTP client construction")
}
