//! Shared HTTP client for provider and identity endpoints.

use std::sync::LazyLock;
use std::time::Duration;

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Returns a handle to the process-wide client. Clones share one pool.
pub(crate) fn client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}
