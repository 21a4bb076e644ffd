//! Collaborator implementations: HTTP page fetching, an HTTP classification
//! endpoint, Telegram delivery, and scripted mocks for tests (`test-util`).

pub mod http_analyzer;
pub mod http_fetcher;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod telegram;

use reqwest::StatusCode;

/// Statuses worth retrying: request timeout, rate limiting, server errors.
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}
