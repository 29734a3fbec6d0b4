//! Shared HTTP client for provider requests.

use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::error::{Result, ScribeError};

static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

/// Process-wide connection-pooled client.
///
/// Only a connect timeout is set: transcribing a long recording can keep a
/// single request open for minutes, so no overall request deadline applies.
pub fn get_http_client() -> Result<&'static reqwest::Client> {
    HTTP_CLIENT.get_or_try_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| ScribeError::Provider {
                message: format!("Failed to build HTTP client: {err}"),
                status: None,
            })
    })
}
