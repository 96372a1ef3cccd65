//! Shared REST polling client.
//!
//! Thin wrapper over reqwest with a per-request timeout. Polling is
//! best-effort by design: a failed request surfaces as a `Transport` error
//! the caller logs and skips, so there is no retry layer here.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::IngestError;

/// Timeout-bounded JSON GET client for one exchange's REST base URL.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IngestError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| {
                IngestError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// GET `base_url + path` with query parameters, decoding JSON into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, IngestError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Transport(format!(
                "{url} returned HTTP {status}"
            )));
        }

        Ok(response.json::<T>().await?)
    }
}
