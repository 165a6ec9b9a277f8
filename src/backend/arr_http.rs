//! Shared HTTP transport for the *arr v3 APIs.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

const API_KEY_HEADER: &str = "X-Api-Key";

/// Authenticated JSON client bound to one back-end instance.
#[derive(Clone)]
pub struct ArrHttp {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ArrHttp {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the back-end (e.g., "http://localhost:8989")
    /// * `api_key` - API key sent with every request
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` with query parameters and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned an error status", url))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response of GET {}", url))
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?
            .error_for_status()
            .with_context(|| format!("POST {} returned an error status", url))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response of POST {}", url))
    }
}
