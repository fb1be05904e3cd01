//! Home Assistant REST client.
//!
//! Only the read endpoints the search engine needs: the API health check
//! and the full state listing. Filtering happens client-side so the same
//! listing contract holds for live and saved snapshots.

use std::time::Duration;

use async_trait::async_trait;
use hearth_core::{EntityRecord, HassConfig, HearthError, RetrievalFailure};
use serde::Deserialize;

use crate::snapshot::{select_entities, EntitySnapshotProvider};

/// Client for the Home Assistant REST API.
///
/// Constructed once by the process entry point and shared behind an `Arc`.
///
/// # Examples
///
/// ```
/// use hearth_hass::HassClient;
///
/// let client = HassClient::new("http://homeassistant.local:8123/", "token").unwrap();
/// assert_eq!(client.base_url(), "http://homeassistant.local:8123");
/// ```
pub struct HassClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HassClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Deserialize)]
struct ApiStatus {
    message: String,
}

impl HassClient {
    /// Create a client with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Hass`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: &str) -> Result<Self, HearthError> {
        Self::build(base_url, token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client from a [`HassConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Config`] if no token is configured.
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_core::HassConfig;
    /// use hearth_hass::HassClient;
    ///
    /// let config = HassConfig { token: Some("abc".into()), ..HassConfig::default() };
    /// let client = HassClient::with_config(&config).unwrap();
    /// assert!(client.base_url().starts_with("http://"));
    /// ```
    pub fn with_config(config: &HassConfig) -> Result<Self, HearthError> {
        let token = config.resolve_token()?;
        Self::build(
            &config.url,
            &token,
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }

    fn build(base_url: &str, token: &str, timeout: Duration) -> Result<Self, HearthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HearthError::Hass(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the API is reachable and the token is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Hass`] describing the connection or auth failure.
    pub async fn check_api(&self) -> Result<String, HearthError> {
        let status: ApiStatus = self.get_json("api/").await?;
        Ok(status.message)
    }

    /// Fetch every entity state.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Hass`] on HTTP or decoding failure.
    pub async fn fetch_states(&self) -> Result<Vec<EntityRecord>, HearthError> {
        let states: Vec<EntityRecord> = self.get_json("api/states").await?;
        tracing::debug!(count = states.len(), "fetched entity states");
        Ok(states)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, HearthError> {
        let response = self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    HearthError::Hass(format!(
                        "cannot connect to Home Assistant at '{}'; check the URL and that Home Assistant is running",
                        self.base_url
                    ))
                } else if e.is_timeout() {
                    HearthError::Hass(format!(
                        "timeout talking to Home Assistant at '{}'",
                        self.base_url
                    ))
                } else {
                    HearthError::Hass(format!("network error accessing {endpoint}: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".into());
            return Err(HearthError::Hass(describe_status(status.as_u16(), endpoint, &body)));
        }

        response
            .json()
            .await
            .map_err(|e| HearthError::Hass(format!("failed to parse response from {endpoint}: {e}")))
    }
}

fn describe_status(status: u16, endpoint: &str, body: &str) -> String {
    match status {
        401 => "authentication failed; check that HASS_TOKEN is valid and has not expired".into(),
        403 => "access forbidden; the token lacks permission for this endpoint".into(),
        404 => format!("Home Assistant API endpoint not found: {endpoint}"),
        500..=599 => format!("Home Assistant server error ({status}): {body}"),
        _ => format!("HTTP error {status} accessing {endpoint}: {body}"),
    }
}

#[async_trait]
impl EntitySnapshotProvider for HassClient {
    async fn list_entities(
        &self,
        domain: Option<&str>,
        search_query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EntityRecord>, RetrievalFailure> {
        let states = self.fetch_states().await?;
        Ok(select_entities(states, domain, search_query, limit))
    }
}
