use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::debug;

use crate::types::{TokenInfo, TokenKey};
use crate::{ADS_PATH, BOOSTS_PATH, PROFILES_PATH};

/// Result of a single GET against a JSON endpoint.
///
/// Callers treat `Failed` exactly like a feed with no new data: it is counted
/// and logged, never retried within the cycle.
#[derive(Debug)]
pub enum FetchOutcome {
    Data(Value),
    Failed(anyhow::Error),
}

impl FetchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    /// The payload, or `None` for a failed fetch.
    pub fn into_data(self) -> Option<Value> {
        match self {
            FetchOutcome::Data(v) => Some(v),
            FetchOutcome::Failed(_) => None,
        }
    }
}

/// Read-only client for the DexScreener public API.
pub struct DexClient {
    http: reqwest::Client,
    base_url: String,
}

impl DexClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn ads_url(&self) -> String {
        format!("{}{ADS_PATH}", self.base_url)
    }

    pub fn profiles_url(&self) -> String {
        format!("{}{PROFILES_PATH}", self.base_url)
    }

    pub fn boosts_url(&self) -> String {
        format!("{}{BOOSTS_PATH}", self.base_url)
    }

    pub fn orders_url(&self, key: &TokenKey) -> String {
        format!("{}/orders/v1/{}/{}", self.base_url, key.chain_id, key.token_address)
    }

    pub fn token_pairs_url(&self, key: &TokenKey) -> String {
        format!("{}/tokens/v1/{}/{}", self.base_url, key.chain_id, key.token_address)
    }

    /// GET `url` and parse the body as JSON. Any non-success status, transport
    /// error or malformed body becomes `FetchOutcome::Failed`.
    pub async fn fetch_json(&self, url: &str) -> FetchOutcome {
        match self.try_fetch(url).await {
            Ok(body) => FetchOutcome::Data(body),
            Err(e) => {
                debug!("Fetch failed for {url}: {e:#}");
                FetchOutcome::Failed(e)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Value> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {status}"));
        }
        let body = resp.json::<Value>().await.context("malformed JSON body")?;
        Ok(body)
    }

    pub async fn fetch_ads(&self) -> FetchOutcome {
        self.fetch_json(&self.ads_url()).await
    }

    pub async fn fetch_profiles(&self) -> FetchOutcome {
        self.fetch_json(&self.profiles_url()).await
    }

    pub async fn fetch_boosts(&self) -> FetchOutcome {
        self.fetch_json(&self.boosts_url()).await
    }

    pub async fn fetch_orders(&self, key: &TokenKey) -> FetchOutcome {
        self.fetch_json(&self.orders_url(key)).await
    }

    /// Look up current market data for a token.
    ///
    /// Returns the fetch outcome alongside the parsed info so callers can
    /// count failures; a failed lookup yields an empty `TokenInfo`.
    pub async fn fetch_token_info(&self, key: &TokenKey) -> (TokenInfo, FetchOutcome) {
        let outcome = self.fetch_json(&self.token_pairs_url(key)).await;
        let info = match &outcome {
            FetchOutcome::Data(body) => TokenInfo::from_pairs(body, &key.token_address),
            FetchOutcome::Failed(_) => TokenInfo::default(),
        };
        (info, outcome)
    }
}
