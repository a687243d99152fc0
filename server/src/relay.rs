//! Upstream relay (TURN) credential provider

use async_trait::async_trait;
use serde_json::{json, Value};

#[async_trait]
pub trait RelayProvider: Send + Sync {
    /// Fetch a fresh set of ICE servers. The result is passed to clients
    /// verbatim and never cached.
    async fn fetch_ice_servers(&self, api_key: &str) -> anyhow::Result<Value>;
}

pub struct HttpRelayProvider {
    client: reqwest::Client,
    provider_url: String,
}

impl HttpRelayProvider {
    pub fn new(provider_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            provider_url: provider_url.to_string(),
        })
    }
}

#[async_trait]
impl RelayProvider for HttpRelayProvider {
    async fn fetch_ice_servers(&self, api_key: &str) -> anyhow::Result<Value> {
        let resp = self
            .client
            .get(&self.provider_url)
            .query(&[("apiKey", api_key)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("relay provider returned {}", status);
        }

        let body: Value = resp.json().await?;
        Ok(body)
    }
}

/// Wrap an upstream body as `{"iceServers": ...}` unless it already is.
pub fn ice_servers_body(upstream: Value) -> Value {
    match upstream {
        Value::Object(ref map) if map.contains_key("iceServers") => upstream,
        other => json!({ "iceServers": other }),
    }
}
