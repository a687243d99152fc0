//! Push provider transport (APNs over HTTP/2)

use async_trait::async_trait;
use serde_json::Value;

/// One signed push ready for submission.
#[derive(Debug, Clone)]
pub struct ProviderPush {
    pub endpoint: String,
    pub device_token: String,
    pub authorization: String,
    pub topic: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    pub reason: Option<String>,
}

impl ProviderResponse {
    pub fn is_accepted(&self) -> bool {
        self.status == 200
    }
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Submit a push. `Err` means the provider could not be reached.
    async fn send(&self, push: ProviderPush) -> anyhow::Result<ProviderResponse>;
}

pub struct ApnsTransport {
    client: reqwest::Client,
}

impl ApnsTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PushTransport for ApnsTransport {
    async fn send(&self, push: ProviderPush) -> anyhow::Result<ProviderResponse> {
        let resp = self
            .client
            .post(format!("{}/3/device/{}", push.endpoint, push.device_token))
            .header("authorization", format!("bearer {}", push.authorization))
            .header("apns-topic", &push.topic)
            .header("apns-push-type", "voip")
            .header("apns-priority", "10")
            .header("apns-expiration", "0")
            .json(&push.payload)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let reason = if status == 200 {
            None
        } else {
            // Rejections carry {"reason": "..."}.
            let body: Value = resp.json().await.unwrap_or_default();
            body["reason"].as_str().map(str::to_string)
        };

        Ok(ProviderResponse { status, reason })
    }
}
