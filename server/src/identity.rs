//! Bearer token verification against the identity provider

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// User id for a valid token, `None` for an invalid or expired one.
    async fn verify(&self, token: &str) -> anyhow::Result<Option<String>>;
}

pub struct HttpTokenVerifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct IdentityUser {
    id: String,
}

impl HttpTokenVerifier {
    pub fn new(url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> anyhow::Result<Option<String>> {
        let mut req = self
            .client
            .get(format!("{}/auth/v1/user", self.url))
            .bearer_auth(token);

        if let Some(key) = &self.api_key {
            req = req.header("apikey", key);
        }

        let resp = req.send().await?;
        match resp.status() {
            StatusCode::OK => {
                let user: IdentityUser = resp.json().await?;
                Ok(Some(user.id))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            other => anyhow::bail!("identity provider returned {}", other),
        }
    }
}
