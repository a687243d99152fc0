//! HTTP API client for the Ringline server

use crate::error::{Error, Result};
use crate::models::*;
use crate::ClientConfig;
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.use_tls) // For development
            .build()?;

        Ok(Self {
            client,
            base_url: config.http_url(),
            token: Mutex::new(None),
        })
    }

    /// Bearer token issued by the identity provider.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.lock() = token;
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token.lock().as_ref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Fetch a fresh relay lease for one call attempt.
    pub async fn fetch_relay_credentials(&self) -> Result<RelayCredentialLease> {
        let req = self
            .client
            .get(format!("{}/api/v1/turn/credentials", self.base_url));

        let resp = self.authorized(req).send().await?;
        let resp = check_status(resp).await?;
        let body: RelayCredentialsResponse = resp.json().await?;

        Ok(RelayCredentialLease::new(body.ice_servers))
    }

    /// Ask the server to wake the callee's device.
    pub async fn dispatch_call_push(&self, request: &PushDispatchRequest) -> Result<PushDispatchResponse> {
        let resp = self
            .client
            .post(format!("{}/api/v1/push/call", self.base_url))
            .json(request)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Publish this device's wake-up push token.
    pub async fn register_push_token(&self, platform: Platform, token: &str) -> Result<()> {
        let req = self
            .client
            .post(format!("{}/api/v1/push/register", self.base_url))
            .json(&RegisterPushTokenRequest {
                platform,
                token: token.to_string(),
            });

        let resp = self.authorized(req).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    pub async fn check_health(&self) -> Result<bool> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await;

        match resp {
            Ok(r) => Ok(r.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Map error statuses onto typed errors.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let message = body["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());

    Err(match status {
        StatusCode::BAD_REQUEST => Error::InvalidRequest(message),
        StatusCode::UNAUTHORIZED => Error::Unauthorized,
        StatusCode::BAD_GATEWAY => Error::Upstream(message),
        StatusCode::INTERNAL_SERVER_ERROR if body["error"]["code"] == "NOT_CONFIGURED" => {
            Error::NotConfigured(message)
        }
        _ => Error::Http(format!("{}: {}", status, message)),
    })
}
