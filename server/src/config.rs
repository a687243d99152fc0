//! Configuration management for Ringline Server

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub apns: ApnsConfig,
    pub relay: RelayConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApnsEnvironment {
    Sandbox,
    Production,
}

impl ApnsEnvironment {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApnsEnvironment::Sandbox => "https://api.sandbox.push.apple.com",
            ApnsEnvironment::Production => "https://api.push.apple.com",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApnsConfig {
    pub team_id: Option<String>,
    pub key_id: Option<String>,
    /// PEM-encoded PKCS#8 signing key.
    pub private_key: Option<String>,
    pub private_key_path: Option<String>,
    pub bundle_id: String,
    pub environment: ApnsEnvironment,
}

/// Complete APNs signing credentials.
#[derive(Debug, Clone)]
pub struct ApnsCredentials {
    pub team_id: String,
    pub key_id: String,
    pub private_key_pem: String,
    pub bundle_id: String,
    pub environment: ApnsEnvironment,
}

impl ApnsConfig {
    /// Signing credentials, or the name of the first missing one.
    pub fn credentials(&self) -> Result<ApnsCredentials, String> {
        let team_id = non_empty(&self.team_id).ok_or("APNs team id is not configured")?;
        let key_id = non_empty(&self.key_id).ok_or("APNs key id is not configured")?;
        let private_key_pem = self.private_key_pem()?;

        Ok(ApnsCredentials {
            team_id,
            key_id,
            private_key_pem,
            bundle_id: self.bundle_id.clone(),
            environment: self.environment,
        })
    }

    fn private_key_pem(&self) -> Result<String, String> {
        if let Some(pem) = non_empty(&self.private_key) {
            // Keys passed through the environment often carry escaped newlines.
            return Ok(pem.replace("\\n", "\n"));
        }
        match non_empty(&self.private_key_path) {
            Some(path) => std::fs::read_to_string(&path)
                .map_err(|e| format!("APNs private key at {} is unreadable: {}", path, e)),
            None => Err("APNs private key is not configured".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub provider_url: String,
    pub api_key: Option<String>,
}

impl RelayConfig {
    pub fn api_key(&self) -> Option<String> {
        non_empty(&self.api_key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity provider base URL; tokens are checked against `{url}/auth/v1/user`.
    pub url: String,
    pub api_key: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Config {
    pub async fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = fs::read_to_string(path).await?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            let content = toml::to_string_pretty(&config)?;
            fs::write(path, content).await?;
            tracing::info!("Created default config at {}", path);
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("RINGLINE_APNS_PRIVATE_KEY") {
            self.apns.private_key = Some(key);
        }
        if let Ok(key) = std::env::var("RINGLINE_RELAY_API_KEY") {
            self.relay.api_key = Some(key);
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9443,
            },
            storage: StorageConfig {
                database_path: "./data/ringline.db".to_string(),
            },
            apns: ApnsConfig {
                team_id: None,
                key_id: None,
                private_key: None,
                private_key_path: None,
                bundle_id: "com.example.ringline".to_string(),
                environment: ApnsEnvironment::Sandbox,
            },
            relay: RelayConfig {
                provider_url: "https://example.metered.live/api/v1/turn/credentials".to_string(),
                api_key: None,
            },
            auth: AuthConfig {
                url: "https://example.supabase.co".to_string(),
                api_key: None,
            },
        }
    }
}
