use std::time::Duration;

use serde::Deserialize;

/// Default deadline for a whole send, in seconds.
pub const DEFAULT_GLOBAL_TIMEOUT_SECONDS: u64 = 60;

/// Default retry budget for a single request, in seconds.
pub const DEFAULT_RETRY_TIMEOUT_SECONDS: u64 = 30;

/// Alert delivery configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    /// Platform (CF) API base URL
    pub cf_api_url: String,

    /// Platform user used to look up the target org and space
    pub cf_user: String,

    pub cf_password: String,

    /// Notification service base URL
    pub notifications_url: String,

    /// Organization the alert is sent to
    pub cf_org: String,

    /// Space within `cf_org` the alert is sent to
    pub cf_space: String,

    /// Reply-to address for the email. Omitted from the request when unset.
    pub reply_to: Option<String>,

    /// OAuth client allowed to send notifications
    pub client_id: String,

    pub client_secret: String,

    /// Deadline for the whole send pipeline (default: 60)
    pub global_timeout_seconds: u64,

    /// Retry budget for each individual request (default: 30)
    pub retry_timeout_seconds: u64,

    /// Accept invalid TLS certificates on every endpoint (default: false)
    pub skip_ssl_validation: bool,
}

impl AlertsConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            cf_api_url: required("CF_API_URL")?,
            cf_user: required("CF_USER")?,
            cf_password: required("CF_PASSWORD")?,
            notifications_url: required("NOTIFICATIONS_SERVICE_URL")?,
            cf_org: required("CF_ORG")?,
            cf_space: required("CF_SPACE")?,
            reply_to: std::env::var("NOTIFICATIONS_REPLY_TO")
                .ok()
                .filter(|v| !v.is_empty()),
            client_id: required("NOTIFICATIONS_CLIENT_ID")?,
            client_secret: required("NOTIFICATIONS_CLIENT_SECRET")?,
            global_timeout_seconds: std::env::var("GLOBAL_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DEFAULT_GLOBAL_TIMEOUT_SECONDS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GLOBAL_TIMEOUT_SECONDS must be a valid u64"))?,
            retry_timeout_seconds: std::env::var("RETRY_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DEFAULT_RETRY_TIMEOUT_SECONDS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RETRY_TIMEOUT_SECONDS must be a valid u64"))?,
            skip_ssl_validation: std::env::var("SKIP_SSL_VALIDATION")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SKIP_SSL_VALIDATION must be true or false"))?,
        };

        tracing::debug!(
            cf_api_url = %config.cf_api_url,
            notifications_url = %config.notifications_url,
            cf_org = %config.cf_org,
            cf_space = %config.cf_space,
            "Loaded alert configuration"
        );

        Ok(config)
    }

    /// Deadline for the whole send. Zero falls back to the default.
    pub fn global_timeout(&self) -> Duration {
        match self.global_timeout_seconds {
            0 => Duration::from_secs(DEFAULT_GLOBAL_TIMEOUT_SECONDS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Retry budget for one request. Zero falls back to the default.
    pub fn retry_timeout(&self) -> Duration {
        match self.retry_timeout_seconds {
            0 => Duration::from_secs(DEFAULT_RETRY_TIMEOUT_SECONDS),
            secs => Duration::from_secs(secs),
        }
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{name} environment variable is required"))
}
