//! Alert send pipeline.
//!
//! A send runs the following steps, each aborting the pipeline on error:
//!
//! 1. discover the token issuer from `GET {cf_api}/v2/info` (memoized)
//! 2. fetch a user token with the password grant
//! 3. resolve the target org, then the space inside it
//! 4. fetch a client token with the client-credentials grant
//! 5. compose the notification
//! 6. `POST {notifications}/spaces/{space_guid}`
//!
//! The pipeline runs as its own task and races the configured global
//! deadline. When the deadline wins, or the caller drops the send, the task
//! is aborted, which drops any request still in flight along with its
//! connection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use alerts_common::config::AlertsConfig;
use alerts_common::error::AlertError;
use alerts_common::types::InfoResponse;

use crate::composer::compose_request;
use crate::http::{CF_API, CF_NOTIFICATIONS, RetryHttpClient, join_url};
use crate::resolver::ResourceResolver;
use crate::retry::RetryPolicy;
use crate::token::{Grant, TokenProvider};

const NOTIFICATIONS_VERSION_HEADER: &str = "X-NOTIFICATIONS-VERSION";
const NOTIFICATIONS_VERSION: &str = "1";

/// Coarse category of a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    ServerError,
    UnknownRoute,
    Unauthorized,
    Forbidden,
    UnexpectedStatus,
    ResourceNotFound,
    UnparseableResponse,
    Timeout,
    Config,
    Internal,
}

impl ErrorKind {
    /// Category of `error`. A give-up error takes the category of the last
    /// failure it wraps.
    pub fn of(error: &AlertError) -> Self {
        match error {
            AlertError::Network { .. } => ErrorKind::Network,
            AlertError::ServerError { .. } => ErrorKind::ServerError,
            AlertError::UnknownRoute { .. } => ErrorKind::UnknownRoute,
            AlertError::Unauthorized { .. } => ErrorKind::Unauthorized,
            AlertError::Forbidden { .. } => ErrorKind::Forbidden,
            AlertError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            AlertError::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            AlertError::UnparseableResponse { .. } => ErrorKind::UnparseableResponse,
            AlertError::RetriesExhausted { source, .. } => ErrorKind::of(source),
            AlertError::Timeout(_) => ErrorKind::Timeout,
            AlertError::Config(_) => ErrorKind::Config,
            AlertError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A failed send, tagged with its category and the org/space it targeted.
#[derive(Debug)]
pub struct DispatchError {
    kind: ErrorKind,
    org: String,
    space: String,
    cause: AlertError,
}

impl DispatchError {
    fn new(cause: AlertError, config: &AlertsConfig) -> Self {
        Self {
            kind: ErrorKind::of(&cause),
            org: config.cf_org.clone(),
            space: config.cf_space.clone(),
            cause,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn cause(&self) -> &AlertError {
        &self.cause
    }

    pub fn into_cause(self) -> AlertError {
        self.cause
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Summary for operators when a service could not be reached. `None`
    /// when the failure was a definite answer, such as a missing space.
    pub fn user_message(&self) -> Option<String> {
        self.cause.is_network_related().then(|| {
            format!(
                "failed to send notification to org: {}, space: {}",
                self.org, self.space
            )
        })
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.cause)
    }
}

/// Everything one dispatcher needs, shared with the pipeline task.
#[derive(Debug)]
struct Session {
    config: AlertsConfig,
    http: RetryHttpClient,
    tokens: TokenProvider,
    resolver: ResourceResolver,
    token_endpoint: OnceCell<String>,
}

impl Session {
    async fn token_endpoint(&self) -> Result<&str, AlertError> {
        self.token_endpoint
            .get_or_try_init(|| async {
                let url = join_url(&self.config.cf_api_url, "/v2/info", None)?;
                let info: InfoResponse = self
                    .http
                    .send_json(CF_API, |client| client.get(url.clone()))
                    .await?;
                tracing::debug!(token_endpoint = %info.token_endpoint, "Discovered token issuer");
                Ok::<_, AlertError>(info.token_endpoint)
            })
            .await
            .map(String::as_str)
    }

    async fn run(&self, alert: &Alert) -> Result<(), AlertError> {
        let token_endpoint = self.token_endpoint().await?;

        let user_token = self
            .tokens
            .obtain_token(
                token_endpoint,
                Grant::Password {
                    username: &self.config.cf_user,
                    password: &self.config.cf_password,
                },
            )
            .await?;

        let space_guid = self
            .resolver
            .resolve_space_guid(&user_token, &self.config.cf_org, &self.config.cf_space)
            .await?;

        let client_token = self
            .tokens
            .obtain_token(
                token_endpoint,
                Grant::ClientCredentials {
                    client_id: &self.config.client_id,
                    client_secret: &self.config.client_secret,
                },
            )
            .await?;

        let request = compose_request(
            &alert.product,
            &alert.subject,
            &alert.service_instance_id,
            &alert.content,
            self.config.reply_to.as_deref(),
            &Utc::now(),
        );

        let url = join_url(
            &self.config.notifications_url,
            &format!("/spaces/{space_guid}"),
            None,
        )?;

        self.http
            .send(CF_NOTIFICATIONS, |client| {
                client
                    .post(url.clone())
                    .header(NOTIFICATIONS_VERSION_HEADER, NOTIFICATIONS_VERSION)
                    .bearer_auth(client_token.as_str())
                    .json(&request)
            })
            .await?;

        tracing::info!(%space_guid, "Service alert sent");
        Ok(())
    }
}

#[derive(Debug)]
struct Alert {
    product: String,
    subject: String,
    service_instance_id: String,
    content: String,
}

/// Aborts the pipeline task when dropped, so a caller that stops waiting
/// also stops the send.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Sends service alerts to the configured org and space.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    session: Arc<Session>,
}

impl AlertDispatcher {
    /// Dispatcher with the default backoff and the configured retry budget.
    pub fn new(config: AlertsConfig) -> Result<Self, AlertError> {
        let policy = RetryPolicy::with_max_elapsed_time(config.retry_timeout());
        Self::with_retry_policy(config, policy)
    }

    pub fn with_retry_policy(config: AlertsConfig, policy: RetryPolicy) -> Result<Self, AlertError> {
        let http = RetryHttpClient::new(config.skip_ssl_validation, policy)?;

        Ok(Self {
            session: Arc::new(Session {
                tokens: TokenProvider::new(http.clone()),
                resolver: ResourceResolver::new(http.clone(), config.cf_api_url.clone()),
                http,
                config,
                token_endpoint: OnceCell::new(),
            }),
        })
    }

    pub fn global_timeout(&self) -> Duration {
        self.session.config.global_timeout()
    }

    /// Run the full pipeline for one alert within the global deadline.
    pub async fn send_alert(
        &self,
        product: &str,
        subject: &str,
        service_instance_id: &str,
        content: &str,
    ) -> Result<(), DispatchError> {
        let alert = Alert {
            product: product.to_string(),
            subject: subject.to_string(),
            service_instance_id: service_instance_id.to_string(),
            content: content.to_string(),
        };
        let deadline = self.global_timeout();
        let span = tracing::info_span!(
            "send_alert",
            alert_id = %Uuid::new_v4(),
            product = %alert.product,
            org = %self.session.config.cf_org,
            space = %self.session.config.cf_space
        );

        let session = Arc::clone(&self.session);
        let mut task = AbortOnDrop(tokio::spawn(
            async move { session.run(&alert).await }.instrument(span),
        ));

        let outcome = match tokio::time::timeout(deadline, &mut task.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AlertError::Internal(format!(
                "alert task failed: {join_error}"
            ))),
            Err(_) => {
                task.0.abort();
                tracing::error!(
                    timeout_secs = deadline.as_secs_f64(),
                    "Sending service alert timed out, aborting in-flight requests"
                );
                Err(AlertError::Timeout(deadline))
            }
        };

        outcome.map_err(|cause| DispatchError::new(cause, &self.session.config))
    }
}
