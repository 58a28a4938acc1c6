//! Shared HTTP plumbing: client construction, URL joining and the
//! retryable/terminal classification applied to every response.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use alerts_common::error::AlertError;

use crate::retry::{RetryExecutor, RetryPolicy};

pub const CF_API: &str = "CF API";
pub const UAA: &str = "UAA";
pub const CF_NOTIFICATIONS: &str = "CF Notifications";

/// Upper bound on a single request, including reading the response headers.
const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Set by the platform router when no application is bound to a route.
const ROUTER_ERROR_HEADER: &str = "x-cf-routererror";
const UNKNOWN_ROUTE: &[u8] = b"unknown_route";

/// HTTP client that sends every request under a [`RetryPolicy`].
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RetryHttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryHttpClient {
    pub fn new(skip_ssl_validation: bool, policy: RetryPolicy) -> Result<Self, AlertError> {
        let client = Client::builder()
            .timeout(HTTP_CLIENT_TIMEOUT)
            .danger_accept_invalid_certs(skip_ssl_validation)
            .build()
            .map_err(|e| AlertError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send the request produced by `build` until it returns HTTP 200, a
    /// terminal status, or the retry budget runs out.
    ///
    /// `build` is called once per attempt since a request body can only be
    /// sent once.
    pub async fn send<F>(&self, service: &'static str, build: F) -> Result<Response, AlertError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        RetryExecutor::new(service, self.policy.clone())
            .execute(|| {
                let request = build(&self.client);
                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|source| AlertError::Network { service, source })?;
                    check_status(service, response).await
                }
            })
            .await
            .map_err(|e| e.into_alert_error(service))
    }

    /// [`send`](Self::send), then decode the body as JSON. A body that does not
    /// decode is terminal.
    pub async fn send_json<T, F>(&self, service: &'static str, build: F) -> Result<T, AlertError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send(service, build).await?;
        let body = response
            .bytes()
            .await
            .map_err(|source| AlertError::Network { service, source })?;

        serde_json::from_slice(&body).map_err(|e| AlertError::UnparseableResponse {
            service,
            reason: e.to_string(),
        })
    }
}

/// Map a response onto the error taxonomy. Only HTTP 200 counts as success.
pub async fn check_status(service: &'static str, response: Response) -> Result<Response, AlertError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let unknown_route = status == StatusCode::NOT_FOUND
        && response
            .headers()
            .get(ROUTER_ERROR_HEADER)
            .is_some_and(|v| v.as_bytes() == UNKNOWN_ROUTE);

    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));

    Err(match status {
        s if s.is_server_error() => AlertError::ServerError {
            service,
            status: s.as_u16(),
            body,
        },
        StatusCode::NOT_FOUND if unknown_route => AlertError::UnknownRoute { service, body },
        StatusCode::UNAUTHORIZED => AlertError::Unauthorized { service, body },
        StatusCode::FORBIDDEN => AlertError::Forbidden { service, body },
        s => AlertError::UnexpectedStatus {
            service,
            status: s.as_u16(),
            body,
        },
    })
}

/// Append `path` to `base`, keeping any path prefix already on `base`, and
/// set the `q` filter when given.
pub fn join_url(base: &str, path: &str, filter: Option<&str>) -> Result<Url, AlertError> {
    let mut url =
        Url::parse(base).map_err(|e| AlertError::Config(format!("invalid URL '{base}': {e}")))?;

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);

    if let Some(filter) = filter {
        url.query_pairs_mut().append_pair("q", filter);
    }

    Ok(url)
}
