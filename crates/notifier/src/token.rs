//! OAuth2 bearer tokens from the platform's token issuer (UAA).

use std::fmt;

use alerts_common::error::AlertError;
use alerts_common::types::TokenResponse;

use crate::http::{RetryHttpClient, UAA, join_url};

/// Public client the platform CLI uses for the password grant. It has no secret.
pub const PUBLIC_CLIENT_ID: &str = "cf";

/// Credentials and grant type for one token request.
#[derive(Clone, Copy)]
pub enum Grant<'a> {
    /// Acts as an OAuth client in its own right.
    ClientCredentials {
        client_id: &'a str,
        client_secret: &'a str,
    },
    /// Acts on behalf of a platform user.
    Password {
        username: &'a str,
        password: &'a str,
    },
}

impl Grant<'_> {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::ClientCredentials { .. } => "client_credentials",
            Grant::Password { .. } => "password",
        }
    }
}

impl fmt::Debug for Grant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grant::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Grant::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// An opaque bearer token. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Requests fresh tokens from `{token_endpoint}/oauth/token`.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    http: RetryHttpClient,
}

impl TokenProvider {
    pub fn new(http: RetryHttpClient) -> Self {
        Self { http }
    }

    pub async fn obtain_token(
        &self,
        token_endpoint: &str,
        grant: Grant<'_>,
    ) -> Result<AuthToken, AlertError> {
        let url = join_url(token_endpoint, "/oauth/token", None)?;
        tracing::debug!(grant = grant.grant_type(), %url, "Requesting token");

        let response: TokenResponse = self
            .http
            .send_json(UAA, |client| {
                let request = client.post(url.clone());
                match grant {
                    Grant::ClientCredentials {
                        client_id,
                        client_secret,
                    } => request
                        .basic_auth(client_id, Some(client_secret))
                        .form(&[("grant_type", "client_credentials")]),
                    Grant::Password { username, password } => request
                        .basic_auth(PUBLIC_CLIENT_ID, Some(""))
                        .form(&[
                            ("grant_type", "password"),
                            ("username", username),
                            ("scope", ""),
                            ("password", password),
                        ]),
                }
            })
            .await?;

        Ok(AuthToken(response.access_token))
    }
}
