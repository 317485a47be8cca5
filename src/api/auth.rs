//! Account registration, password login and profile lookup.

use super::{check_status, default_client, ApiError};
use crate::classify::join_url;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};

/// Bearer token returned by the login endpoint.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AccessToken {
    /// Wraps an existing token, e.g. one read from the environment.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
        }
    }

    /// The raw token value.
    pub fn secret(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Body of the registration endpoint.
#[derive(Clone, Serialize)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for Registration<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Profile of the logged-in user. Optional fields default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub congenital_disorders: Option<String>,
}

/// Accepts a string, a number or null.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Client for the registration, login and profile endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(default_client(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Creates an account. A taken email comes back as HTTP 400.
    pub async fn register(&self, registration: &Registration<'_>) -> Result<(), ApiError> {
        let response = self
            .client
            .post(join_url(&self.base_url, "/auth/register"))
            .header(ACCEPT, "application/json")
            .json(registration)
            .send()
            .await?;
        check_status(response).await?;

        tracing::info!(username = registration.username, "Registered");
        Ok(())
    }

    /// Exchanges a username and password for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken, ApiError> {
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
            ("scope", ""),
            ("client_id", ""),
            ("client_secret", ""),
        ];

        let response = self
            .client
            .post(join_url(&self.base_url, "/login/"))
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;
        let token = check_status(response).await?.json::<AccessToken>().await?;

        tracing::info!(username, "Logged in");
        Ok(token)
    }

    /// Fetches the profile of the token's user.
    pub async fn profile(&self, token: &AccessToken) -> Result<UserProfile, ApiError> {
        let response = self
            .client
            .get(join_url(&self.base_url, "/users/profile"))
            .header(ACCEPT, "application/json")
            .bearer_auth(token.secret())
            .send()
            .await?;
        Ok(check_status(response).await?.json::<UserProfile>().await?)
    }
}
