//! HTTP client for the Netatmo weather station API.
//!
//! The client authenticates with the OAuth2 refresh-token grant and reads
//! station data from `getstationsdata`. Access tokens are cached and renewed
//! shortly before they expire; the rotated refresh token returned by the
//! token endpoint replaces the one the client was created with.
//!
//! # Example
//!
//! ```no_run
//! use netatmo_core::{Credentials, NetatmoClient, StationSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NetatmoClient::new(
//!     "https://api.netatmo.com",
//!     Credentials {
//!         client_id: "id".to_string(),
//!         client_secret: "secret".to_string(),
//!         refresh_token: "token".to_string(),
//!     },
//! )?;
//!
//! let stations = client.read().await?;
//! println!("Found {} stations", stations.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use netatmo_types::{Station, parse_stations_data};

use crate::error::{Error, Result};
use crate::traits::StationSource;

/// Default public API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.netatmo.com";

/// Default timeout for a single upstream request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tokens are renewed this long before they expire.
const TOKEN_EXPIRY_MARGIN: time::Duration = time::Duration::seconds(60);

/// OAuth2 application credentials.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
struct TokenState {
    refresh_token: String,
    access_token: Option<String>,
    expires_at: Option<OffsetDateTime>,
}

impl TokenState {
    fn valid_token(&self, now: OffsetDateTime) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if now + TOKEN_EXPIRY_MARGIN < expires_at => {
                Some(token.as_str())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// HTTP client for the Netatmo API.
#[derive(Debug)]
pub struct NetatmoClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    tokens: Mutex<TokenState>,
}

impl NetatmoClient {
    /// Create a new client with the default request timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API base URL (e.g., "https://api.netatmo.com")
    /// * `credentials` - OAuth2 application credentials
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(Error::Http)?;
        Self::with_client(base_url, credentials, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, credentials: Credentials, client: Client) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        Ok(Self {
            client,
            base_url,
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            tokens: Mutex::new(TokenState {
                refresh_token: credentials.refresh_token,
                access_token: None,
                expires_at: None,
            }),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return a valid access token, renewing it if needed.
    async fn access_token(&self) -> Result<String> {
        let mut tokens = self.tokens.lock().await;
        let now = OffsetDateTime::now_utc();
        if let Some(token) = tokens.valid_token(now) {
            return Ok(token.to_string());
        }

        debug!("Renewing access token");
        let url = format!("{}/oauth2/token", self.base_url);
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", tokens.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = self.client.post(&url).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                error_message(&body).unwrap_or(body)
            )));
        }

        let token: TokenResponse = response.json().await?;
        if let Some(refresh_token) = token.refresh_token
            && refresh_token != tokens.refresh_token
        {
            warn!(
                "Refresh token was rotated by the token endpoint; the new token is only kept \
                 in memory, update the configured refresh token before restarting"
            );
            tokens.refresh_token = refresh_token;
        }
        tokens.expires_at = token_expiry(now, token.expires_in)?;
        tokens.access_token = Some(token.access_token.clone());

        Ok(token.access_token)
    }
}

#[async_trait]
impl StationSource for NetatmoClient {
    async fn read(&self) -> Result<Vec<Station>> {
        let token = self.access_token().await?;
        let url = format!("{}/api/getstationsdata", self.base_url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                // Force a token renewal on the next read.
                self.tokens.lock().await.access_token = None;
            }
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&text).unwrap_or_else(|| status.to_string()),
            });
        }

        Ok(parse_stations_data(&body)?)
    }
}

/// Absolute expiry of a token issued at `now` that lives `expires_in` seconds.
fn token_expiry(now: OffsetDateTime, expires_in: Option<i64>) -> Result<Option<OffsetDateTime>> {
    let Some(secs) = expires_in else {
        return Ok(None);
    };
    now.checked_add(time::Duration::seconds(secs))
        .map(Some)
        .ok_or_else(|| Error::Auth(format!("token endpoint returned invalid expires_in: {secs}")))
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    let base_url = base_url.trim_end_matches('/').to_string();

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(Error::InvalidConfig(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }

    Ok(base_url)
}

/// Pull a human-readable message out of an upstream error body.
///
/// The API reports `{"error": {"code": .., "message": ".."}}`; the token
/// endpoint reports `{"error": "invalid_grant"}`.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(String::from)
}
