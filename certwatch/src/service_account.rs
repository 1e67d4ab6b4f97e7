//! Google service-account authentication (OAuth2 JWT bearer grant)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{CertWatchError, CertWatchResult};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The parts of a service-account key file we need
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> CertWatchResult<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| CertWatchError::file_system("read credentials", path, e))?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::minutes(5) < self.expires_at
    }
}

/// Hands out access tokens for one service account, refreshing as needed
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    scope: String,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, scope: &str, http_client: reqwest::Client) -> Self {
        Self {
            key,
            scope: scope.to_string(),
            http_client,
            cached: Mutex::new(None),
        }
    }

    /// Get a valid access token, exchanging a fresh assertion if necessary
    pub async fn access_token(&self) -> CertWatchResult<String> {
        let now = Utc::now();
        let cached = self.cached.lock().clone();
        if let Some(token) = cached.filter(|t| t.is_fresh(now)) {
            return Ok(token.access_token);
        }

        debug!("Requesting access token for {}", self.key.client_email);
        let token = self.exchange_assertion(now).await?;
        let access_token = token.access_token.clone();
        *self.cached.lock() = Some(token);
        Ok(access_token)
    }

    fn claims(&self, now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        }
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> CertWatchResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&header, &self.claims(now), &key)?)
    }

    async fn exchange_assertion(&self, now: DateTime<Utc>) -> CertWatchResult<CachedToken> {
        let assertion = self.sign_assertion(now)?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response = self
            .http_client
            .post(&self.key.token_uri)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CertWatchError::Authentication {
                service: "Google".to_string(),
                message: format!("token endpoint returned {}: {}", status, body),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            CertWatchError::Authentication {
                service: "Google".to_string(),
                message: format!("unexpected token response: {}", e),
            }
        })?;

        info!("Obtained Google access token for {}", self.key.client_email);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS)),
        })
    }
}
