//! OAuth2 access tokens for Google admin APIs, minted from a service-account
//! key with the JWT bearer grant and cached until shortly before expiry.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::utils::HTTP_CLIENT;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const IDENTITY_TOOLKIT_SCOPE: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";

/// Google caps assertion lifetime at one hour
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

/// The fields of a downloaded service-account JSON key this service needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid service account key: {}", e))
    }

    pub fn from_file(path: &str) -> Result<Self, String> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read service account key {}: {}", path, e))?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey) -> Result<Self, String> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| format!("Invalid service account private key: {}", e))?;

        Ok(Self {
            key,
            signing_key,
            cached: RwLock::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signed RS256 assertion for the token endpoint, issued at `issued_at`
    /// (seconds since the epoch).
    fn assertion(&self, issued_at: u64) -> Result<String, String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: IDENTITY_TOOLKIT_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        encode(&header, &claims, &self.signing_key).map_err(|e| format!("Failed to sign assertion: {}", e))
    }

    async fn fetch_token(&self) -> Result<TokenResponse, String> {
        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| format!("System clock before epoch: {}", e))?
            .as_secs();
        let assertion = self.assertion(issued_at)?;

        log::info!("🔑 Requesting access token for {}", self.key.client_email);

        let response = HTTP_CLIENT
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| format!("Failed to reach token endpoint: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Token endpoint error {}: {}", status, body));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| format!("Failed to parse token response: {}", e))
    }

    /// Current access token, minting a new one when the cached token is
    /// missing or about to expire.
    pub async fn access_token(&self) -> Result<String, String> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(current) = cached.as_ref().filter(|c| is_fresh(c)) {
            return Ok(current.token.clone());
        }

        let fetched = self.fetch_token().await?;
        *cached = Some(CachedToken {
            token: fetched.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(fetched.expires_in),
        });

        Ok(fetched.access_token)
    }

    async fn cached_token(&self) -> Option<String> {
        self.cached
            .read()
            .await
            .as_ref()
            .filter(|c| is_fresh(c))
            .map(|c| c.token.clone())
    }
}

fn is_fresh(cached: &CachedToken) -> bool {
    cached.expires_at.saturating_duration_since(Instant::now()) > REFRESH_MARGIN
}
