use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::utils::HTTP_CLIENT;

/// Public keys for Firebase ID tokens, in JWK form
const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const JWKS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdTokenClaims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
}

/// Caller identity extracted from a verified ID token
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, String>;
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies RS256 ID tokens issued by Firebase Authentication
pub struct FirebaseTokenVerifier {
    project_id: String,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            keys: RwLock::new(None),
        }
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        validation
    }

    async fn fetch_keys() -> Result<JwkSet, String> {
        log::info!("🔑 Fetching ID token signing keys");

        let response = HTTP_CLIENT
            .get(SECURETOKEN_JWKS_URL)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| format!("Failed to fetch signing keys: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Signing key endpoint error: {}", response.status()));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| format!("Failed to parse signing keys: {}", e))
    }

    /// Decoding key for `kid`, refreshing the cached set when it is stale or
    /// does not know the key.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, String> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                if cached.fetched_at.elapsed() < JWKS_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk).map_err(|e| format!("Invalid signing key: {}", e));
                    }
                }
            }
        }

        let keys = Self::fetch_keys().await?;
        let key = keys
            .find(kid)
            .ok_or_else(|| format!("Unknown signing key: {}", kid))
            .and_then(|jwk| DecodingKey::from_jwk(jwk).map_err(|e| format!("Invalid signing key: {}", e)));

        *self.keys.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key
    }
}

fn identity_from_claims(claims: IdTokenClaims) -> Result<VerifiedIdentity, String> {
    if claims.sub.is_empty() {
        return Err("Invalid token: empty subject".to_string());
    }
    Ok(VerifiedIdentity {
        uid: claims.sub,
        email: claims.email,
    })
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, String> {
        let header = decode_header(token).map_err(|e| format!("Invalid token: {}", e))?;

        if header.alg != Algorithm::RS256 {
            return Err(format!("Invalid token: unexpected algorithm {:?}", header.alg));
        }
        let kid = header
            .kid
            .ok_or_else(|| "Invalid token: missing key id".to_string())?;

        let key = self.decoding_key(&kid).await?;

        let claims = decode::<IdTokenClaims>(token, &key, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| format!("Invalid token: {}", e))?;

        identity_from_claims(claims)
    }
}

/// Verifier that accepts `test-token:<uid>` and rejects everything else
#[cfg(test)]
pub struct StaticTokenVerifier;

#[cfg(test)]
#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, String> {
        token
            .strip_prefix("test-token:")
            .filter(|uid| !uid.is_empty())
            .map(|uid| VerifiedIdentity {
                uid: uid.to_string(),
                email: None,
            })
            .ok_or_else(|| "Invalid token".to_string())
    }
}
