use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

use crate::config::AppConfig;
use crate::services::google_auth_service::ServiceAccountTokenSource;
use crate::utils::HTTP_CLIENT;

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com";

/// Profile attributes the provider holds for an identity
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum IdentityError {
    /// The provider has no identity with this id
    NotFound(String),
    /// Transport failure or an error answer from the provider
    Provider(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::NotFound(uid) => write!(f, "identity {} not found", uid),
            IdentityError::Provider(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for IdentityError {}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<IdentityProfile, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// How lookups authenticate against the admin API
enum Credential {
    /// The emulator accepts the fixed admin token `owner`
    Emulator,
    ServiceAccount(ServiceAccountTokenSource),
    /// Pre-issued access token; expires after about an hour
    Static(String),
    Anonymous,
}

/// Firebase Authentication admin lookup (`accounts:lookup`)
pub struct FirebaseIdentityProvider {
    lookup_url: String,
    credential: Credential,
}

impl FirebaseIdentityProvider {
    pub fn new(config: &AppConfig, service_account: Option<ServiceAccountTokenSource>) -> Self {
        let project = urlencoding::encode(&config.firebase_project_id);

        if let Some(host) = &config.firebase_emulator_host {
            log::info!("🧪 Using Firebase Auth emulator at {}", host);
            return Self {
                lookup_url: format!(
                    "http://{}/identitytoolkit.googleapis.com/v1/projects/{}/accounts:lookup",
                    host, project
                ),
                credential: Credential::Emulator,
            };
        }

        let credential = match (service_account, &config.firebase_access_token) {
            (Some(source), _) => {
                log::info!("🔑 Identity lookups use service account {}", source.client_email());
                Credential::ServiceAccount(source)
            }
            (None, Some(token)) => {
                log::warn!("⚠️  Identity lookups use FIREBASE_ACCESS_TOKEN, which expires; set GOOGLE_APPLICATION_CREDENTIALS instead");
                Credential::Static(token.clone())
            }
            (None, None) => {
                log::warn!("⚠️  No identity provider credential configured, user lookups will be rejected");
                Credential::Anonymous
            }
        };

        Self {
            lookup_url: format!(
                "{}/v1/projects/{}/accounts:lookup",
                IDENTITY_TOOLKIT_BASE, project
            ),
            credential,
        }
    }

    async fn bearer(&self) -> Result<Option<String>, IdentityError> {
        match &self.credential {
            Credential::Emulator => Ok(Some("owner".to_string())),
            Credential::ServiceAccount(source) => source
                .access_token()
                .await
                .map(Some)
                .map_err(IdentityError::Provider),
            Credential::Static(token) => Ok(Some(token.clone())),
            Credential::Anonymous => Ok(None),
        }
    }
}

fn parse_lookup_response(uid: &str, body: LookupResponse) -> Result<IdentityProfile, IdentityError> {
    body.users
        .into_iter()
        .find(|u| u.local_id == uid)
        .map(|u| IdentityProfile {
            uid: u.local_id,
            email: u.email,
            display_name: u.display_name,
        })
        .ok_or_else(|| IdentityError::NotFound(uid.to_string()))
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn get_user(&self, uid: &str) -> Result<IdentityProfile, IdentityError> {
        log::debug!("🔎 Looking up identity {}", uid);

        let mut request = HTTP_CLIENT
            .post(&self.lookup_url)
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "localId": [uid] }));

        if let Some(token) = self.bearer().await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Provider(format!("Failed to reach identity provider: {}", e)))?;

        if !response.status().is_success() {
            return Err(IdentityError::Provider(format!(
                "Identity provider error: {}",
                response.status()
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(format!("Failed to parse identity lookup: {}", e)))?;

        parse_lookup_response(uid, body)
    }
}

/// Provider stub answering from a fixed table
#[cfg(test)]
pub struct StaticIdentityProvider {
    profiles: Vec<IdentityProfile>,
    unavailable: bool,
}

#[cfg(test)]
impl StaticIdentityProvider {
    pub fn with_users(uids: &[&str]) -> Self {
        Self {
            profiles: uids
                .iter()
                .map(|uid| IdentityProfile {
                    uid: uid.to_string(),
                    email: Some(format!("{}@example.com", uid)),
                    display_name: Some(format!("User {}", uid)),
                })
                .collect(),
            unavailable: false,
        }
    }

    pub fn with_profile(mut self, profile: IdentityProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn unavailable() -> Self {
        Self {
            profiles: Vec::new(),
            unavailable: true,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn get_user(&self, uid: &str) -> Result<IdentityProfile, IdentityError> {
        if self.unavailable {
            return Err(IdentityError::Provider("connection refused".into()));
        }
        self.profiles
            .iter()
            .find(|p| p.uid == uid)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(uid.to_string()))
    }
}
