use std::env;

/// Runtime configuration, read from the environment (and `.env` if present)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub firebase_project_id: String,
    pub firebase_access_token: Option<String>,
    pub firebase_emulator_host: Option<String>,
    /// Path to a service-account JSON key for the admin API
    pub google_credentials: Option<String>,
    pub require_id_token: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| optional(key).ok_or_else(|| format!("{} must be set", key));

        let port = optional("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("PORT must be a valid port number ({}): {}", port, e))?;

        let require_id_token = match optional("REQUIRE_ID_TOKEN").as_deref() {
            None => false,
            Some(v) => parse_flag(v).ok_or_else(|| format!("REQUIRE_ID_TOKEN must be true or false, got {}", v))?,
        };

        let cors_origins = optional("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: required("DATABASE_URL")?,
            firebase_project_id: required("FIREBASE_PROJECT_ID")?,
            firebase_access_token: optional("FIREBASE_ACCESS_TOKEN"),
            firebase_emulator_host: optional("FIREBASE_AUTH_EMULATOR_HOST"),
            google_credentials: optional("GOOGLE_APPLICATION_CREDENTIALS"),
            require_id_token,
            cors_origins,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
