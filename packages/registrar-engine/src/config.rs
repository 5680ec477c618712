use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Identity fields submitted with a registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrantIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub power_factor: String,
}

/// Configuration for one engine run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Site base URL, e.g. `https://practiscore.com`.
    pub base_url: String,
    /// Path of the club's event listing page.
    pub club_path: String,
    /// Title keyword narrowing the over-inclusive extractor output.
    pub target_match: String,
    /// Account username, also matched against detail-page rosters.
    pub username: String,
    pub identity: RegistrantIdentity,
}

impl RunConfig {
    /// Load configuration from environment variables. Credentials for the
    /// page fetcher are loaded separately by the client package.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            base_url: env_or("PRACTISCORE_BASE_URL", "https://practiscore.com"),
            club_path: env_or(
                "PRACTISCORE_CLUB_PATH",
                "/clubs/north_shore_practical_shooters",
            ),
            target_match: env_or("TARGET_MATCH_NAME", "NSPS Run & Gun"),
            username: required_env("PRACTISCORE_USERNAME")?,
            identity: RegistrantIdentity {
                first_name: required_env("REGISTRANT_FIRST_NAME")?,
                last_name: required_env("REGISTRANT_LAST_NAME")?,
                email: required_env("REGISTRANT_EMAIL")?,
                power_factor: env_or("REGISTRANT_POWER_FACTOR", "Minor"),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http") {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingVar("PRACTISCORE_USERNAME"));
        }
        if self.target_match.trim().is_empty() {
            return Err(ConfigError::MissingVar("TARGET_MATCH_NAME"));
        }
        for (name, value) in [
            ("first_name", &self.identity.first_name),
            ("last_name", &self.identity.last_name),
            ("email", &self.identity.email),
            ("power_factor", &self.identity.power_factor),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingIdentityField(name));
            }
        }
        Ok(())
    }

    /// URL of the club's event listing page.
    pub fn club_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.club_path)
    }

    /// Resolve a listing href against the site base URL.
    pub fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), href)
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating blank values as missing. Shared
/// with collaborator packages loading their own settings.
pub fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}
