use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const USER_VAR: &str = "VIBE_USER";
const PASS_VAR: &str = "VIBE_PASS";
const ENV_PREFIX: &str = "HARVEST";

/// Runtime settings shared by every pipeline. Defaults live in `Default`,
/// `HARVEST_*` environment variables override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub urls_file: PathBuf,
    pub workflows_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub combined_dir: PathBuf,
    pub request_delay_ms: u64,
    pub nav_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// Rewrite the metadata aggregate after this many pages.
    pub aggregate_every: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://www.thevibemarketer.com".to_string(),
            urls_file: PathBuf::from("data/workflow_urls.json"),
            workflows_dir: PathBuf::from("downloaded_workflows"),
            metadata_dir: PathBuf::from("workflow_metadata"),
            combined_dir: PathBuf::from("combined_workflows"),
            request_delay_ms: 1000,
            nav_timeout_secs: 30,
            download_timeout_secs: 30,
            aggregate_every: 10,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregate_every == 0 {
            return Err(ConfigError::Invalid {
                key: "aggregate_every",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.base_url.starts_with("http") {
            return Err(ConfigError::Invalid {
                key: "base_url",
                reason: format!("{:?} is not an http(s) url", self.base_url),
            });
        }
        Ok(())
    }

    /// Members listing page, also the landing page after login.
    pub fn listing_url(&self) -> String {
        format!("{}/members/workflows", self.base_url.trim_end_matches('/'))
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        match (non_empty(USER_VAR), non_empty(PASS_VAR)) {
            (Some(email), Some(password)) => Ok(Credentials { email, password }),
            _ => Err(ConfigError::MissingCredentials {
                user_var: USER_VAR,
                pass_var: PASS_VAR,
            }),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn credentials_present() {
        let creds =
            Credentials::from_lookup(lookup(&[("VIBE_USER", "a@b.c"), ("VIBE_PASS", "pw")]))
                .unwrap();
        assert_eq!(creds.email, "a@b.c");
        assert_eq!(creds.password, "pw");
    }

    #[test]
    fn missing_password_is_config_error() {
        let err = Credentials::from_lookup(lookup(&[("VIBE_USER", "a@b.c")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials { .. }));
        assert!(err.to_string().contains("VIBE_PASS"));
    }

    #[test]
    fn blank_user_counts_as_missing() {
        let err = Credentials::from_lookup(lookup(&[("VIBE_USER", "  "), ("VIBE_PASS", "pw")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials { .. }));
    }

    #[test]
    fn debug_hides_password() {
        let creds = Credentials {
            email: "a@b.c".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn listing_url_ignores_trailing_slash() {
        let settings = Settings {
            base_url: "https://example.com/".into(),
            ..Settings::default()
        };
        assert_eq!(settings.listing_url(), "https://example.com/members/workflows");
    }

    #[test]
    fn zero_aggregate_interval_rejected() {
        let settings = Settings {
            aggregate_every: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { key: "aggregate_every", .. })
        ));
    }
}
