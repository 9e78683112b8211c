use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CLIENT_ID_VAR: &str = "REDDIT_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "REDDIT_SECRET";
pub const CONFIG_PATH_VAR: &str = "README_MEME_CONFIG";

/// Application credentials for the client-credentials grant.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl RedditCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Unset and empty variables are both treated as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var_name: &str| {
            lookup(var_name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                    var_name: var_name.to_string(),
                })
        };

        Ok(Self {
            client_id: required(CLIENT_ID_VAR)?,
            client_secret: required(CLIENT_SECRET_VAR)?,
        })
    }
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobSettings {
    pub subreddit: String,
    pub readme_path: PathBuf,
    pub user_agent: String,
    pub token_url: String,
    pub api_base: String,
    pub time_window: String,
    pub listing_limit: u32,
    pub start_marker: String,
    pub end_marker: String,
    pub lead_in: String,
    pub image_alt: String,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            subreddit: "ProgrammerHumor".to_string(),
            readme_path: PathBuf::from("README.md"),
            user_agent: "github.com/lawrence-readme-updater (contact: none)".to_string(),
            token_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            api_base: "https://oauth.reddit.com".to_string(),
            time_window: "day".to_string(),
            listing_limit: 50,
            start_marker: "<!-- START_MEME -->".to_string(),
            end_marker: "<!-- END_MEME -->".to_string(),
            lead_in: "The top voted meme for today is...".to_string(),
            image_alt: "ProgrammerHumor Meme of the Day".to_string(),
        }
    }
}

impl JobSettings {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: JobSettings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        debug!("Loaded settings from {}", path.display());
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subreddit.trim().is_empty() {
            return Err(invalid("subreddit", &self.subreddit));
        }
        if !(1..=100).contains(&self.listing_limit) {
            return Err(invalid("listing_limit", &self.listing_limit.to_string()));
        }
        if self.start_marker.is_empty() {
            return Err(invalid("start_marker", &self.start_marker));
        }
        if self.end_marker.is_empty() || self.end_marker == self.start_marker {
            return Err(invalid("end_marker", &self.end_marker));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: RedditCredentials,
    pub settings: JobSettings,
}

impl AppConfig {
    /// Reads credentials from the environment and settings from the file named
    /// by `README_MEME_CONFIG`, falling back to the built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = match lookup(CONFIG_PATH_VAR).filter(|p| !p.is_empty()) {
            Some(path) => JobSettings::from_file(Path::new(&path))?,
            None => JobSettings::default(),
        };
        let credentials = RedditCredentials::from_lookup(&lookup)?;

        info!(
            "Configuration loaded: r/{} -> {}",
            settings.subreddit,
            settings.readme_path.display()
        );
        Ok(Self {
            credentials,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = RedditCredentials::from_lookup(lookup_from(&[
            ("REDDIT_CLIENT_ID", "abc"),
            ("REDDIT_SECRET", "shh"),
        ]))
        .unwrap();
        assert_eq!(creds.client_id, "abc");
        assert_eq!(creds.client_secret, "shh");
    }

    #[test]
    fn test_missing_secret_is_reported_by_name() {
        let err = RedditCredentials::from_lookup(lookup_from(&[("REDDIT_CLIENT_ID", "abc")]))
            .unwrap_err();
        match err {
            ConfigError::MissingEnvironmentVariable { var_name } => {
                assert_eq!(var_name, "REDDIT_SECRET")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_client_id_counts_as_missing() {
        let err = RedditCredentials::from_lookup(lookup_from(&[
            ("REDDIT_CLIENT_ID", ""),
            ("REDDIT_SECRET", "shh"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvironmentVariable { ref var_name } if var_name == "REDDIT_CLIENT_ID"
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = RedditCredentials::new("abc", "super-secret");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("abc"));
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = JobSettings::from_toml_str(
            r#"
            subreddit = "rustjerk"
            readme_path = "docs/README.md"
            "#,
        )
        .unwrap();
        assert_eq!(settings.subreddit, "rustjerk");
        assert_eq!(settings.readme_path, PathBuf::from("docs/README.md"));
        assert_eq!(settings.listing_limit, 50);
        assert_eq!(settings.start_marker, "<!-- START_MEME -->");
    }

    #[test]
    fn test_out_of_range_limit_rejected() {
        let err = JobSettings::from_toml_str("listing_limit = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "listing_limit"));
    }

    #[test]
    fn test_identical_markers_rejected() {
        let err = JobSettings::from_toml_str(
            r#"
            start_marker = "<!-- MEME -->"
            end_marker = "<!-- MEME -->"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "end_marker"));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = JobSettings::from_toml_str("subreddit = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("README_MEME_CONFIG", "/definitely/not/here.toml"),
            ("REDDIT_CLIENT_ID", "abc"),
            ("REDDIT_SECRET", "shh"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meme.toml");
        std::fs::write(&path, "subreddit = \"rust\"\nlisting_limit = 25\n").unwrap();

        let config = AppConfig::from_lookup(lookup_from(&[
            ("README_MEME_CONFIG", path.to_str().unwrap()),
            ("REDDIT_CLIENT_ID", "abc"),
            ("REDDIT_SECRET", "shh"),
        ]))
        .unwrap();
        assert_eq!(config.settings.subreddit, "rust");
        assert_eq!(config.settings.listing_limit, 25);
    }
}
