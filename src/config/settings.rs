use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, File};
use std::path::Path;

use crate::providers::{ApiCredentials, ProviderConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub server: ServerSettings,
    pub cache: CacheSettings,
    pub codeforces: CodeforcesSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cache_max_age_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub profile_ttl_seconds: u64,
    pub avatar_ttl_seconds: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeforcesSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub timeout_seconds: u64,
    pub status_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "cp-cards".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                log_level: "info".to_string(),
            },
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cache_max_age_seconds: 1800,
            },
            cache: CacheSettings {
                profile_ttl_seconds: 900, // 15 minutes
                avatar_ttl_seconds: 3600,
                max_entries: 1000,
            },
            codeforces: CodeforcesSettings {
                base_url: "https://codeforces.com/api".to_string(),
                api_key: None,
                api_secret: None,
                timeout_seconds: 10,
                status_count: 10000,
            },
            retry: RetrySettings {
                max_attempts: 3,
                base_delay_ms: 200,
                max_delay_ms: 2000,
                backoff_multiplier: 2.0,
            },
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CP_CARDS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?;

        s.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be non-zero".to_string());
        }

        if self.retry.max_attempts == 0 {
            return Err("Retry max_attempts must be at least 1".to_string());
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err("Retry backoff_multiplier must be at least 1.0".to_string());
        }

        if self.cache.profile_ttl_seconds == 0 || self.cache.avatar_ttl_seconds == 0 {
            return Err("Cache TTLs must be non-zero".to_string());
        }

        if self.cache.max_entries == 0 {
            return Err("Cache max_entries must be non-zero".to_string());
        }

        let cf = &self.codeforces;
        if cf.api_key.is_some() != cf.api_secret.is_some() {
            return Err("Codeforces api_key and api_secret must be set together".to_string());
        }

        if cf.status_count == 0 {
            return Err("Codeforces status_count must be non-zero".to_string());
        }

        Ok(())
    }

    pub fn codeforces_provider(&self) -> ProviderConfig {
        let cf = &self.codeforces;
        let credentials = match (&cf.api_key, &cf.api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(ApiCredentials {
                    key: key.clone(),
                    secret: secret.clone(),
                })
            }
            _ => None,
        };

        ProviderConfig {
            base_url: cf.base_url.clone(),
            timeout_seconds: cf.timeout_seconds,
            credentials,
            submission_limit: cf.status_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.codeforces_provider().credentials.is_none());
    }

    #[test]
    fn test_key_without_secret_is_rejected() {
        let mut settings = Settings::default();
        settings.codeforces.api_key = Some("key".to_string());
        assert!(settings.validate().is_err());

        settings.codeforces.api_secret = Some("secret".to_string());
        assert!(settings.validate().is_ok());
        assert_eq!(
            settings.codeforces_provider().credentials,
            Some(ApiCredentials {
                key: "key".to_string(),
                secret: "secret".to_string(),
            })
        );
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.retry.max_attempts = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.cache.profile_ttl_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let path = std::env::temp_dir()
            .join(format!("cp-cards-settings-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 9000\n\n[cache]\nprofile_ttl_seconds = 60").unwrap();
        drop(file);

        let settings = Settings::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.cache.profile_ttl_seconds, 60);
        assert_eq!(settings.cache.avatar_ttl_seconds, 3600);
        assert_eq!(settings.codeforces.base_url, "https://codeforces.com/api");
    }
}
