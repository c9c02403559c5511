use std::fs;
use std::path::Path;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::domain::DateFormat;
use crate::error::DigestError;
use crate::scale::DisplayScaler;
use crate::window::DEFAULT_WINDOW_DAYS;

pub const TOKEN_ENV: &str = "ACCESS_TOKEN";

/// Everything one run needs, resolved from defaults, an optional settings file,
/// command-line overrides and the environment.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub access_token: String,
    pub base_url: String,
    pub collection: String,
    pub window_days: u32,
    pub curve_degree: i32,
    pub divisor: f64,
    pub output_path: Utf8PathBuf,
    pub date_format: DateFormat,
    pub pretty: bool,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub max_parallel_fetches: usize,
}

impl DigestConfig {
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: "https://socialmediaarchive.sl.nsw.gov.au".to_string(),
            collection: "slnsw".to_string(),
            window_days: DEFAULT_WINDOW_DAYS,
            curve_degree: 3,
            divisor: 50.0,
            output_path: Utf8PathBuf::from("data.json"),
            date_format: DateFormat::Us,
            pretty: false,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 200,
            max_parallel_fetches: 8,
        }
    }

    fn apply(&mut self, settings: Settings) {
        if let Some(value) = settings.base_url {
            self.base_url = value;
        }
        if let Some(value) = settings.collection {
            self.collection = value;
        }
        if let Some(value) = settings.window_days {
            self.window_days = value;
        }
        if let Some(value) = settings.curve_degree {
            self.curve_degree = value;
        }
        if let Some(value) = settings.divisor {
            self.divisor = value;
        }
        if let Some(value) = settings.output_path {
            self.output_path = value;
        }
        if let Some(value) = settings.date_format {
            self.date_format = value;
        }
        if let Some(value) = settings.pretty {
            self.pretty = value;
        }
        if let Some(value) = settings.request_timeout_secs {
            self.request_timeout_secs = value;
        }
        if let Some(value) = settings.max_retries {
            self.max_retries = value;
        }
        if let Some(value) = settings.retry_base_delay_ms {
            self.retry_base_delay_ms = value;
        }
        if let Some(value) = settings.max_parallel_fetches {
            self.max_parallel_fetches = value;
        }
    }

    pub fn validate(&self) -> Result<(), DigestError> {
        DisplayScaler::from_config(self)?;
        if self.max_parallel_fetches == 0 {
            return Err(DigestError::Config(
                "max_parallel_fetches must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(DigestError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() || self.collection.trim().is_empty() {
            return Err(DigestError::Config(
                "base_url and collection must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Optional JSON settings file. Every field may be omitted.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub base_url: Option<String>,
    pub collection: Option<String>,
    pub window_days: Option<u32>,
    pub curve_degree: Option<i32>,
    pub divisor: Option<f64>,
    pub output_path: Option<Utf8PathBuf>,
    pub date_format: Option<DateFormat>,
    pub pretty: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<usize>,
    pub retry_base_delay_ms: Option<u64>,
    pub max_parallel_fetches: Option<usize>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `ACCESS_TOKEN`, loading `.env` from the working directory first.
    pub fn token_from_env() -> Option<String> {
        dotenvy::dotenv().ok();
        std::env::var(TOKEN_ENV).ok()
    }

    pub fn read_settings(path: &Path) -> Result<Settings, DigestError> {
        let content =
            fs::read_to_string(path).map_err(|_| DigestError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| DigestError::ConfigParse(err.to_string()))
    }

    /// Layers defaults, the settings file and command-line overrides, in that
    /// order. Fails before anything else when the token is missing or blank.
    pub fn resolve(
        token: Option<String>,
        settings_path: Option<&Path>,
        overrides: Settings,
    ) -> Result<DigestConfig, DigestError> {
        let token = token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(DigestError::MissingToken)?;

        let mut config = DigestConfig::with_token(token);
        if let Some(path) = settings_path {
            config.apply(Self::read_settings(path)?);
        }
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config =
            ConfigLoader::resolve(Some("abc".to_string()), None, Settings::default()).unwrap();
        assert_eq!(config.access_token, "abc");
        assert_eq!(config.window_days, 7);
        assert_eq!(config.curve_degree, 3);
        assert_eq!(config.divisor, 50.0);
        assert_eq!(config.collection, "slnsw");
        assert_eq!(config.date_format, DateFormat::Us);
    }

    #[test]
    fn blank_token_is_missing() {
        let err = ConfigLoader::resolve(Some("   ".to_string()), None, Settings::default())
            .unwrap_err();
        assert!(matches!(err, DigestError::MissingToken));
    }

    #[test]
    fn overrides_win() {
        let overrides = Settings {
            window_days: Some(3),
            pretty: Some(true),
            ..Settings::default()
        };
        let config = ConfigLoader::resolve(Some("abc".to_string()), None, overrides).unwrap();
        assert_eq!(config.window_days, 3);
        assert!(config.pretty);
    }

    #[test]
    fn rejects_zero_divisor() {
        let overrides = Settings {
            divisor: Some(0.0),
            ..Settings::default()
        };
        let err = ConfigLoader::resolve(Some("abc".to_string()), None, overrides).unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }

    #[test]
    fn curve_checks_come_from_the_scaler() {
        let mut config = DigestConfig::with_token("abc");
        config.curve_degree = 0;
        let from_config = config.validate().unwrap_err().to_string();
        let from_scaler = DisplayScaler::new(0, 50.0).unwrap_err().to_string();
        assert_eq!(from_config, from_scaler);
    }
}
