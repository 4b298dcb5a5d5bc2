use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const DEFAULT_INDEX_NAME: &str = "healthadvisor";
pub const DEFAULT_DOCUMENT_TYPE: &str = "service";

/// Collaborator settings. Every key has a default, so the settings file is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub geocoder: GeocoderSettings,
    pub search: SearchSettings,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

/// API key 不可出現在日誌中
pub(crate) fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

impl std::fmt::Debug for GeocoderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocoderSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
            api_key: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub index_name: String,
    pub document_type: String,
    /// 主機名稱沒有帶 scheme 時使用
    pub scheme: String,
    pub timeout_seconds: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            scheme: "http".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Settings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| EtlError::ConfigError {
            message: format!(
                "Cannot read settings file '{}': {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("geocoder.endpoint", &self.geocoder.endpoint)?;
        validation::validate_positive_number(
            "geocoder.timeout_seconds",
            self.geocoder.timeout_seconds as usize,
            1,
        )?;

        validation::validate_non_empty_string("search.index_name", &self.search.index_name)?;
        validation::validate_non_empty_string("search.document_type", &self.search.document_type)?;
        match self.search.scheme.as_str() {
            "http" | "https" => {}
            other => {
                return Err(EtlError::InvalidConfigValueError {
                    field: "search.scheme".to_string(),
                    value: other.to_string(),
                    reason: "Scheme must be http or https".to_string(),
                })
            }
        }
        validation::validate_positive_number(
            "search.timeout_seconds",
            self.search.timeout_seconds as usize,
            1,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.search.index_name, "healthadvisor");
        assert_eq!(settings.search.document_type, "service");
        assert_eq!(settings.geocoder.endpoint, DEFAULT_GEOCODER_ENDPOINT);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let settings = Settings::from_toml_str(
            r#"
[geocoder]
endpoint = "http://localhost:8080/geocode"
api_key = "secret"

[search]
document_type = "_doc"
"#,
        )
        .unwrap();

        assert_eq!(settings.geocoder.endpoint, "http://localhost:8080/geocode");
        assert_eq!(settings.geocoder.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.geocoder.timeout_seconds, 10);
        assert_eq!(settings.search.index_name, "healthadvisor");
        assert_eq!(settings.search.document_type, "_doc");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = Settings::default();
        settings.geocoder.endpoint = "not a url".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.search.scheme = "ftp".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.search.index_name = " ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let settings = Settings::from_toml_str(
            r#"
[geocoder]
api_key = "SECRET-KEY-123"
"#,
        )
        .unwrap();

        let printed = format!("{:?}", settings);
        assert!(!printed.contains("SECRET-KEY-123"));
        assert!(printed.contains("api_key: Some(\"***\")"));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Settings::from_toml_str("[search\nindex_name = ");
        assert!(matches!(result, Err(EtlError::ConfigError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = Settings::from_file("/nonexistent/outpatient-etl.toml");
        assert!(matches!(result, Err(EtlError::ConfigError { .. })));
    }
}
