use crate::error::{BudgetError, Result};
use crate::utils::validate_utc_offset;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// How class content behaves once it has been built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Class content and button labels keep whatever data was current the
    /// first time the class was seen in this page session.
    #[default]
    Frozen,
    /// Structure is still built once, but labels and content are re-derived
    /// from every refresh. Disclosure open/closed state is kept.
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub refresh_policy: RefreshPolicy,
    /// Offset applied when bucketing transactions into days and printing dates
    pub utc_offset_seconds: i32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_policy: RefreshPolicy::default(),
            utc_offset_seconds: 0,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(BudgetError::InvalidConfig(
                "base_url must not be empty".to_string(),
            ));
        }
        validate_utc_offset(self.utc_offset_seconds)?;
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        validate_utc_offset(self.utc_offset_seconds)
    }

    /// Joins `base_url` and an endpoint path without doubling the slash.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = ClientConfig::from_json_str(r#"{"refresh_policy": "live"}"#).unwrap();
        assert_eq!(config.refresh_policy, RefreshPolicy::Live);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.utc_offset_seconds, 0);
    }

    #[test]
    fn test_rejects_bad_offset() {
        let result = ClientConfig::from_json_str(r#"{"utc_offset_seconds": 100000}"#);
        assert!(matches!(result, Err(BudgetError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_empty_base_url() {
        let config = ClientConfig {
            base_url: "  ".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_url_for() {
        let config = ClientConfig {
            base_url: "https://budget.example/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.url_for("/get/all"), "https://budget.example/get/all");
    }
}
