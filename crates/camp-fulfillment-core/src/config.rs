//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collaborators::DocumentKind;
use crate::intake::ColumnRules;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// What to do with a name or id that does not resolve.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnknownEntityPolicy {
    /// Log a warning and leave the entry out
    #[default]
    Skip,
    /// Fail the whole call before anything is written
    Reject,
}

/// Which status rows decide that a package is complete.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageCompletionScope {
    /// Every row of every patient attributed to the package
    #[default]
    AllPatients,
    /// Only the rows of the patient whose service was just completed
    ActingPatient,
}

/// Engine-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix of the check-in link encoded in each QR code
    pub deep_link_base: String,
    /// How long a store call waits on a locked database
    pub busy_timeout_ms: u64,
    /// Token generation attempts before giving up
    pub token_max_attempts: u32,
    pub unknown_entity_policy: UnknownEntityPolicy,
    pub package_completion_scope: PackageCompletionScope,
    /// Documents rendered for every intaken patient
    pub documents: Vec<DocumentKind>,
    pub columns: ColumnRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deep_link_base: "http://localhost:8000/api/campmanager".to_string(),
            busy_timeout_ms: 5_000,
            token_max_attempts: 16,
            unknown_entity_policy: UnknownEntityPolicy::Skip,
            package_completion_scope: PackageCompletionScope::AllPatients,
            documents: vec![DocumentKind::Document, DocumentKind::Slip],
            columns: ColumnRules::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "token_max_attempts must be at least 1".into(),
            ));
        }
        if self.deep_link_base.trim().is_empty() {
            return Err(ConfigError::Invalid("deep_link_base must not be empty".into()));
        }
        self.columns.validate().map_err(ConfigError::Invalid)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Check-in link for a patient token.
    pub fn qr_payload(&self, token: &str) -> String {
        format!(
            "{}/patient/{}/checkin/",
            self.deep_link_base.trim_end_matches('/'),
            token
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.unknown_entity_policy, UnknownEntityPolicy::Skip);
        assert_eq!(
            config.package_completion_scope,
            PackageCompletionScope::AllPatients
        );
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(
            r#"{
                "unknown_entity_policy": "reject",
                "package_completion_scope": "acting_patient",
                "documents": ["slip"],
                "busy_timeout_ms": 250
            }"#,
        )
        .unwrap();

        assert_eq!(config.unknown_entity_policy, UnknownEntityPolicy::Reject);
        assert_eq!(
            config.package_completion_scope,
            PackageCompletionScope::ActingPatient
        );
        assert_eq!(config.documents, vec![DocumentKind::Slip]);
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.token_max_attempts, 16);
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let result = EngineConfig::from_json_str(r#"{"token_max_attempts": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_policy_value_fails_parse() {
        let result = EngineConfig::from_json_str(r#"{"unknown_entity_policy": "ignore"}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"deep_link_base": "https://camps.example.org/"}"#).unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(
            config.qr_payload("a1b2c3d4"),
            "https://camps.example.org/patient/a1b2c3d4/checkin/"
        );
    }
}
