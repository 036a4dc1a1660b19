//! Orchestrator configuration
//!
//! Everything resource-specific lives here so the same orchestrator can run
//! against opportunities, organizations or contacts.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bulk orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BulkConfig {
    /// Store resource the actions apply to
    pub resource: String,
    /// Noun used in notifications for a single record
    pub singular_label: String,
    /// Noun used in notifications for zero or several records
    pub plural_label: String,
    /// Field written by `assign_owner`
    pub owner_field: String,
    /// Notification shown when the dispatch itself fails
    pub generic_failure_message: String,
    /// Archive audit trail
    pub audit: AuditConfig,
}

impl BulkConfig {
    /// Create default configuration (opportunities)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a different resource and its labels
    #[must_use]
    pub fn with_resource(
        mut self,
        resource: impl Into<String>,
        singular: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        self.resource = resource.into();
        self.singular_label = singular.into();
        self.plural_label = plural.into();
        self
    }

    /// With a different owner field
    #[inline]
    #[must_use]
    pub fn with_owner_field(mut self, field: impl Into<String>) -> Self {
        self.owner_field = field.into();
        self
    }

    /// With audit configuration
    #[inline]
    #[must_use]
    pub fn with_audit(mut self, audit: AuditConfig) -> Self {
        self.audit = audit;
        self
    }

    /// Noun for `count` records
    #[must_use]
    pub fn label(&self, count: usize) -> &str {
        if count == 1 {
            &self.singular_label
        } else {
            &self.plural_label
        }
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or unknown keys
    /// - `ConfigError::EmptyField` if a required field is blank
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Same as [`BulkConfig::from_toml_str`], plus `ConfigError::Io`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Reject blank required fields
    ///
    /// # Errors
    /// `ConfigError::EmptyField` naming the first blank field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("resource", &self.resource),
            ("singular_label", &self.singular_label),
            ("plural_label", &self.plural_label),
            ("owner_field", &self.owner_field),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(name));
            }
        }
        if self.audit.enabled && self.audit.resource.trim().is_empty() {
            return Err(ConfigError::EmptyField("audit.resource"));
        }
        Ok(())
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            resource: "opportunities".to_string(),
            singular_label: "opportunity".to_string(),
            plural_label: "opportunities".to_string(),
            owner_field: "opportunity_owner_id".to_string(),
            generic_failure_message: "Failed to complete bulk action".to_string(),
            audit: AuditConfig::default(),
        }
    }
}

/// Activity record written for each archived record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Whether archive writes audit records at all
    pub enabled: bool,
    /// Resource audit records are created in
    pub resource: String,
    /// Value of `activity_type`
    pub activity_type: String,
    /// Value of `type`
    pub kind: String,
    /// Fixed subject line
    pub subject: String,
    /// Field on the audit record holding the archived record id
    pub link_field: String,
    /// Field on the audit record holding the organization id
    pub organization_field: String,
    /// Field on the archived snapshot holding its organization id
    pub snapshot_organization_field: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resource: "activities".to_string(),
            activity_type: "engagement".to_string(),
            kind: "note".to_string(),
            subject: "Opportunity archived".to_string(),
            link_field: "opportunity_id".to_string(),
            organization_field: "organization_id".to_string(),
            snapshot_organization_field: "customer_organization_id".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_labels_pluralize() {
        let config = BulkConfig::default();
        assert_eq!(config.label(1), "opportunity");
        assert_eq!(config.label(0), "opportunities");
        assert_eq!(config.label(3), "opportunities");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BulkConfig::from_toml_str(
            r#"
            resource = "organizations"
            singular_label = "organization"
            plural_label = "organizations"
            owner_field = "sales_id"

            [audit]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.resource, "organizations");
        assert_eq!(config.owner_field, "sales_id");
        assert!(!config.audit.enabled);
        assert_eq!(config.audit.resource, "activities");
        assert_eq!(config.generic_failure_message, "Failed to complete bulk action");
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = BulkConfig::from_toml_str("resourse = \"typo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn blank_resource_rejected() {
        let err = BulkConfig::from_toml_str("resource = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyField("resource")));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plural_label = \"deals\"").unwrap();

        let config = BulkConfig::load(file.path()).unwrap();
        assert_eq!(config.label(2), "deals");
    }

    #[test]
    fn load_missing_file() {
        let err = BulkConfig::load("/nonexistent/bulk.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
