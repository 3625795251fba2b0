//! JSON Schema validation for brokkr configurations

use crate::error::{Error, Result};
use jsonschema::Validator;
use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Embedded schema files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../schemas/"]
#[prefix = ""]
struct EmbeddedSchemas;

/// Schema validator with pre-compiled schemas
#[derive(Debug)]
pub struct SchemaValidator {
    /// Compiled schemas by name
    schemas: HashMap<String, Validator>,
}

/// Global schema validator instance
static VALIDATOR: OnceLock<SchemaValidator> = OnceLock::new();

impl SchemaValidator {
    /// Create a new schema validator with embedded schemas
    pub fn new() -> Result<Self> {
        let mut schemas = HashMap::new();

        // Load embedded schemas
        for file in EmbeddedSchemas::iter() {
            if file.ends_with(".schema.json") {
                let name = file.trim_end_matches(".schema.json").to_string();

                debug!("Loading embedded schema: {}", name);

                if let Some(content) = EmbeddedSchemas::get(&file) {
                    let json_str = std::str::from_utf8(&content.data).map_err(|_| {
                        Error::invalid_config(format!("Invalid UTF-8 in schema: {}", file))
                    })?;

                    let schema_value: Value = serde_json::from_str(json_str)?;

                    let compiled = jsonschema::validator_for(&schema_value).map_err(|e| {
                        Error::invalid_config(format!("Failed to compile schema {}: {}", name, e))
                    })?;

                    schemas.insert(name, compiled);
                }
            }
        }

        // If no embedded schemas found, use fallback schemas
        if schemas.is_empty() {
            debug!("No embedded schemas found, using fallback schemas");
            Self::load_fallback_schemas(&mut schemas)?;
        }

        Ok(Self { schemas })
    }

    /// Get the global validator instance
    pub fn global() -> &'static SchemaValidator {
        VALIDATOR.get_or_init(|| {
            SchemaValidator::new().expect("Failed to initialize global schema validator")
        })
    }

    /// Validate JSON value against a schema
    pub fn validate(&self, value: &Value, schema_name: &str) -> Result<()> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| Error::schema_not_found(schema_name))?;

        let errors: Vec<String> = schema
            .iter_errors(value)
            .map(|e| {
                let path = e.instance_path().to_string();
                if path.is_empty() {
                    format!("  - {}", e)
                } else {
                    format!("  - {}: {}", path, e)
                }
            })
            .collect();

        if !errors.is_empty() {
            return Err(Error::schema_validation(errors));
        }

        Ok(())
    }

    /// Validate YAML string against a schema
    pub fn validate_yaml(&self, yaml: &str, schema_name: &str) -> Result<()> {
        let value: Value = serde_yaml_ng::from_str(yaml)?;
        self.validate(&value, schema_name)
    }

    /// Validate a file against a schema
    pub fn validate_file(&self, path: &std::path::Path, schema_name: &str) -> Result<()> {
        let content = std::fs::read_to_string(path)?;

        // Determine format by extension
        let value: Value = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml_ng::from_str(&content)?
        };

        self.validate(&value, schema_name)
    }

    /// Check if a schema exists
    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Load fallback schemas (minimal schemas for when embedded ones aren't available)
    fn load_fallback_schemas(schemas: &mut HashMap<String, Validator>) -> Result<()> {
        // Minimal brokkr schema
        let brokkr_schema = serde_json::json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "download_dir": { "type": "string" },
                "concurrency": { "type": "integer", "minimum": 1 },
                "policy_file": { "type": "string" },
                "network": { "type": "object" },
                "lifecycle": { "type": "object" },
                "scanner": { "type": "object" },
                "runtimes": { "type": "object" }
            }
        });

        // Minimal policy schema
        let policy_schema = serde_json::json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "oneOf": [
                {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["version"],
                        "properties": {
                            "version": { "type": "string" }
                        }
                    }
                },
                {
                    "type": "object",
                    "minProperties": 1,
                    "additionalProperties": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["version"],
                            "properties": {
                                "version": { "type": "string" }
                            }
                        }
                    }
                }
            ]
        });

        let brokkr_compiled = jsonschema::validator_for(&brokkr_schema).map_err(|e| {
            Error::invalid_config(format!("Failed to compile fallback brokkr schema: {}", e))
        })?;

        let policy_compiled = jsonschema::validator_for(&policy_schema).map_err(|e| {
            Error::invalid_config(format!("Failed to compile fallback policy schema: {}", e))
        })?;

        schemas.insert("brokkr".to_string(), brokkr_compiled);
        schemas.insert("policy".to_string(), policy_compiled);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_creation() {
        let validator = SchemaValidator::new().unwrap();
        assert!(validator.has_schema("brokkr") && validator.has_schema("policy"));
    }

    #[test]
    fn test_validate_minimal_config() {
        let validator = SchemaValidator::new().unwrap();

        let config = serde_json::json!({
            "download_dir": "/tmp/downloads",
            "concurrency": 4,
            "runtimes": {
                "nodejs": {
                    "pattern": "major"
                }
            }
        });

        let result = validator.validate(&config, "brokkr");
        assert!(result.is_ok(), "Validation failed: {:?}", result);
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let validator = SchemaValidator::new().unwrap();

        let config = serde_json::json!({
            "concurrency": 0
        });

        let result = validator.validate(&config, "brokkr");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_yaml() {
        let validator = SchemaValidator::new().unwrap();

        let yaml = r#"
download_dir: ~/downloads
concurrency: 8
network:
  http_timeout_secs: 30
"#;

        let result = validator.validate_yaml(yaml, "brokkr");
        assert!(result.is_ok(), "YAML validation failed: {:?}", result);
    }

    #[test]
    fn test_validate_policy_entry_list() {
        let validator = SchemaValidator::new().unwrap();

        let policy = serde_json::json!([
            { "version": "20", "supported": true, "recommended": true },
            { "version": "18", "supported": true }
        ]);

        let result = validator.validate(&policy, "policy");
        assert!(result.is_ok(), "Validation failed: {:?}", result);
    }

    #[test]
    fn test_validate_policy_runtime_map() {
        let validator = SchemaValidator::new().unwrap();

        let policy = serde_json::json!({
            "nodejs": [
                { "version": "20", "supported": true }
            ]
        });

        let result = validator.validate(&policy, "policy");
        assert!(result.is_ok(), "Validation failed: {:?}", result);
    }

    // --- Error path tests ---

    #[test]
    fn test_validate_nonexistent_schema() {
        let validator = SchemaValidator::new().unwrap();
        let value = serde_json::json!({"key": "value"});
        let result = validator.validate(&value, "nonexistent-schema");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            matches!(err, Error::SchemaNotFound { .. }),
            "Expected SchemaNotFound, got: {:?}",
            err
        );
        assert!(err.to_string().contains("nonexistent-schema"));
    }

    #[test]
    fn test_validate_policy_missing_version() {
        let validator = SchemaValidator::new().unwrap();

        // Entries without a version field are rejected
        let policy = serde_json::json!([
            { "supported": true }
        ]);

        let result = validator.validate(&policy, "policy");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            matches!(err, Error::SchemaValidation { .. }),
            "Expected SchemaValidation, got: {:?}",
            err
        );
    }

    #[test]
    fn test_validate_yaml_invalid_syntax() {
        let validator = SchemaValidator::new().unwrap();
        let bad_yaml = ":::\n  invalid: [[[yaml";
        let result = validator.validate_yaml(bad_yaml, "brokkr");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_wrong_type_for_field() {
        let validator = SchemaValidator::new().unwrap();

        // concurrency should be an integer, not a string
        let config = serde_json::json!({
            "concurrency": "four"
        });

        let result = validator.validate(&config, "brokkr");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            matches!(err, Error::SchemaValidation { .. }),
            "Expected SchemaValidation, got: {:?}",
            err
        );
    }
}
