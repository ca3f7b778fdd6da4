//! Schema-guided structured output.

use jsonschema::Validator;
use serde::de::DeserializeOwned;

use crate::error::LlmError;

/// A JSON Schema plus metadata the provider's wire format wants alongside it
/// (e.g. a name for `response_format.json_schema.name`).
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub schema: serde_json::Value,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl OutputSchema {
    pub fn new(schema: serde_json::Value) -> Self {
        Self { schema, name: None, description: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Compile this schema into a validator. The core depends on the
    /// `jsonschema` crate for compilation/validation rather than
    /// implementing JSON Schema itself.
    pub fn compile(&self) -> Result<Validator, LlmError> {
        jsonschema::validator_for(&self.schema)
            .map_err(|e| LlmError::ConfigurationError(format!("invalid output schema: {e}")))
    }

    /// Validate `instance` against this schema, and — if `T` is supplied —
    /// re-serialize/re-parse the value into `T`.
    pub fn validate_and_project<T: DeserializeOwned>(
        &self,
        instance: &serde_json::Value,
        raw_text: &str,
    ) -> Result<T, LlmError> {
        let validator = self.compile()?;
        if validator.validate(instance).is_err() {
            let message = validator
                .iter_errors(instance)
                .take(3)
                .map(|e| format!("{} at {}", e, e.instance_path))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(LlmError::invalid_structured_output(message, raw_text));
        }
        serde_json::from_value(instance.clone()).map_err(|e| {
            LlmError::invalid_structured_output(
                format!("decoded value did not project into target type: {e}"),
                raw_text,
            )
        })
    }
}

/// The three selectable structured-output shapes (§4.5).
#[derive(Debug, Clone)]
pub enum StructuredOutputMode {
    /// A single object conforming to `schema`.
    Object(OutputSchema),
    /// An array of objects conforming to `element_schema`. The model is
    /// instructed to wrap the array under `"elements"` so element-streaming
    /// can locate it.
    Array { element_schema: OutputSchema },
    /// One of an enumerated set of string values.
    Choice { options: Vec<String>, name: Option<String>, description: Option<String> },
}

impl StructuredOutputMode {
    /// The schema the provider's response-format hint (and post-hoc
    /// validation) should use.
    pub fn effective_schema(&self) -> OutputSchema {
        match self {
            Self::Object(schema) => schema.clone(),
            Self::Array { element_schema } => {
                let schema = serde_json::json!({
                    "type": "object",
                    "properties": { "elements": { "type": "array", "items": element_schema.schema } },
                    "required": ["elements"],
                });
                OutputSchema::new(schema)
            }
            Self::Choice { options, name, description } => {
                let mut schema = OutputSchema::new(serde_json::json!({ "enum": options }));
                if let Some(name) = name {
                    schema = schema.with_name(name.clone());
                }
                if let Some(description) = description {
                    schema = schema.with_description(description.clone());
                }
                schema
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
    }

    #[test]
    fn valid_object_projects_into_target_type() {
        let schema = OutputSchema::new(serde_json::json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"],
        }));
        let value = serde_json::json!({ "name": "Ada" });
        let person: Person = schema.validate_and_project(&value, "{\"name\":\"Ada\"}").unwrap();
        assert_eq!(person, Person { name: "Ada".to_string() });
    }

    #[test]
    fn invalid_object_surfaces_raw_text() {
        let schema = OutputSchema::new(serde_json::json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"],
        }));
        let value = serde_json::json!({ "name": 42 });
        let err = schema
            .validate_and_project::<Person>(&value, "{\"name\":42}")
            .unwrap_err();
        match err {
            LlmError::InvalidStructuredOutputError { raw_text, .. } => {
                assert_eq!(raw_text, "{\"name\":42}");
            }
            other => panic!("expected InvalidStructuredOutputError, got {other:?}"),
        }
    }

    #[test]
    fn choice_mode_derives_enum_schema() {
        let mode = StructuredOutputMode::Choice {
            options: vec!["red".into(), "blue".into()],
            name: None,
            description: None,
        };
        let schema = mode.effective_schema();
        assert_eq!(schema.schema, serde_json::json!({ "enum": ["red", "blue"] }));
    }

    #[test]
    fn array_mode_wraps_elements_under_known_key() {
        let mode = StructuredOutputMode::Array {
            element_schema: OutputSchema::new(serde_json::json!({ "type": "object" })),
        };
        let schema = mode.effective_schema();
        assert!(schema.schema["properties"]["elements"]["items"].is_object());
    }
}
