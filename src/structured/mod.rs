//! Schema-constrained structured output (§4.5).
//!
//! Three entry points — [`generate_object`], [`generate_array`], and
//! [`generate_choice`] — each build a provider response-format hint from a
//! [`StructuredOutputMode`], call [`LanguageModel::generate`], and decode the
//! result text: a strict parse first, falling back (when the `json-repair`
//! feature is enabled) to a best-effort repair pass before validation.

use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::streaming::json_repair::parse_json_with_repair;
use crate::traits::LanguageModel;
use crate::types::{GenerateOptions, GenerateResult, OutputSchema, ResponseFormat, StructuredOutputMode};

/// A structured-output result: the typed value plus the underlying
/// generation (usage, finish reason, raw wire payloads).
#[derive(Debug, Clone)]
pub struct StructuredResult<T> {
    pub value: T,
    pub generation: GenerateResult,
}

fn decode_json(raw_text: &str) -> Result<serde_json::Value, LlmError> {
    parse_json_with_repair(raw_text)
        .map_err(|e| LlmError::invalid_structured_output(format!("could not parse JSON: {e}"), raw_text))
}

/// Attaches `schema` to `options` as a `response_format` hint. Providers that
/// don't honor `JsonSchema` (e.g. models in
/// [`crate::provider::wire::RESPONSE_FORMAT_EXEMPT_PREFIXES`]) fall back to
/// whatever `ResponseFormat::Json`-equivalent behavior they implement; the
/// post-hoc validation below is what actually enforces the schema either way.
fn with_response_format(mut options: GenerateOptions, schema: &OutputSchema) -> GenerateOptions {
    options.response_format = ResponseFormat::JsonSchema(schema.clone());
    options
}

/// Runs `options` through `model`, decodes the result text as JSON, validates
/// it against `schema`, and projects it into `T`. Shared by all three modes.
async fn generate_structured<T: DeserializeOwned>(
    model: &(dyn LanguageModel + Send + Sync),
    options: GenerateOptions,
    schema: &OutputSchema,
) -> Result<StructuredResult<T>, LlmError> {
    let options = with_response_format(options, schema);
    let generation = model.generate(options).await?;
    let decoded = decode_json(&generation.text)?;
    let value = schema.validate_and_project(&decoded, &generation.text)?;
    Ok(StructuredResult { value, generation })
}

/// [`StructuredOutputMode::Object`]: decode and validate a single object.
pub async fn generate_object<T: DeserializeOwned>(
    model: &(dyn LanguageModel + Send + Sync),
    options: GenerateOptions,
    schema: OutputSchema,
) -> Result<StructuredResult<T>, LlmError> {
    generate_structured(model, options, &schema).await
}

/// [`StructuredOutputMode::Array`]: decode the `{"elements": [...]}` envelope
/// and project each element into `T`.
pub async fn generate_array<T: DeserializeOwned>(
    model: &(dyn LanguageModel + Send + Sync),
    options: GenerateOptions,
    element_schema: OutputSchema,
) -> Result<StructuredResult<Vec<T>>, LlmError> {
    let mode = StructuredOutputMode::Array { element_schema };
    let wrapper_schema = mode.effective_schema();
    let options = with_response_format(options, &wrapper_schema);
    let generation = model.generate(options).await?;
    let decoded = decode_json(&generation.text)?;

    let validator = wrapper_schema.compile()?;
    if validator.validate(&decoded).is_err() {
        let message = validator
            .iter_errors(&decoded)
            .take(3)
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(LlmError::invalid_structured_output(message, &generation.text));
    }

    let elements = decoded.get("elements").cloned().ok_or_else(|| {
        LlmError::invalid_structured_output("response is missing the \"elements\" key", &generation.text)
    })?;
    let value: Vec<T> = serde_json::from_value(elements).map_err(|e| {
        LlmError::invalid_structured_output(
            format!("elements did not project into the target type: {e}"),
            &generation.text,
        )
    })?;
    Ok(StructuredResult { value, generation })
}

/// [`StructuredOutputMode::Choice`]: decode and validate a bare string
/// against `{enum: options}`.
pub async fn generate_choice(
    model: &(dyn LanguageModel + Send + Sync),
    options: GenerateOptions,
    choices: Vec<String>,
) -> Result<StructuredResult<String>, LlmError> {
    let mode = StructuredOutputMode::Choice { options: choices, name: None, description: None };
    let schema = mode.effective_schema();
    generate_structured(model, options, &schema).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    use crate::traits::test_support::ScriptedModel;
    use crate::types::{FinishReason, Message, Usage};

    fn model_with_text(text: &str) -> ScriptedModel {
        ScriptedModel::new(vec![GenerateResult {
            text: text.to_string(),
            tool_calls: vec![],
            usage: Usage::default(),
            finish_reason: FinishReason::Stop,
            raw_request: None,
            raw_response: None,
        }])
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
    }

    #[tokio::test]
    async fn generate_object_decodes_and_projects() {
        let model = model_with_text(r#"{"name":"Ada"}"#);
        let schema = OutputSchema::new(serde_json::json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"],
        }));
        let options = GenerateOptions::new(vec![Message::user("who?")]);
        let result: StructuredResult<Person> = generate_object(&model, options, schema).await.unwrap();
        assert_eq!(result.value, Person { name: "Ada".to_string() });
    }

    #[tokio::test]
    async fn generate_object_surfaces_raw_text_on_schema_violation() {
        let model = model_with_text(r#"{"name":42}"#);
        let schema = OutputSchema::new(serde_json::json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"],
        }));
        let options = GenerateOptions::new(vec![Message::user("who?")]);
        let err = generate_object::<Person>(&model, options, schema).await.unwrap_err();
        match err {
            LlmError::InvalidStructuredOutputError { raw_text, .. } => {
                assert_eq!(raw_text, r#"{"name":42}"#);
            }
            other => panic!("expected InvalidStructuredOutputError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_array_unwraps_elements_key() {
        let model = model_with_text(r#"{"elements":[{"name":"Ada"},{"name":"Grace"}]}"#);
        let element_schema = OutputSchema::new(serde_json::json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"],
        }));
        let options = GenerateOptions::new(vec![Message::user("list them")]);
        let result: StructuredResult<Vec<Person>> =
            generate_array(&model, options, element_schema).await.unwrap();
        assert_eq!(
            result.value,
            vec![Person { name: "Ada".to_string() }, Person { name: "Grace".to_string() }]
        );
    }

    #[tokio::test]
    async fn generate_array_errors_when_elements_key_missing() {
        let model = model_with_text(r#"{"items":[]}"#);
        let element_schema = OutputSchema::new(serde_json::json!({ "type": "object" }));
        let options = GenerateOptions::new(vec![Message::user("list them")]);
        let err = generate_array::<Person>(&model, options, element_schema).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidStructuredOutputError { .. }));
    }

    #[tokio::test]
    async fn generate_choice_validates_against_enum() {
        let model = model_with_text(r#""blue""#);
        let options = GenerateOptions::new(vec![Message::user("pick a color")]);
        let result = generate_choice(&model, options, vec!["red".into(), "blue".into()]).await.unwrap();
        assert_eq!(result.value, "blue");
    }

    #[tokio::test]
    async fn generate_choice_rejects_values_outside_the_enum() {
        let model = model_with_text(r#""green""#);
        let options = GenerateOptions::new(vec![Message::user("pick a color")]);
        let err = generate_choice(&model, options, vec!["red".into(), "blue".into()]).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidStructuredOutputError { .. }));
    }
}
