//! Node validation
//!
//! Validates a node's declared type, provider, inputs and config against the
//! schema registry. Input and config problems are accumulated; structural
//! problems (unknown type, missing or unsupported provider) stop early since
//! nothing else can be checked without a schema.
//!
//! Reference existence is supplied by the caller as the set of referenced
//! UUIDs that exist in the node's pipeline, so that one batch query covers
//! every slot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::node::{InputRef, NodeConfig, NodeInputs, ValidationErrors};
use crate::schema::{self, Arity, NodeSchema, ProviderSchema};

/// Outcome of validating a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: ValidationErrors,
}

impl ValidationResult {
    pub fn from_errors(errors: ValidationErrors) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Records an error under a slot or field name
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self.is_valid = false;
    }

    /// Messages recorded for a slot or field
    pub fn messages(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One-line rendering, e.g. `segments: must have at least 2 item(s)`
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("{}: {}", field, message))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validates a node definition
///
/// # Arguments
/// * `node_type` - Raw type tag
/// * `provider` - Provider name selecting the config schema
/// * `inputs` - Slot name -> reference(s)
/// * `config` - Provider config fields
/// * `existing` - Referenced UUIDs that exist in the node's pipeline
pub fn validate(
    node_type: &str,
    provider: &str,
    inputs: &NodeInputs,
    config: &NodeConfig,
    existing: &HashSet<Uuid>,
) -> ValidationResult {
    let mut result = ValidationResult {
        is_valid: true,
        errors: ValidationErrors::new(),
    };

    let Some(schema) = schema::lookup(node_type) else {
        result.add("type", format!("unknown node type '{}'", node_type));
        return result;
    };

    if provider.trim().is_empty() {
        result.add("provider", "can't be blank");
        return result;
    }

    let Some(provider_schema) = schema.provider(provider) else {
        result.add(
            "provider",
            format!(
                "'{}' is not a supported provider for {} (expected one of: {})",
                provider,
                node_type,
                schema.provider_names().join(", ")
            ),
        );
        return result;
    };

    validate_inputs(schema, inputs, existing, &mut result);
    validate_config(provider_schema, config, &mut result);

    result
}

/// Checks slot names, arity, counts and reference existence
pub fn validate_inputs(
    schema: &NodeSchema,
    inputs: &NodeInputs,
    existing: &HashSet<Uuid>,
    result: &mut ValidationResult,
) {
    if schema.inputs.is_empty() {
        if !inputs.is_empty() {
            result.add(
                "inputs",
                format!("{} nodes should not have inputs", schema.node_type),
            );
        }
    } else {
        for slot in inputs.keys() {
            if schema.slot(slot).is_none() {
                result.add(slot.as_str(), "is not an expected input");
            }
        }
    }

    for (name, slot) in schema.inputs {
        let value = inputs.get(*name).filter(|value| !value.is_empty());

        let Some(value) = value else {
            if slot.required {
                result.add(*name, "is required");
            }
            continue;
        };

        match (slot.arity, value) {
            (Arity::Multiple, InputRef::One(_)) => {
                result.add(*name, "must be a list of node references");
            }
            (Arity::Single, InputRef::Many(_)) => {
                result.add(*name, "must be a single node reference");
            }
            (Arity::Multiple, InputRef::Many(ids)) => {
                if let Some(min) = slot.min_count {
                    if ids.len() < min {
                        result.add(*name, format!("must have at least {} item(s)", min));
                    }
                }
                if let Some(max) = slot.max_count {
                    if ids.len() > max {
                        result.add(*name, format!("must have at most {} item(s)", max));
                    }
                }
            }
            (Arity::Single, InputRef::One(_)) => {}
        }
    }

    for (name, value) in inputs {
        let missing: Vec<String> = value
            .uuids()
            .iter()
            .filter(|id| !existing.contains(*id))
            .map(Uuid::to_string)
            .collect();

        if !missing.is_empty() {
            result.add(
                name.as_str(),
                format!("references non-existent node(s): {}", missing.join(", ")),
            );
        }
    }
}

/// Checks required fields, JSON types and allowed values
pub fn validate_config(
    provider: &ProviderSchema,
    config: &NodeConfig,
    result: &mut ValidationResult,
) {
    for (name, field) in provider.fields {
        let value = config.get(*name).filter(|value| !value.is_null());

        let Some(value) = value else {
            if field.required {
                result.add(*name, "is required");
            }
            continue;
        };

        if !field.field_type.matches(value) {
            result.add(*name, format!("must be {}", field.field_type.describe()));
            continue;
        }

        if !field.allowed_values.is_empty()
            && !field.allowed_values.iter().any(|allowed| allowed.matches(value))
        {
            let allowed: Vec<String> = field
                .allowed_values
                .iter()
                .map(ToString::to_string)
                .collect();
            result.add(*name, format!("must be one of: {}", allowed.join(", ")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::NodeType;
    use crate::schema::{FieldType, schema_for};
    use serde_json::{Value, json};

    /// Builds the smallest config that satisfies a provider's required fields
    fn minimal_config(provider: &ProviderSchema) -> NodeConfig {
        let mut config = NodeConfig::new();
        for (name, field) in provider.fields {
            if !field.required {
                continue;
            }
            let value = match field.allowed_values.first() {
                Some(allowed) => allowed.to_value(),
                None => match field.field_type {
                    FieldType::String => json!("value"),
                    FieldType::Integer => json!(1),
                    FieldType::Boolean => json!(true),
                    FieldType::Array => json!([]),
                    FieldType::Object => json!({}),
                },
            };
            config.insert(name.to_string(), value);
        }
        config
    }

    /// Builds inputs for every required slot, returning them with the UUIDs used
    fn minimal_inputs(schema: &NodeSchema) -> (NodeInputs, HashSet<Uuid>) {
        let mut inputs = NodeInputs::new();
        let mut existing = HashSet::new();
        for (name, slot) in schema.inputs {
            if !slot.required {
                continue;
            }
            let value = match slot.arity {
                Arity::Single => InputRef::One(Uuid::new_v4()),
                Arity::Multiple => {
                    InputRef::Many((0..slot.min_count.unwrap_or(1)).map(|_| Uuid::new_v4()).collect())
                }
            };
            existing.extend(value.uuids().iter().copied());
            inputs.insert(name.to_string(), value);
        }
        (inputs, existing)
    }

    #[test]
    fn test_minimal_definition_is_valid_for_every_type() {
        for kind in NodeType::ALL {
            let schema = schema_for(kind);
            for provider in schema.providers {
                let (inputs, existing) = minimal_inputs(schema);
                let config = minimal_config(provider);

                let result = validate(kind.as_str(), provider.name, &inputs, &config, &existing);

                assert!(result.is_valid, "{}/{}: {:?}", kind, provider.name, result.errors);
                assert!(result.errors.is_empty());
            }
        }
    }

    #[test]
    fn test_missing_required_slot_is_keyed_by_slot_name() {
        for kind in NodeType::ALL {
            let schema = schema_for(kind);
            let provider = &schema.providers[0];
            for (name, slot) in schema.inputs {
                if !slot.required {
                    continue;
                }
                let (mut inputs, existing) = minimal_inputs(schema);
                inputs.remove(*name);

                let result =
                    validate(kind.as_str(), provider.name, &inputs, &minimal_config(provider), &existing);

                assert!(!result.is_valid);
                assert_eq!(result.messages(name), ["is required"], "{}.{}", kind, name);
            }
        }
    }

    #[test]
    fn test_unknown_type_short_circuits() {
        let mut inputs = NodeInputs::new();
        inputs.insert("anything".to_string(), InputRef::One(Uuid::new_v4()));

        let result = validate("upscale", "", &inputs, &NodeConfig::new(), &HashSet::new());

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.messages("type"), ["unknown node type 'upscale'"]);
    }

    #[test]
    fn test_blank_provider_short_circuits() {
        let result = validate("merge-videos", "  ", &NodeInputs::new(), &NodeConfig::new(), &HashSet::new());

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.messages("provider"), ["can't be blank"]);
    }

    #[test]
    fn test_unsupported_provider_short_circuits() {
        let result = validate("merge-videos", "premiere", &NodeInputs::new(), &NodeConfig::new(), &HashSet::new());

        assert_eq!(result.errors.len(), 1);
        assert!(result.messages("provider")[0].contains("'premiere' is not a supported provider"));
    }

    #[test]
    fn test_merge_videos_segment_count() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let existing: HashSet<Uuid> = [a, b].into_iter().collect();

        let mut inputs = NodeInputs::new();
        inputs.insert("segments".to_string(), InputRef::Many(vec![a]));
        let result = validate("merge-videos", "ffmpeg", &inputs, &NodeConfig::new(), &existing);
        assert_eq!(result.messages("segments"), ["must have at least 2 item(s)"]);

        inputs.insert("segments".to_string(), InputRef::Many(vec![a, b]));
        let result = validate("merge-videos", "ffmpeg", &inputs, &NodeConfig::new(), &existing);
        assert!(result.is_valid);
    }

    #[test]
    fn test_multiple_slot_rejects_single_reference() {
        let a = Uuid::new_v4();
        let mut inputs = NodeInputs::new();
        inputs.insert("segments".to_string(), InputRef::One(a));

        let result = validate("merge-videos", "ffmpeg", &inputs, &NodeConfig::new(), &HashSet::from([a]));

        assert_eq!(result.messages("segments"), ["must be a list of node references"]);
    }

    #[test]
    fn test_single_slot_rejects_list() {
        let a = Uuid::new_v4();
        let mut inputs = NodeInputs::new();
        inputs.insert("audio".to_string(), InputRef::Many(vec![a]));
        let mut config = NodeConfig::new();
        config.insert("avatar_id".to_string(), json!("avatar-1"));

        let result = validate("generate-talking-head", "heygen", &inputs, &config, &HashSet::from([a]));

        assert_eq!(result.messages("audio"), ["must be a single node reference"]);
    }

    #[test]
    fn test_max_count_is_enforced() {
        let background = Uuid::new_v4();
        let overlays: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let mut existing: HashSet<Uuid> = overlays.iter().copied().collect();
        existing.insert(background);

        let mut inputs = NodeInputs::new();
        inputs.insert("background".to_string(), InputRef::One(background));
        inputs.insert("overlays".to_string(), InputRef::Many(overlays));
        let mut config = NodeConfig::new();
        config.insert("layout".to_string(), json!("stacked"));

        let result = validate("compose-video", "ffmpeg", &inputs, &config, &existing);

        assert_eq!(result.messages("overlays"), ["must have at most 4 item(s)"]);
    }

    #[test]
    fn test_unexpected_slot_and_input_errors_accumulate() {
        let a = Uuid::new_v4();
        let mut inputs = NodeInputs::new();
        inputs.insert("clips".to_string(), InputRef::Many(vec![a]));

        let result = validate("merge-videos", "ffmpeg", &inputs, &NodeConfig::new(), &HashSet::from([a]));

        assert_eq!(result.messages("clips"), ["is not an expected input"]);
        assert_eq!(result.messages("segments"), ["is required"]);
    }

    #[test]
    fn test_type_without_inputs_rejects_any_inputs() {
        let a = Uuid::new_v4();
        let mut inputs = NodeInputs::new();
        inputs.insert("source".to_string(), InputRef::One(a));
        let mut config = NodeConfig::new();
        config.insert("media_type".to_string(), json!("video"));

        let result = validate("asset", "upload", &inputs, &config, &HashSet::from([a]));

        assert_eq!(result.messages("inputs"), ["asset nodes should not have inputs"]);
        assert!(result.messages("source").is_empty());
    }

    #[test]
    fn test_non_existent_references_are_named_per_slot() {
        let present = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let mut inputs = NodeInputs::new();
        inputs.insert("video".to_string(), InputRef::One(present));
        inputs.insert("tracks".to_string(), InputRef::Many(vec![present, missing]));

        let result = validate("mix-audio", "ffmpeg", &inputs, &NodeConfig::new(), &HashSet::from([present]));

        assert!(result.messages("video").is_empty());
        assert_eq!(
            result.messages("tracks"),
            [format!("references non-existent node(s): {}", missing)]
        );
    }

    #[test]
    fn test_config_type_and_allowed_values() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut inputs = NodeInputs::new();
        inputs.insert("segments".to_string(), InputRef::Many(vec![a, b]));
        let mut config = NodeConfig::new();
        config.insert("transition".to_string(), json!("wipe"));
        config.insert("transition_duration_ms".to_string(), json!("500"));

        let result = validate("merge-videos", "ffmpeg", &inputs, &config, &HashSet::from([a, b]));

        assert_eq!(result.messages("transition"), ["must be one of: none, fade, crossfade"]);
        assert_eq!(result.messages("transition_duration_ms"), ["must be an integer"]);
    }

    #[test]
    fn test_optional_absent_and_null_fields_are_skipped() {
        let mut config = NodeConfig::new();
        config.insert("prompt".to_string(), json!("a cat on a skateboard"));
        config.insert("duration".to_string(), Value::Null);

        let result = validate("generate-animation", "runway", &NodeInputs::new(), &config, &HashSet::new());

        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_integer_allowed_values() {
        let mut config = NodeConfig::new();
        config.insert("prompt".to_string(), json!("waves"));
        config.insert("duration".to_string(), json!(7));

        let result = validate("generate-animation", "runway", &NodeInputs::new(), &config, &HashSet::new());

        assert_eq!(result.messages("duration"), ["must be one of: 5, 10"]);
    }

    #[test]
    fn test_summary_lists_every_message() {
        let mut result = ValidationResult::default();
        result.add("segments", "is required");
        result.add("transition", "must be a string");

        assert!(!result.is_valid);
        assert_eq!(result.summary(), "segments: is required; transition: must be a string");
    }
}
