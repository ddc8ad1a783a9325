//! Result mapping
//!
//! Turns the JSON a function returned (synchronously or through a callback)
//! into the node's output descriptor.

use reel_core::domain::node::{AssetDescriptor, NodeConfig, NodeOutput, NodeType};
use serde_json::{Map, Value};

use crate::service::lifecycle_service::NodeCompletion;

/// Keys consumed by the mapping; everything else is kept as output extras
const RESERVED_KEYS: &[&str] = &[
    "location", "url", "video_url", "audio_url", "type", "duration", "size", "cost", "status",
];

/// Whether a function accepted the work and will report through a callback
pub fn is_deferred(result: &Value) -> bool {
    matches!(
        result.get("status").and_then(Value::as_str),
        Some("pending") | Some("accepted")
    )
}

/// Maps a function result into a node completion
///
/// The storage locator is read from `location`, then `url`, then the
/// type-specific key (`audio_url` for voiceovers, `video_url` otherwise).
/// Asset nodes fall back to the locator of their source, see [`asset_location`].
pub fn map_result(
    kind: NodeType,
    config: &NodeConfig,
    asset: Option<&AssetDescriptor>,
    result: &Value,
) -> Result<NodeCompletion, String> {
    let Some(fields) = result.as_object() else {
        return Err(format!("expected a JSON object, got {}", kind_of(result)));
    };

    let location = ["location", "url", location_alias(kind)]
        .iter()
        .find_map(|key| {
            fields
                .get(*key)
                .and_then(Value::as_str)
                .filter(|location| !location.trim().is_empty())
        })
        .or_else(|| {
            (kind == NodeType::Asset)
                .then(|| asset_location(asset, config))
                .flatten()
        })
        .map(str::to_string)
        .ok_or_else(|| format!("result of {} has no output location", kind))?;

    let media_type = fields
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| default_media_type(kind, config).to_string());

    let size = fields
        .get("size")
        .and_then(Value::as_u64)
        .or_else(|| asset.and_then(|a| a.size));

    let extra: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(NodeCompletion {
        output: NodeOutput {
            media_type,
            location,
            duration: fields.get("duration").and_then(Value::as_f64),
            size,
            extra,
        },
        cost: fields.get("cost").and_then(Value::as_f64),
    })
}

/// Where an asset node's media lives: the descriptor's locator, else `source_url`
pub fn asset_location<'a>(
    asset: Option<&'a AssetDescriptor>,
    config: &'a NodeConfig,
) -> Option<&'a str> {
    asset.map(|a| a.location.as_str()).or_else(|| {
        config
            .get("source_url")
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
    })
}

fn location_alias(kind: NodeType) -> &'static str {
    match kind {
        NodeType::GenerateVoiceover => "audio_url",
        _ => "video_url",
    }
}

fn default_media_type(kind: NodeType, config: &NodeConfig) -> &str {
    match kind {
        NodeType::GenerateVoiceover => "audio",
        NodeType::Asset => config
            .get("media_type")
            .and_then(Value::as_str)
            .unwrap_or("video"),
        _ => "video",
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
