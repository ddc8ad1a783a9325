//! Invocation payloads
//!
//! Resolves a node's input references into the outputs of the referenced
//! nodes and assembles the JSON handed to the function.

use reel_core::domain::node::{InputRef, Node, NodeOutput, NodeStatus};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::ExecutionError;
use crate::repository::{NodeRepository, Store};

/// Output of one referenced node, as seen by the function
#[derive(Debug, Clone, Serialize)]
pub struct InputOutput {
    pub node_uuid: Uuid,
    #[serde(flatten)]
    pub output: NodeOutput,
}

/// A resolved input slot, keeping the arity and order of the reference
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResolvedInput {
    One(InputOutput),
    Many(Vec<InputOutput>),
}

pub type ResolvedInputs = BTreeMap<String, ResolvedInput>;

/// Loads every referenced node and checks that it can feed this node
///
/// A reference to a node that no longer exists, one that has not completed,
/// and one that completed without a usable output are distinct failures.
pub async fn resolve_inputs(store: &dyn Store, node: &Node) -> Result<ResolvedInputs, ExecutionError> {
    let referenced = node.referenced_uuids();
    let loaded: HashMap<Uuid, Node> = store
        .find_nodes_in_pipeline(node.pipeline_id, &referenced)
        .await?
        .into_iter()
        .map(|input| (input.uuid, input))
        .collect();

    let mut resolved = ResolvedInputs::new();
    for (slot, value) in &node.inputs {
        let entry = match value {
            InputRef::One(id) => ResolvedInput::One(ready_output(slot, *id, &loaded)?),
            InputRef::Many(ids) => ResolvedInput::Many(
                ids.iter()
                    .map(|id| ready_output(slot, *id, &loaded))
                    .collect::<Result<_, _>>()?,
            ),
        };
        resolved.insert(slot.clone(), entry);
    }

    Ok(resolved)
}

fn ready_output(
    slot: &str,
    id: Uuid,
    loaded: &HashMap<Uuid, Node>,
) -> Result<InputOutput, ExecutionError> {
    let input = loaded.get(&id).ok_or_else(|| ExecutionError::InputNotFound {
        slot: slot.to_string(),
        input: id,
    })?;

    if input.status != NodeStatus::Completed {
        return Err(ExecutionError::InputNotCompleted {
            slot: slot.to_string(),
            input: id,
            status: input.status,
        });
    }

    match &input.output {
        Some(output) if output.is_usable() => Ok(InputOutput {
            node_uuid: id,
            output: output.clone(),
        }),
        _ => Err(ExecutionError::InputMissingOutput {
            slot: slot.to_string(),
            input: id,
        }),
    }
}

/// Builds the payload of one invocation
pub fn build_payload(
    node: &Node,
    process_uuid: Uuid,
    inputs: &ResolvedInputs,
    callback_url: Option<String>,
) -> Value {
    let mut payload = json!({
        "node_uuid": node.uuid,
        "process_uuid": process_uuid,
        "pipeline_id": node.pipeline_id,
        "node_type": node.node_type,
        "provider": node.provider,
        "config": node.config,
        "inputs": inputs,
        "asset": node.asset,
    });

    if let Some(url) = callback_url {
        payload["callback_url"] = Value::String(url);
    }

    payload
}
