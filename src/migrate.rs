//! Snapshot normalization for stored graphs.
//!
//! Older integrations kept auxiliary state (a loop directive, for example)
//! either at the snapshot root or under an `extra` object instead of inside
//! `metadata`. [`normalize_snapshot`] is the single place that folds those
//! into `metadata`; every load path goes through it.
//!
//! Precedence when the same key appears more than once:
//! `metadata` > `extra` > root.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{EditorError, EditorResult};
use crate::model::{Node, Snapshot};

const NODES: &str = "nodes";
const EDGES: &str = "edges";
const METADATA: &str = "metadata";
const EXTRA: &str = "extra";

/// Parse a stored snapshot and return it in canonical form.
pub fn normalize_snapshot(raw: Value) -> EditorResult<Snapshot> {
    let Value::Object(mut root) = raw else {
        return Err(EditorError::MalformedSnapshot(
            "snapshot must be a JSON object".into(),
        ));
    };

    let nodes: Vec<Node> = match root.remove(NODES) {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    };
    if let Some(id) = first_duplicate_id(&nodes) {
        return Err(EditorError::MalformedSnapshot(format!(
            "duplicate node id {id:?}"
        )));
    }
    let edges = match root.remove(EDGES) {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    };
    let mut metadata = match root.remove(METADATA) {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            return Err(EditorError::MalformedSnapshot(format!(
                "metadata must be an object, found {}",
                other
            )))
        }
    };

    if let Some(extra) = root.remove(EXTRA) {
        match extra {
            Value::Object(extra) => migrate_fields(&mut metadata, extra, EXTRA),
            other => migrate_fields(&mut metadata, Map::from_iter([(EXTRA.to_string(), other)]), "root"),
        }
    }
    migrate_fields(&mut metadata, root, "root");

    Ok(Snapshot::new(nodes, edges, metadata))
}

/// The first node id that appears more than once, if any.
pub(crate) fn first_duplicate_id(nodes: &[Node]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .iter()
        .map(|node| node.node_id.as_str())
        .find(|id| !seen.insert(*id))
}

fn migrate_fields(metadata: &mut Map<String, Value>, fields: Map<String, Value>, from: &'static str) {
    for (key, value) in fields {
        if metadata.contains_key(&key) {
            tracing::debug!(field = %key, from, "legacy field shadowed by metadata");
            continue;
        }
        tracing::debug!(field = %key, from, "migrating legacy field into metadata");
        metadata.insert(key, value);
    }
}
