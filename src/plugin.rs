//! Plugin contract.
//!
//! A plugin customizes validation, import/export and lifecycle notifications
//! without the store depending on it. Every method has a default, so a plugin
//! implements only the capabilities it has:
//!
//! - lifecycle hooks default to `Ok(())`
//! - validators and converters default to `None`, meaning "not provided"
//!
//! Hooks take `&self`; plugins that need to record state use interior
//! mutability.
//!
//! # Example
//!
//! ```ignore
//! struct SingleOutput;
//!
//! impl GraphPlugin for SingleOutput {
//!     fn name(&self) -> &str { "single-output" }
//!
//!     fn validate_edge(&self, source: &EdgeEndpoint, _: &EdgeEndpoint, _: &[Node], edges: &[Edge]) -> Option<bool> {
//!         Some(!edges.iter().any(|e| &e.source == source))
//!     }
//! }
//!
//! store.register_plugin(Rc::new(SingleOutput));
//! ```

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::model::{Edge, EdgeEndpoint, Node, NodePosition, Snapshot};

/// Return type of lifecycle hooks. Errors are logged by the store and
/// never abort the operation that fired the hook.
pub type HookResult = anyhow::Result<()>;

/// What changed in an `on_node_update` notification.
#[derive(Debug, Clone, Copy)]
pub enum NodeUpdate<'a> {
    Position(&'a NodePosition),
    Data(&'a Map<String, Value>),
}

/// Extension point for graph-specific behaviour.
pub trait GraphPlugin {
    /// Plugin name, used by [`PluginRegistry::get`].
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Called once, synchronously, when the plugin is registered.
    fn on_init(&self) -> HookResult {
        Ok(())
    }

    fn on_node_add(&self, _node: &Node) -> HookResult {
        Ok(())
    }

    fn on_node_update(&self, _node_id: &str, _update: NodeUpdate<'_>) -> HookResult {
        Ok(())
    }

    fn on_node_delete(&self, _node_id: &str) -> HookResult {
        Ok(())
    }

    fn on_edge_add(&self, _edge: &Edge) -> HookResult {
        Ok(())
    }

    fn on_edge_delete(&self, _index: usize, _edge: &Edge) -> HookResult {
        Ok(())
    }

    /// Vote on a new edge. `Some(false)` vetoes it.
    fn validate_edge(
        &self,
        _source: &EdgeEndpoint,
        _target: &EdgeEndpoint,
        _nodes: &[Node],
        _edges: &[Edge],
    ) -> Option<bool> {
        None
    }

    /// Vote on a new node. `Some(false)` vetoes it.
    fn validate_node(&self, _node: &Node) -> Option<bool> {
        None
    }

    /// Convert a snapshot into the plugin's external representation.
    fn export_data(&self, _snapshot: &Snapshot) -> Option<anyhow::Result<Value>> {
        None
    }

    /// Convert an external representation into a snapshot.
    fn import_data(&self, _raw: &Value) -> Option<anyhow::Result<Snapshot>> {
        None
    }
}

/// Ordered, append-only list of registered plugins.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Rc<dyn GraphPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `plugin` and run its `on_init` hook.
    pub fn register(&mut self, plugin: Rc<dyn GraphPlugin>) {
        tracing::info!(plugin = plugin.name(), version = plugin.version(), "registering plugin");
        self.plugins.push(plugin.clone());
        if let Err(err) = plugin.on_init() {
            tracing::warn!(plugin = plugin.name(), error = %err, "plugin on_init failed");
        }
    }

    /// First plugin registered under `name`.
    pub fn get(&self, name: &str) -> Option<Rc<dyn GraphPlugin>> {
        self.plugins.iter().find(|p| p.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn GraphPlugin>> {
        self.plugins.iter()
    }

    /// Run a lifecycle hook on every plugin in registration order.
    /// Failures are logged and do not stop the remaining plugins.
    pub fn notify<F>(&self, hook: &'static str, f: F)
    where
        F: Fn(&dyn GraphPlugin) -> HookResult,
    {
        for plugin in &self.plugins {
            if let Err(err) = f(plugin.as_ref()) {
                tracing::warn!(plugin = plugin.name(), hook, error = %err, "plugin hook failed");
            }
        }
    }

    /// AND of every plugin's edge vote; `None` when no plugin votes.
    pub fn validate_edge(&self, edge: &Edge, nodes: &[Node], edges: &[Edge]) -> Option<bool> {
        let mut verdict = None;
        for plugin in &self.plugins {
            match plugin.validate_edge(&edge.source, &edge.target, nodes, edges) {
                Some(false) => {
                    tracing::debug!(plugin = plugin.name(), "edge vetoed by plugin");
                    return Some(false);
                }
                Some(true) => verdict = Some(true),
                None => {}
            }
        }
        verdict
    }

    /// AND of every plugin's node vote; `None` when no plugin votes.
    pub fn validate_node(&self, node: &Node) -> Option<bool> {
        let mut verdict = None;
        for plugin in &self.plugins {
            match plugin.validate_node(node) {
                Some(false) => {
                    tracing::debug!(plugin = plugin.name(), node_id = %node.node_id, "node vetoed by plugin");
                    return Some(false);
                }
                Some(true) => verdict = Some(true),
                None => {}
            }
        }
        verdict
    }

    /// Exporter of the first plugin that provides one.
    pub fn export_data(&self, snapshot: &Snapshot) -> Option<(&str, anyhow::Result<Value>)> {
        self.plugins
            .iter()
            .find_map(|p| p.export_data(snapshot).map(|result| (p.name(), result)))
    }

    /// Importer of the first plugin that provides one.
    pub fn import_data(&self, raw: &Value) -> Option<(&str, anyhow::Result<Snapshot>)> {
        self.plugins
            .iter()
            .find_map(|p| p.import_data(raw).map(|result| (p.name(), result)))
    }
}
