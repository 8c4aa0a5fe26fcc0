//! Error types for the editing core.
//!
//! Only integration mistakes surface as [`EditorError`]. Rejected gestures
//! (an edge that cannot connect, undo with nothing to undo, ...) are expected
//! outcomes and are reported through `bool`/`Option` returns instead.

use thiserror::Error;

/// Errors raised when the editor is driven incorrectly.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Node index {index} out of range (graph has {len} nodes)")]
    NodeIndexOutOfRange { index: usize, len: usize },

    #[error("Edge index {index} out of range (graph has {len} edges)")]
    EdgeIndexOutOfRange { index: usize, len: usize },

    #[error("Node context requested for index {0}, which is not mounted")]
    NodeContextUnavailable(usize),

    #[error("Invalid key combo {combo:?}: {reason}")]
    InvalidCombo { combo: String, reason: String },

    #[error("Shortcut {0} is not registered")]
    UnknownShortcut(u64),

    #[error("Editor {0} is borrowed by a running callback")]
    Reentrant(&'static str),

    #[error("Plugin {plugin} failed: {message}")]
    Plugin { plugin: String, message: String },

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;
