//! Editor configuration.
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```toml
//! platform = "apple"
//!
//! [snap]
//! max_distance = 24.0
//!
//! [curve]
//! min_offset = 30.0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EditorResult;
use crate::geometry::{CurveConfig, EdgeHitConfig, SnapPolicy};
use crate::shortcuts::Platform;

/// Tunables for a [`GraphEditor`](crate::GraphEditor).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Port snapping while dragging an edge. No threshold unless set.
    pub snap: SnapPolicy,
    /// Edge curve shape.
    pub curve: CurveConfig,
    /// Edge hover/hit-test tolerance.
    pub hit_test: EdgeHitConfig,
    /// Overrides platform detection for the `mod` shortcut modifier.
    pub platform: Option<Platform>,
}

impl EditorConfig {
    pub fn from_toml_str(source: &str) -> EditorResult<Self> {
        let config: EditorConfig = toml::from_str(source)?;
        tracing::debug!(?config, "editor config loaded");
        Ok(config)
    }

    /// The configured platform, or the detected one.
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::detect)
    }
}
