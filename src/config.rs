//! Application configuration.
//!
//! The configuration is loaded from a JSON file whose path is passed on the
//! command line (`--config <path>`).  Every section is optional, so the file
//! can grow new sections later without breaking older ones.
//!
//! # Example
//!
//! ```json
//! {
//!   "gestures": {
//!     "hold_ms": 200,
//!     "progress_delay_ms": 70,
//!     "move_threshold_px": 5.0,
//!     "auto_reset_ms": 250,
//!     "synthetic_guard_ms": 50,
//!     "resize_zone_px": 12.0
//!   },
//!   "grid": {
//!     "columns": 12,
//!     "mobile_columns": 1,
//!     "compact_on_delete": false,
//!     "mobile_layout_mode": "linked"
//!   },
//!   "history": { "max_depth": 50 },
//!   "policies": {
//!     "clock": { "minW": 2, "minH": 1, "maxW": 4, "maxH": 2, "defaultW": 2, "defaultH": 1 }
//!   }
//! }
//! ```

use crate::gesture::GestureConfig;
use crate::history::HistoryConfig;
use crate::widget::{GridPolicy, MobileLayoutMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Top-level configuration.
///
/// Every field is optional: a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hold-to-drag recognition settings.
    #[serde(default)]
    pub gestures: GestureConfig,

    /// Grid geometry and layout behaviour.
    #[serde(default)]
    pub grid: GridConfig,

    /// Undo/redo settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Size policy per widget type.  Types not listed use
    /// [`GridPolicy::default`].  Missing fields inside a policy also take
    /// their defaults.
    #[serde(default)]
    pub policies: HashMap<String, GridPolicy>,
}

/// Grid geometry and layout behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Width of the desktop grid in cells.
    pub columns: i32,
    /// Width of the mobile grid in cells.
    pub mobile_columns: i32,
    /// Float the remaining widgets up after a deletion.
    pub compact_on_delete: bool,
    /// Mode the editor starts in.
    pub mobile_layout_mode: MobileLayoutMode,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 12,
            mobile_columns: 1,
            compact_on_delete: false,
            mobile_layout_mode: MobileLayoutMode::Linked,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
