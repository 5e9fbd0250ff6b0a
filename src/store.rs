//! [`WidgetStore`] implementation backed by a JSON file.
//!
//! The file holds the widget array exactly as serialized by serde:
//!
//! ```json
//! [
//!   {"id":"widget-1-…","type":"clock","layout":{"x":0,"y":0,"w":2,"h":2},
//!    "mobileLayout":{"x":0,"y":0,"w":1,"h":2},"config":{}}
//! ]
//! ```
//!
//! Writes go to a sibling temporary file that is then renamed over the
//! target, so a crash mid-write never leaves a truncated array behind.

use crate::traits::WidgetStore;
use crate::widget::Widget;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-backed widget persistence.
pub struct JsonFileStore {
    path: PathBuf,
}

/// Errors produced by the JSON file store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JsonFileStore {
    /// Create a store for `path`.  Nothing is read until
    /// [`load`](WidgetStore::load).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The file the widgets are kept in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl WidgetStore for JsonFileStore {
    type Error = StoreError;

    /// A missing file is an empty dashboard.
    fn load(&self) -> Result<Vec<Widget>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let widgets: Vec<Widget> = serde_json::from_str(&contents)?;
                info!("loaded {} widget(s) from {}", widgets.len(), self.path.display());
                Ok(widgets)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} does not exist, starting empty", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, widgets: &[Widget]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(widgets)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("saved {} widget(s) to {}", widgets.len(), self.path.display());
        Ok(())
    }
}

//  Tests
