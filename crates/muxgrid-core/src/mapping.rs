//! Durable instance → pane mapping.
//!
//! Written wholesale after a successful layout run and read by later,
//! independent invocations that address a pane by instance id. No expiry:
//! staleness is detected lazily through the liveness query, not here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use muxgrid_mux_core::MuxError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::launch::InstanceLaunchSpec;
use crate::orchestrate::LayoutResult;

/// Project-local configuration directory, relative to the work dir.
pub const CONFIG_DIR: &str = ".muxgrid";
pub const MAPPING_FILE: &str = "tab_mapping.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneEntry {
    pub pane_id: String,
    pub role: String,
}

/// On-disk record of which instance occupies which pane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedMapping {
    pub work_dir: String,
    pub tabs: BTreeMap<String, PaneEntry>,
    pub created_at: f64,
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

impl PersistedMapping {
    pub fn new(work_dir: &Path, tabs: BTreeMap<String, PaneEntry>) -> Self {
        Self {
            work_dir: work_dir.to_string_lossy().into_owned(),
            tabs,
            created_at: unix_now(),
        }
    }

    /// Durable projection of a layout result, stripped of transient fields
    /// like `needs_attach`.
    pub fn from_layout(
        work_dir: &Path,
        layout: &LayoutResult,
        specs: &[InstanceLaunchSpec],
    ) -> Self {
        let tabs = layout
            .panes
            .iter()
            .map(|(instance, pane_id)| {
                let role = specs
                    .iter()
                    .find(|s| &s.instance_id == instance)
                    .map(|s| s.role.clone())
                    .unwrap_or_default();
                (
                    instance.clone(),
                    PaneEntry {
                        pane_id: pane_id.clone(),
                        role,
                    },
                )
            })
            .collect();
        Self::new(work_dir, tabs)
    }

    pub fn mapping_path(work_dir: &Path) -> PathBuf {
        work_dir.join(CONFIG_DIR).join(MAPPING_FILE)
    }

    /// Overwrite the mapping file wholesale, so a later reader never sees a
    /// previous run's layout merged with this one.
    pub fn save(&self, work_dir: &Path) -> Result<PathBuf, MuxError> {
        let dir = work_dir.join(CONFIG_DIR);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(MAPPING_FILE);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MuxError::Other(format!("mapping serialization failed: {e}")))?;
        std::fs::write(&path, json + "\n")?;
        Ok(path)
    }

    /// Read the mapping for `work_dir`. Missing or malformed files surface as
    /// [`MuxError::MappingUnavailable`], pushing the caller into the
    /// mapping-repair flow rather than crashing.
    pub fn load(work_dir: &Path) -> Result<Self, MuxError> {
        let path = Self::mapping_path(work_dir);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            debug!(path = %path.display(), %e, "mapping not readable");
            MuxError::MappingUnavailable
        })?;
        // Editors on the Windows side like to prepend a BOM.
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
        serde_json::from_str(raw).map_err(|e| {
            debug!(path = %path.display(), %e, "mapping malformed");
            MuxError::MappingUnavailable
        })
    }

    pub fn pane_for(&self, instance: &str) -> Option<&PaneEntry> {
        self.tabs.get(instance)
    }

    /// Instance ids in stable order, for error messages and status output.
    pub fn instances(&self) -> Vec<&str> {
        self.tabs.keys().map(String::as_str).collect()
    }
}
