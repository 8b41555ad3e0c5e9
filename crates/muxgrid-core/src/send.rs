//! Mapping-addressed text delivery.

use muxgrid_mux_core::{MuxError, Multiplexer};
use tracing::debug;

use crate::mapping::PersistedMapping;

/// Deliver `text` to the pane mapped to `instance`.
///
/// Empty or whitespace-only payloads are dropped before any CLI invocation.
/// Unknown instances report the available ids so the caller can correct the
/// address or rebuild the mapping.
pub fn deliver(
    backend: &dyn Multiplexer,
    mapping: &PersistedMapping,
    instance: &str,
    text: &str,
) -> Result<(), MuxError> {
    let entry = mapping.pane_for(instance).ok_or_else(|| {
        MuxError::Other(format!(
            "unknown instance '{instance}'; available: {}",
            mapping.instances().join(", ")
        ))
    })?;

    if text.trim().is_empty() {
        debug!(%instance, "empty payload, nothing to deliver");
        return Ok(());
    }

    backend.send_text(&entry.pane_id, text)
}
