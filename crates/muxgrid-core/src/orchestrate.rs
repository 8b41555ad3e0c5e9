//! Layout construction against a backend.
//!
//! Executes a split plan one CLI call at a time, resolves the root pane
//! (current pane when running inside a multiplexer, detached container
//! session otherwise), and writes marker titles so panes can be found again
//! if their ids are lost.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use muxgrid_mux_core::{MuxError, Multiplexer, PaneId, PaneOptions};
use tracing::{debug, info, warn};

use crate::layout::{split_plan, stacked_plan, SplitStep};

/// Default marker prefix written into pane titles.
pub const MARKER_PREFIX: &str = "MUXGRID";

/// In-memory result of a layout run; the durable projection is
/// [`crate::mapping::PersistedMapping`].
#[derive(Clone, Debug)]
pub struct LayoutResult {
    pub panes: BTreeMap<String, PaneId>,
    pub root_pane_id: PaneId,
    /// True only when a detached container session was created that has no
    /// interactive viewer yet.
    pub needs_attach: bool,
    pub created_panes: Vec<PaneId>,
}

/// Knobs for a layout run.
#[derive(Clone, Debug)]
pub struct LayoutOptions {
    pub cwd: PathBuf,
    /// Pane to build under; the backend's current pane when absent.
    pub root_pane: Option<String>,
    /// Container session name when one has to be created.
    pub container_name: Option<String>,
    /// Split percentage applied by the strict plan.
    pub percent: u8,
    pub set_markers: bool,
    pub marker_prefix: String,
    /// Command launched in each created pane; empty for the default shell.
    pub command: String,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            root_pane: None,
            container_name: None,
            percent: 50,
            set_markers: true,
            marker_prefix: MARKER_PREFIX.to_string(),
            command: String::new(),
        }
    }
}

fn check_instances(instances: &[String]) -> Result<(), MuxError> {
    if instances.is_empty() {
        return Err(MuxError::LayoutInputInvalid(
            "instance list must not be empty".to_string(),
        ));
    }
    let mut seen = std::collections::BTreeSet::new();
    for id in instances {
        if !seen.insert(id) {
            return Err(MuxError::LayoutInputInvalid(format!(
                "duplicate instance id '{id}'"
            )));
        }
    }
    Ok(())
}

fn default_container_name(cwd: &Path) -> String {
    let dir = cwd
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string());
    format!("muxgrid-{dir}-{}", std::process::id())
}

/// Resolve or allocate the pane the layout grows from.
fn resolve_root(
    backend: &dyn Multiplexer,
    opts: &LayoutOptions,
) -> Result<(PaneId, Vec<PaneId>, bool), MuxError> {
    if let Some(root) = &opts.root_pane {
        return Ok((root.clone(), Vec::new(), false));
    }
    if let Some(current) = backend.current_pane() {
        return Ok((current, Vec::new(), false));
    }

    // Outside any multiplexer: a detached container session becomes the
    // canvas. The caller has to attach a viewer afterwards.
    let name = opts
        .container_name
        .clone()
        .unwrap_or_else(|| default_container_name(&opts.cwd));
    let root = backend.create_container(&name, &opts.cwd)?;
    let needs_attach = std::env::var("TMUX").unwrap_or_default().trim().is_empty();
    info!(session = %name, %root, "created detached container session");
    Ok((root.clone(), vec![root], needs_attach))
}

fn execute_plan(
    backend: &dyn Multiplexer,
    instances: &[String],
    plan: &[SplitStep],
    opts: &LayoutOptions,
) -> Result<LayoutResult, MuxError> {
    let (root, mut created, needs_attach) = resolve_root(backend, opts)?;

    let mut pane_by_index: Vec<PaneId> = vec![root.clone()];
    for step in plan {
        let parent = pane_by_index[step.parent].clone();
        let pane = backend.create_pane(&PaneOptions {
            command: &opts.command,
            cwd: &opts.cwd,
            direction: step.direction,
            percent: step.percent,
            parent: Some(&parent),
        })?;
        debug!(%pane, parent = %parent, "created pane");
        created.push(pane.clone());
        pane_by_index.push(pane);
    }

    if opts.set_markers {
        for (instance, pane) in instances.iter().zip(&pane_by_index) {
            let title = format!("{}-{}", opts.marker_prefix, instance);
            if let Err(err) = backend.set_title(pane, &title) {
                warn!(%pane, %title, %err, "failed to set pane marker title");
            }
        }
    }

    let panes = instances
        .iter()
        .cloned()
        .zip(pane_by_index.iter().cloned())
        .collect();

    Ok(LayoutResult {
        panes,
        root_pane_id: root,
        needs_attach,
        created_panes: created,
    })
}

/// Build the strict 1–4 grid layout for `instances`.
///
/// Only allocates panes; the hosted commands beyond `opts.command` are the
/// caller's business. Ownership of the result (persist or discard) stays with
/// the caller.
pub fn create_auto_layout(
    backend: &dyn Multiplexer,
    instances: &[String],
    opts: &LayoutOptions,
) -> Result<LayoutResult, MuxError> {
    check_instances(instances)?;
    let plan = split_plan(instances.len(), opts.percent)?;
    execute_plan(backend, instances, &plan, opts)
}

/// Build the ad hoc stacked layout; no participant cap, progressively
/// stacked bottom slices instead of a grid.
pub fn create_stacked_layout(
    backend: &dyn Multiplexer,
    instances: &[String],
    opts: &LayoutOptions,
) -> Result<LayoutResult, MuxError> {
    check_instances(instances)?;
    let plan = stacked_plan(instances.len())?;
    execute_plan(backend, instances, &plan, opts)
}

/// Wait for the multiplexer's control channel to answer, polling the pane
/// listing with one-second spacing. The only place a caller may block for
/// several seconds total.
pub fn wait_for_control_channel(
    backend: &dyn Multiplexer,
    attempts: usize,
    spacing: Duration,
) -> bool {
    for round in 0..attempts {
        match backend.list_panes() {
            Ok(panes) if !panes.is_empty() => return true,
            Ok(_) | Err(_) => {}
        }
        if round + 1 < attempts {
            debug!(round = round + 1, attempts, "control channel not ready");
            thread::sleep(spacing);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeBackend};

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // Three instances: unsplit root plus exactly two created panes, matching
    // the strict split rule.
    #[test]
    fn test_auto_layout_three_instances() {
        let backend = FakeBackend::inside("fake-0");
        let result =
            create_auto_layout(&backend, &ids(&["ui", "coder", "test"]), &LayoutOptions::default())
                .unwrap();

        assert_eq!(result.panes.len(), 3);
        assert_eq!(result.root_pane_id, "fake-0");
        assert!(!result.needs_attach);
        assert_eq!(result.created_panes.len(), 2);
        assert_eq!(result.panes["ui"], "fake-0");
        assert_eq!(result.panes["coder"], "fake-1");
        assert_eq!(result.panes["test"], "fake-2");

        let calls = backend.calls();
        let creates: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, Call::CreatePane { .. }))
            .collect();
        assert_eq!(creates.len(), 2);
        // Second split stacks the right pane, not the root.
        match creates[1] {
            Call::CreatePane { parent, .. } => assert_eq!(parent.as_deref(), Some("fake-1")),
            _ => unreachable!(),
        }
        let titles: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                Call::SetTitle { title, .. } => Some(title.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(titles, vec!["MUXGRID-ui", "MUXGRID-coder", "MUXGRID-test"]);
    }

    #[test]
    fn test_auto_layout_single_instance_no_splits() {
        let backend = FakeBackend::inside("fake-0");
        let result =
            create_auto_layout(&backend, &ids(&["solo"]), &LayoutOptions::default()).unwrap();
        assert_eq!(result.created_panes.len(), 0);
        assert_eq!(result.panes["solo"], "fake-0");
        assert!(backend
            .calls()
            .iter()
            .all(|c| !matches!(c, Call::CreatePane { .. })));
    }

    #[test]
    fn test_auto_layout_rejects_empty_and_oversize() {
        let backend = FakeBackend::inside("fake-0");
        assert!(matches!(
            create_auto_layout(&backend, &[], &LayoutOptions::default()),
            Err(MuxError::LayoutInputInvalid(_))
        ));
        assert!(matches!(
            create_auto_layout(
                &backend,
                &ids(&["a", "b", "c", "d", "e"]),
                &LayoutOptions::default()
            ),
            Err(MuxError::LayoutInputInvalid(_))
        ));
        // Rejected before any CLI call was attempted.
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_auto_layout_rejects_duplicates() {
        let backend = FakeBackend::inside("fake-0");
        assert!(matches!(
            create_auto_layout(&backend, &ids(&["a", "a"]), &LayoutOptions::default()),
            Err(MuxError::LayoutInputInvalid(_))
        ));
    }

    #[test]
    fn test_container_root_when_outside_multiplexer() {
        let backend = FakeBackend::detached();
        std::env::remove_var("TMUX");
        let result =
            create_auto_layout(&backend, &ids(&["a", "b"]), &LayoutOptions::default()).unwrap();
        assert!(result.needs_attach);
        assert_eq!(result.root_pane_id, "fake-root");
        // Container root counts as created alongside the one split pane.
        assert_eq!(result.created_panes.len(), 2);
        assert!(backend
            .calls()
            .iter()
            .any(|c| matches!(c, Call::CreateContainer { .. })));
    }

    #[test]
    fn test_explicit_root_pane_wins() {
        let backend = FakeBackend::inside("fake-0");
        let opts = LayoutOptions {
            root_pane: Some("%41".to_string()),
            ..LayoutOptions::default()
        };
        let result = create_auto_layout(&backend, &ids(&["x", "y"]), &opts).unwrap();
        assert_eq!(result.root_pane_id, "%41");
        assert_eq!(result.panes["x"], "%41");
    }

    #[test]
    fn test_stacked_layout_beyond_four() {
        let backend = FakeBackend::inside("fake-0");
        let result = create_stacked_layout(
            &backend,
            &ids(&["a", "b", "c", "d", "e"]),
            &LayoutOptions::default(),
        )
        .unwrap();
        assert_eq!(result.panes.len(), 5);
        assert_eq!(result.created_panes.len(), 4);
        // Every split targets the root's region.
        for call in backend.calls().iter() {
            if let Call::CreatePane { parent, .. } = call {
                assert_eq!(parent.as_deref(), Some("fake-0"));
            }
        }
    }

    #[test]
    fn test_wait_for_control_channel_bounded() {
        let backend = FakeBackend::detached();
        // Listing is empty: must give up after the capped attempts.
        assert!(!wait_for_control_channel(&backend, 2, Duration::ZERO));
    }
}
