//! `muxgrid tab`: one top-level tab per instance.
//!
//! The first instance takes the current pane; the rest spawn as new tabs.
//! Commands are delivered as typed text after the tab's shell is up, which
//! also lets each instance see its own env assignment.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Args;
use muxgrid_core::mapping::PaneEntry;
use muxgrid_core::{parse_instance_list, InstanceLaunchSpec, PersistedMapping};
use muxgrid_mux_core::Multiplexer;
use tracing::warn;

use crate::resolve_backend;

/// Pause between tab creations so the shells come up in order.
const TAB_SETTLE: Duration = Duration::from_millis(500);

#[derive(Args)]
pub struct TabArgs {
    /// Comma-separated instance ids, e.g. "ui,coder,test"
    pub instances: String,

    /// Working directory for the tabs (defaults to the current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Command to start in each tab; the shell is left idle when omitted
    #[arg(long)]
    pub command: Option<String>,
}

fn setup_tab(
    backend: &dyn Multiplexer,
    pane: &str,
    spec: &InstanceLaunchSpec,
    command: &str,
) -> Result<()> {
    if !command.is_empty() {
        backend.send_text(pane, &spec.command_line(command))?;
    }
    if let Err(err) = backend.set_title(pane, &spec.tab_title()) {
        warn!(%pane, %err, "failed to set tab title");
    }
    Ok(())
}

impl TabArgs {
    pub fn run(self, backend_choice: Option<&str>) -> Result<()> {
        let instances = parse_instance_list(&self.instances);
        ensure!(!instances.is_empty(), "no instances given");

        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().context("cannot determine working directory")?,
        };
        let backend = resolve_backend(backend_choice)?;
        let command = self.command.unwrap_or_default();

        let specs: Vec<InstanceLaunchSpec> = instances
            .iter()
            .map(|id| InstanceLaunchSpec::new(id, ""))
            .collect();

        let first_pane = backend
            .current_pane()
            .context("no current pane; run `muxgrid tab` from inside the multiplexer")?;

        let mut tabs = BTreeMap::new();

        setup_tab(backend.as_ref(), &first_pane, &specs[0], &command)?;
        println!("[+] {} -> pane {first_pane} (current)", specs[0].instance_id);
        tabs.insert(
            specs[0].instance_id.clone(),
            PaneEntry { pane_id: first_pane, role: specs[0].role.clone() },
        );

        for spec in &specs[1..] {
            let pane = backend.spawn_tab(&cwd)?;
            thread::sleep(TAB_SETTLE);
            setup_tab(backend.as_ref(), &pane, spec, &command)?;
            println!("[+] {} -> pane {pane}", spec.instance_id);
            tabs.insert(
                spec.instance_id.clone(),
                PaneEntry { pane_id: pane, role: spec.role.clone() },
            );
        }

        let mapping = PersistedMapping::new(&cwd, tabs);
        let path = mapping.save(&cwd)?;
        println!("[+] mapping saved to {}", path.display());
        println!("[ok] {} tab(s) ready via {}", instances.len(), backend.id());
        Ok(())
    }
}

