//! `muxgrid pane`: split the current window into a grid of instances.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Args;
use muxgrid_core::{
    create_auto_layout, create_stacked_layout, parse_instance_list, InstanceLaunchSpec,
    LayoutOptions, PersistedMapping,
};
use tracing::info;

use crate::resolve_backend;

#[derive(Args)]
pub struct PaneArgs {
    /// Comma-separated instance ids, e.g. "ui,coder,test"
    pub instances: String,

    /// Working directory for the panes (defaults to the current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Command to run in each pane; the default shell when omitted
    #[arg(long)]
    pub command: Option<String>,

    /// Split percentage for the strict grid path
    #[arg(long, default_value_t = 50)]
    pub percent: u8,

    /// Force the stacked ad hoc layout even for four or fewer instances
    #[arg(long)]
    pub stacked: bool,
}

impl PaneArgs {
    pub fn run(self, backend_choice: Option<&str>) -> Result<()> {
        let instances = parse_instance_list(&self.instances);
        ensure!(!instances.is_empty(), "no instances given");

        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().context("cannot determine working directory")?,
        };
        let backend = resolve_backend(backend_choice)?;

        let dir_name = cwd
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_string());
        let container_name = format!("muxgrid-{dir_name}-{}", std::process::id());

        // Layout construction only allocates panes; instance commands are
        // delivered afterwards so each pane gets its own env assignment.
        let opts = LayoutOptions {
            cwd: cwd.clone(),
            container_name: Some(container_name.clone()),
            percent: self.percent,
            ..LayoutOptions::default()
        };

        let stacked = self.stacked || instances.len() > 4;
        if stacked && !self.stacked {
            info!(
                count = instances.len(),
                "more instances than the grid path supports, using stacked layout"
            );
        }
        let result = if stacked {
            create_stacked_layout(backend.as_ref(), &instances, &opts)?
        } else {
            create_auto_layout(backend.as_ref(), &instances, &opts)?
        };

        let specs: Vec<InstanceLaunchSpec> = instances
            .iter()
            .map(|id| InstanceLaunchSpec::new(id, ""))
            .collect();

        if let Some(base) = &self.command {
            for spec in &specs {
                let line = spec.command_line(base);
                backend.send_text(&result.panes[&spec.instance_id], &line)?;
            }
        }

        let mapping = PersistedMapping::from_layout(&cwd, &result, &specs);
        let path = mapping.save(&cwd)?;

        for id in &instances {
            println!("[+] {id} -> pane {}", result.panes[id]);
        }
        println!("[+] mapping saved to {}", path.display());
        if result.needs_attach {
            println!("[*] layout lives in a detached session; attach with: tmux attach -t {container_name}");
        }
        println!(
            "[ok] {} pane(s) ready via {}",
            result.panes.len(),
            backend.id()
        );
        Ok(())
    }
}
