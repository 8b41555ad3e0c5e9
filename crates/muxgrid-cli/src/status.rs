//! `muxgrid status`: persisted mapping plus live pane state.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use muxgrid_core::PersistedMapping;

use crate::resolve_backend;

#[derive(Args)]
pub struct StatusArgs {
    /// Project directory holding the mapping (defaults to the current
    /// directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Emit machine-readable JSON instead of the table
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, backend_choice: Option<&str>) -> Result<()> {
        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().context("cannot determine working directory")?,
        };
        let mapping = PersistedMapping::load(&cwd)?;
        let backend = resolve_backend(backend_choice)?;

        if self.json {
            let entries: Vec<serde_json::Value> = mapping
                .tabs
                .iter()
                .map(|(id, entry)| {
                    serde_json::json!({
                        "instance": id,
                        "pane_id": entry.pane_id,
                        "role": entry.role,
                        "alive": backend.is_alive(&entry.pane_id),
                    })
                })
                .collect();
            let doc = serde_json::json!({
                "work_dir": mapping.work_dir,
                "created_at": mapping.created_at,
                "backend": backend.id(),
                "instances": entries,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
            return Ok(());
        }

        println!("work dir: {}", mapping.work_dir);
        println!("backend:  {}", backend.id());
        for (id, entry) in &mapping.tabs {
            let state = if backend.is_alive(&entry.pane_id) {
                "alive"
            } else {
                "gone"
            };
            let role = if entry.role.is_empty() { "-" } else { entry.role.as_str() };
            println!("  {id:<14} pane {:<8} {role:<14} {state}", entry.pane_id);
        }
        println!("[ok] {} instance(s) mapped", mapping.tabs.len());
        Ok(())
    }
}
