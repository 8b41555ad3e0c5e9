//! `muxgrid send`: deliver a message to a mapped instance.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use muxgrid_core::{deliver, PersistedMapping};

use crate::resolve_backend;

#[derive(Args)]
pub struct SendArgs {
    /// Instance id from the persisted mapping
    pub instance: String,

    /// Message text; joined with spaces
    #[arg(required = true, trailing_var_arg = true)]
    pub message: Vec<String>,

    /// Project directory holding the mapping (defaults to the current
    /// directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,
}

impl SendArgs {
    pub fn run(self, backend_choice: Option<&str>) -> Result<()> {
        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().context("cannot determine working directory")?,
        };
        let mapping = PersistedMapping::load(&cwd)?;
        let backend = resolve_backend(backend_choice)?;

        let text = self.message.join(" ");
        deliver(backend.as_ref(), &mapping, &self.instance, &text)?;

        let pane = mapping
            .pane_for(&self.instance)
            .map(|e| e.pane_id.as_str())
            .unwrap_or("?");
        println!("[ok] message delivered to {} (pane {pane})", self.instance);
        Ok(())
    }
}
