//! muxgrid CLI library

pub mod pane;
pub mod send;
pub mod status;
pub mod tab;

use anyhow::Result;
use muxgrid_mux_core::Multiplexer;

// Re-export CLI types for testing
pub use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "muxgrid")]
#[command(about = "Multi-pane terminal session orchestrator")]
#[command(version, author, long_about = None)]
pub struct Cli {
    /// Multiplexer backend to drive (wezterm, tmux); detected from the
    /// current session when omitted
    #[arg(long, global = true)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a split-pane layout for the given instances
    Pane(pane::PaneArgs),
    /// Open one tab per instance
    Tab(tab::TabArgs),
    /// Send a message to a mapped instance
    Send(send::SendArgs),
    /// Show the persisted mapping and pane liveness
    Status(status::StatusArgs),
}

/// Resolve the backend once at startup; every subcommand threads the same
/// instance through.
pub(crate) fn resolve_backend(choice: Option<&str>) -> Result<Box<dyn Multiplexer + Send + Sync>> {
    let backend = match choice {
        Some(name) => muxgrid_mux::backend_by_name(name)?,
        None => muxgrid_mux::default_backend()?,
    };
    Ok(backend)
}
