//! Layout orchestration core for muxgrid.
//!
//! Pure layout math, layout construction against a [`Multiplexer`] backend,
//! the durable instance → pane mapping, the mapping-addressed send path, and
//! the completion-notification boundary.

pub mod launch;
pub mod layout;
pub mod mapping;
pub mod notify;
pub mod orchestrate;
pub mod send;

#[cfg(test)]
mod testing;

/// Result type used throughout the orchestration core.
pub type Result<T> = std::result::Result<T, muxgrid_mux_core::MuxError>;

pub use launch::{parse_instance_list, InstanceLaunchSpec};
pub use layout::{compute_layout, split_plan, stacked_plan, GridLayout, SplitStep};
pub use mapping::{PaneEntry, PersistedMapping};
pub use muxgrid_mux_core::{MuxError, Multiplexer};
pub use orchestrate::{
    create_auto_layout, create_stacked_layout, wait_for_control_channel, LayoutOptions,
    LayoutResult,
};
pub use send::deliver;
