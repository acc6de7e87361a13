//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: Source code display with syntax highlighting and current line indicator
//! - [`locals`]: Bindings of the current frame, with linked lists drawn as chains
//! - [`output`]: Captured program output and the uncaught error, if any
//! - [`status`]: Status bar with keybindings and the current event
//!
//! Each pane module exports a primary `render_*` function plus the state or
//! data types it needs.

pub mod locals;
pub mod output;
pub mod source;
pub mod status;

pub use locals::render_locals_pane;
pub use output::{render_output_pane, OutputRenderData};
pub use source::{render_source_pane, SourceScrollState};
pub use status::render_status_bar;
