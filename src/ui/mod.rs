//! Terminal step-through viewer built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The viewer is organized into three layers:
//!
//! - **[`app`]**: trace position, keyboard event loop, pane focus and autoplay
//! - **[`panes`]**: stateless render functions for each visible pane (source,
//!   locals, output, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with a finished
//! [`Trace`] and the source it came from, then call [`App::run`].
//!
//! [`Trace`]: crate::snapshot::Trace
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
