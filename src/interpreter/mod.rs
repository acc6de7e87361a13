//! Script interpreter execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: Main interpreter, frames and name resolution
//! - [`errors`]: Runtime error types
//! - [`hook`]: Frame event hook used by tracers
//! - [`statements`], [`expressions`], [`loops`], [`jumps`], [`ops`]: AST execution
//! - [`calls`], [`methods`], [`builtins`]: calling user code, built-in methods and functions
//! - [`format`]: `str`/`repr` and string formatting
//!
//! # Execution Model
//!
//! The interpreter walks the AST and executes statements one at a time.
//! Entering a frame, starting a new line and leaving a frame are reported to
//! the installed [`hook::TraceHook`].

pub mod builtins;
pub mod calls;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod expressions;
pub mod format;
pub mod hook;
pub mod jumps;
pub mod loops;
pub mod methods;
pub mod ops;
pub mod statements;
