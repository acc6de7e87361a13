//! # Introduction
//!
//! steptrace runs a small Python-style program and records what happens at
//! every step: which line ran, in which function, how deep the call stack
//! was, and what every variable held. Linked lists and their nodes are
//! recognized by shape alone and rendered as node arrays, so a front end can
//! draw them as boxes and arrows.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Safety check → Lexer → Parser → AST → Interpreter → Recorder → Trace (JSON)
//! ```
//!
//! 1. [`tracer::safety`] rejects source containing denylisted substrings.
//! 2. [`parser`] tokenises the source and builds an AST.
//! 3. [`interpreter`] walks the AST and reports `call`, `line` and `return`
//!    events to an installed [`interpreter::hook::TraceHook`].
//! 4. [`memory`] holds runtime values, the object heap and the frame stack.
//! 5. [`tracer`] gates events and turns them into [`snapshot::Snapshot`]s,
//!    with [`structure`] tagging and rendering each variable.
//! 6. [`ui`] is a ratatui step-through viewer; not part of the stable
//!    library API.
//!
//! ## Example
//!
//! ```
//! let trace = steptrace::run("x = 1\ny = x + 1\nprint(y)\n");
//! assert_eq!(trace.last().map(|e| e.event()), Some("print"));
//! ```

pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;
pub mod structure;
pub mod tracer;
pub mod ui;

pub use snapshot::{Trace, TraceEntry};
pub use tracer::{run, run_to_json};
