//! Frame event hook
//!
//! An installed [`TraceHook`] observes execution the way a line tracer does:
//! a `call` event when a frame starts, a `line` event before each new source
//! line runs and a `return` event when a frame finishes, whether normally or
//! because an exception is unwinding through it.
//!
//! The hook is detached while it runs, so anything it evaluates through the
//! interpreter produces no further events.

use super::engine::Interpreter;
use crate::memory::stack::FrameKind;

/// Kinds of frame events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Call,
    Line,
    Return,
}

impl TraceEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceEvent::Call => "call",
            TraceEvent::Line => "line",
            TraceEvent::Return => "return",
        }
    }
}

/// Receiver of frame events
pub trait TraceHook {
    fn on_event(&mut self, interp: &mut Interpreter<'_>, event: TraceEvent);
}

/// What the hook can learn about the frame an event belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub function: String,
    pub line: usize,
    pub kind: FrameKind,
}

impl FrameInfo {
    pub fn is_module(&self) -> bool {
        self.kind == FrameKind::Module
    }
}
