//! Call stack implementation
//!
//! This module provides the call stack for frame execution:
//! - [`Stack`]: The call stack containing frames
//! - [`StackFrame`]: A single activation record (module body, function call or class body)
//!
//! Frame bindings do not live in the frame itself: each frame points at a
//! [`Scope`](super::heap::Scope) on the heap, so that closures created while the
//! frame runs can keep its variables alive after it returns. A scope's parent
//! chain is the chain of enclosing function scopes used for name lookup.

use super::value::{Address, Value};
use rustc_hash::FxHashSet;

/// What kind of code a frame is executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Module,
    Function,
    Class,
}

/// Stack frame for a module, function or class body
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_name: String,
    pub kind: FrameKind,
    /// Scope holding this frame's bindings
    pub locals: Address,
    /// Class that defined the running method (or the class a class body builds), for `super()`
    pub owner_class: Option<Address>,
    /// First argument of a method call, for `super()`
    pub receiver: Option<Value>,
    /// Names declared `global`
    pub globals: FxHashSet<String>,
    /// Names declared `nonlocal`
    pub nonlocals: FxHashSet<String>,
    /// Line currently executing
    pub line: usize,
    /// Line of the last `line` event, so statements sharing a line report once
    pub event_line: Option<usize>,
    /// Set once a function or class captured `locals`; the scope is then not freed on return
    pub captured: bool,
}

impl StackFrame {
    pub fn new(function_name: String, kind: FrameKind, locals: Address, line: usize) -> Self {
        StackFrame {
            function_name,
            kind,
            locals,
            owner_class: None,
            receiver: None,
            globals: FxHashSet::default(),
            nonlocals: FxHashSet::default(),
            line,
            event_line: None,
            captured: false,
        }
    }

    pub fn is_module(&self) -> bool {
        self.kind == FrameKind::Module
    }
}

/// The call stack
#[derive(Debug, Clone)]
pub struct Stack {
    frames: Vec<StackFrame>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { frames: Vec::new() }
    }

    /// Push a new stack frame
    pub fn push_frame(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    /// Pop the top stack frame
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Get a mutable reference to the current frame
    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    /// Get all frames, outermost first
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Get the depth of the call stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop_frames() {
        let mut stack = Stack::new();
        stack.push_frame(StackFrame::new("<module>".into(), FrameKind::Module, 1, 0));
        stack.push_frame(StackFrame::new("solve".into(), FrameKind::Function, 2, 4));

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current_frame().map(|f| f.function_name.as_str()), Some("solve"));

        let popped = stack.pop_frame().expect("frame");
        assert!(!popped.is_module());
        assert!(stack.current_frame().is_some_and(|f| f.is_module()));
    }
}
