//! Memory model for the interpreter
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Runtime value representation (primitives, tuples, ranges, heap references)
//! - [`stack`]: Call stack with one frame per running module, function or class body
//! - [`heap`]: Object heap with identity-bearing objects and ordered namespaces
//!
//! # Identity
//!
//! Lists, dicts, sets, instances, classes and functions have identity: two
//! [`value::Value::Ref`]s are the same object exactly when their addresses match.
//! Structural linked-list detection relies on this to recognise cycles and
//! back links.

pub mod heap;
pub mod stack;
pub mod value;
