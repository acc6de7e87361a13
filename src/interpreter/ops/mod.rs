//! Operator evaluation, split by operator family
//!
//! Each submodule adds `pub(crate)` methods to the [`Interpreter`](super::engine::Interpreter).

pub mod access;
pub mod assign;
pub mod binary;
pub mod compare;
pub mod unary;
