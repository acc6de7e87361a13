//! Structural recognition of linked data structures
//!
//! Values are tagged by the shape of their attribute dictionaries, never by
//! class or attribute names:
//! - [`shape`]: attribute counts of a single object
//! - [`classify`]: the type tag reported in `var_types`
//! - [`render`]: canonical node arrays for linked lists and nodes
//! - [`json`]: JSON view of every other value

pub mod classify;
pub mod json;
pub mod render;
pub mod shape;

pub use classify::classify;
pub use json::to_json;
pub use render::{render, settle_tag, RenderError};
pub use shape::{analyze, attrs_of, Shape};
