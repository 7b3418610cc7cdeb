//! Entity layer modules.
//!
//! This module groups the entity itself and the attribute table its typed
//! accessors are derived from.

pub mod attributes;
pub mod entity;

pub use attributes::{Attribute, EntityRef};
pub use entity::{Entity, EntityKind};
