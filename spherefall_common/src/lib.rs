//! Leaf types shared by the simulation core: identifiers, collision filter bits and collider shapes.

pub mod types;
pub mod shape;
pub mod collision;

pub use types::{ObjectId, TemplateId};
