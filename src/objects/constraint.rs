use std::sync::Arc;

use rapier3d::na::Vector3;
use spherefall_common::ObjectId;

use crate::objects::Template;

/// Request to join one or two named objects once they exist
#[derive(Debug, Clone)]
pub struct ConstraintSpawn {
    pub name: String,
    pub template: Arc<Template>,
    pub main: String,
    /// Absent pins `main` to the world
    pub other: Option<String>,
    /// World-space anchor, defaults to the main object's position
    pub anchor: Option<Vector3<f32>>,
}

/// The objects a live constraint joins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintState {
    pub main: ObjectId,
    pub other: Option<ObjectId>,
}
