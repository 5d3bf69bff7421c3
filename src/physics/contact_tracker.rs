use std::collections::HashMap;

use rapier3d::na::Vector3;
use rapier3d::prelude::*;
use spherefall_common::ObjectId;

use crate::physics::PhysicsWorld;
use crate::physics::user_data::UserData;

/// Surface properties a template gives its collider
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceMaterial {
    pub friction: f32,
    pub restitution: f32,
    pub rolling_friction: f32,
    pub erp: f32,
    pub cfm: f32,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self { friction: 1.0, restitution: 0.0, rolling_friction: 0.0, erp: 0.2, cfm: 0.0 }
    }
}

/// Response used for one contact pair, built fresh every step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceResponse {
    pub friction: f32,
    pub restitution: f32,
    pub rolling_friction: f32,
    pub erp: f32,
    pub cfm: f32,
}

impl SurfaceResponse {
    /// Weaker friction, stronger restitution and rolling friction, softest constraint
    pub fn combine(a: &SurfaceMaterial, b: &SurfaceMaterial) -> Self {
        Self {
            friction: a.friction.min(b.friction),
            restitution: a.restitution.max(b.restitution),
            rolling_friction: a.rolling_friction.max(b.rolling_friction),
            erp: a.erp.min(b.erp),
            cfm: a.cfm.max(b.cfm),
        }
    }
}

/// Physics hooks that rewrite solver contacts with the combined pair response
#[derive(Default)]
pub struct MaterialHooks {
    materials: HashMap<ColliderHandle, SurfaceMaterial>,
}

impl MaterialHooks {
    pub fn register(&mut self, collider: ColliderHandle, material: SurfaceMaterial) {
        self.materials.insert(collider, material);
    }

    pub fn forget(&mut self, collider: ColliderHandle) {
        self.materials.remove(&collider);
    }

    pub fn material(&self, collider: ColliderHandle) -> SurfaceMaterial {
        self.materials.get(&collider).copied().unwrap_or_default()
    }

    pub fn response(&self, c1: ColliderHandle, c2: ColliderHandle) -> SurfaceResponse {
        SurfaceResponse::combine(&self.material(c1), &self.material(c2))
    }
}

impl PhysicsHooks for MaterialHooks {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let response = self.response(context.collider1, context.collider2);
        for contact in context.solver_contacts.iter_mut() {
            contact.friction = response.friction;
            contact.restitution = response.restitution;
        }
    }
}

/// One collision reported by a step. `normal` points towards `first`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionNotification {
    pub first: ObjectId,
    pub second: ObjectId,
    pub first_is_zone: bool,
    pub second_is_zone: bool,
    pub normal: Vector3<f32>,
    pub response: SurfaceResponse,
}

impl CollisionNotification {
    /// Each side sees the other as "other" with its own normal sign
    pub fn sides(&self) -> [(ObjectId, ObjectId, bool, f32); 2] {
        [
            (self.first, self.second, self.second_is_zone, 1.0),
            (self.second, self.first, self.first_is_zone, -1.0),
        ]
    }
}

fn owner(world: &PhysicsWorld, handle: ColliderHandle) -> Option<UserData> {
    let data = UserData::unpack(world.colliders.get(handle)?.user_data);
    data.is_tagged().then_some(data)
}

/// Gather every touching pair from the narrow phase, solid contacts first, then zone overlaps
pub(crate) fn collect_notifications(world: &PhysicsWorld) -> Vec<CollisionNotification> {
    let mut notifications = Vec::new();

    for pair in world.narrow_phase.contact_pairs() {
        if !pair.has_any_active_contact {
            continue;
        }
        let (Some(a), Some(b)) = (owner(world, pair.collider1), owner(world, pair.collider2)) else {
            continue;
        };
        let Some(manifold) = pair.manifolds.iter().find(|m| !m.points.is_empty()) else {
            continue;
        };
        // Rapier's manifold normal points from collider1 to collider2
        notifications.push(CollisionNotification {
            first: a.object_id,
            second: b.object_id,
            first_is_zone: a.zone,
            second_is_zone: b.zone,
            normal: -manifold.data.normal,
            response: world.hooks.response(pair.collider1, pair.collider2),
        });
    }

    for (h1, h2, intersecting) in world.narrow_phase.intersection_pairs() {
        if !intersecting {
            continue;
        }
        let (Some(a), Some(b)) = (owner(world, h1), owner(world, h2)) else {
            continue;
        };
        notifications.push(CollisionNotification {
            first: a.object_id,
            second: b.object_id,
            first_is_zone: a.zone,
            second_is_zone: b.zone,
            normal: Vector3::zeros(),
            response: world.hooks.response(h1, h2),
        });
    }

    notifications
}
