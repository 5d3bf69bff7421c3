use rapier3d::na::{Unit, UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use spherefall_common::collision;
use spherefall_common::shape::{ColliderShape, ShapeError};

use crate::physics::contact_tracker::SurfaceMaterial;
use crate::physics::{BodyBinding, PhysicsWorld, UserData};

/// Everything the world needs to build one object's body and collider
#[derive(Debug, Clone)]
pub struct BodySpec {
    pub shape: ColliderShape,
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub linear_velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
    /// Zero mass makes a static collider
    pub mass: f32,
    pub material: SurfaceMaterial,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub sleep: bool,
    pub sensor: bool,
    pub group: u32,
    pub mask: u32,
    pub user_data: UserData,
}

/// Create the body and collider for `spec`. A disabled world hands back a detached binding.
pub fn spawn_body(world: &mut PhysicsWorld, spec: &BodySpec) -> Result<BodyBinding, ShapeError> {
    if !world.is_enabled() {
        return Ok(BodyBinding::Detached);
    }

    let groups = collision::interaction_groups(spec.group, spec.mask);
    let packed = spec.user_data.pack();
    let collider = spec
        .shape
        .to_rapier(spec.sensor, groups)?
        .friction(spec.material.friction)
        .restitution(spec.material.restitution)
        .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
        .user_data(packed);
    let pose = Isometry::from_parts(spec.position.into(), spec.rotation);

    let binding = if spec.mass > 0.0 && !spec.sensor && spec.shape.supports_dynamics() {
        let body = RigidBodyBuilder::dynamic()
            .position(pose)
            .linvel(spec.linear_velocity)
            .angvel(spec.angular_velocity)
            .linear_damping(spec.linear_damping)
            .angular_damping(spec.angular_damping)
            .sleeping(spec.sleep)
            .user_data(packed)
            .build();
        let body = world.bodies.insert(body);
        let collider = world.colliders.insert_with_parent(collider.mass(spec.mass).build(), body, &mut world.bodies);
        BodyBinding::Body { body, collider }
    } else {
        let collider = world.colliders.insert(collider.position(pose).build());
        BodyBinding::Collider(collider)
    };

    if let Some(collider) = binding.collider() {
        world.hooks.register(collider, spec.material);
    }
    world.mark_query_dirty();
    log::debug!("Physics body created: owner={}, binding={:?}", spec.user_data.object_id, binding);
    Ok(binding)
}

/// Hinge `main` to `other`, or to a fixed anchor body when there is no second endpoint.
/// `anchor` and `axis` are in world space.
pub fn create_hinge(
    world: &mut PhysicsWorld,
    main: RigidBodyHandle,
    other: Option<RigidBodyHandle>,
    anchor: Vector3<f32>,
    axis: Vector3<f32>,
) -> Option<BodyBinding> {
    let axis = Unit::try_new(axis, 1.0e-6)?;
    let anchor_point = Point::from(anchor);
    let main_pose = *world.bodies.get(main)?.position();

    let (other_handle, owned_anchor) = match other {
        Some(handle) => (handle, None),
        None => {
            let fixed = world.bodies.insert(RigidBodyBuilder::fixed().translation(anchor).build());
            (fixed, Some(fixed))
        }
    };
    let Some(other_pose) = world.bodies.get(other_handle).map(|b| *b.position()) else {
        return None;
    };

    let local_axis = Unit::new_normalize(main_pose.inverse_transform_vector(&axis));
    let joint = RevoluteJointBuilder::new(local_axis)
        .local_anchor1(main_pose.inverse_transform_point(&anchor_point))
        .local_anchor2(other_pose.inverse_transform_point(&anchor_point));
    let joint = world.impulse_joints.insert(main, other_handle, joint, true);
    log::debug!("Hinge joint created: {:?}", joint);
    Some(BodyBinding::Joint { joint, anchor: owned_anchor })
}

/// Remove everything a binding owns from the world
pub fn release(world: &mut PhysicsWorld, binding: BodyBinding) {
    match binding {
        BodyBinding::Detached => {}
        BodyBinding::Body { body, collider } => {
            world.hooks.forget(collider);
            // Safely remove the body and attached colliders
            world.bodies.remove(
                body,
                &mut world.islands,
                &mut world.colliders,
                &mut world.impulse_joints,
                &mut world.multibody_joints,
                true,
            );
        }
        BodyBinding::Collider(collider) => {
            world.hooks.forget(collider);
            world.colliders.remove(collider, &mut world.islands, &mut world.bodies, true);
        }
        BodyBinding::Joint { joint, anchor } => {
            world.impulse_joints.remove(joint, true);
            if let Some(anchor) = anchor {
                world.bodies.remove(
                    anchor,
                    &mut world.islands,
                    &mut world.colliders,
                    &mut world.impulse_joints,
                    &mut world.multibody_joints,
                    true,
                );
            }
        }
    }
    world.mark_query_dirty();
}
