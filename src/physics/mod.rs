use rapier3d::na::{UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use spherefall_common::collision;

use crate::config::CoreConfig;

pub mod contact_tracker;
pub mod physics_tick;
pub mod spawn;
pub mod user_data;

pub use contact_tracker::{CollisionNotification, MaterialHooks, SurfaceMaterial, SurfaceResponse};
pub use spawn::{BodySpec, create_hinge, release, spawn_body};
pub use user_data::UserData;

#[cfg(test)]
pub mod tests;

/// What physics state an object owns. Released exhaustively by [`release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyBinding {
    /// No physics state, e.g. while the world is disabled for replay viewing
    #[default]
    Detached,
    /// Dynamic rigid body with its single collider
    Body { body: RigidBodyHandle, collider: ColliderHandle },
    /// Static collider with no parent body
    Collider(ColliderHandle),
    /// Joint, plus the fixed anchor body it created when it had no second endpoint
    Joint { joint: ImpulseJointHandle, anchor: Option<RigidBodyHandle> },
}

impl BodyBinding {
    pub fn rigid_body(&self) -> Option<RigidBodyHandle> {
        match *self {
            BodyBinding::Body { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn collider(&self) -> Option<ColliderHandle> {
        match *self {
            BodyBinding::Body { collider, .. } | BodyBinding::Collider(collider) => Some(collider),
            _ => None,
        }
    }
}

/// Rigid-body world stepped at a fixed timestep
pub struct PhysicsWorld {
    pub pipeline: PhysicsPipeline,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub islands: IslandManager,
    pub broad_phase: BroadPhaseMultiSap,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
    /// Per-collider materials, combined per contact pair during the step
    pub hooks: MaterialHooks,
    /// Global soft-constraint parameters
    pub erp: f32,
    pub cfm: f32,
    enabled: bool,
    // Query pipeline lags behind spawns and removals until the next step
    query_dirty: bool,
}

impl PhysicsWorld {
    /// Allocate a fresh world. It starts disabled.
    pub fn new(config: &CoreConfig) -> Self {
        let [gx, gy, gz] = config.gravity;
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep;
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gx, gy, gz],
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            hooks: MaterialHooks::default(),
            erp: config.erp,
            cfm: config.cfm,
            enabled: false,
            query_dirty: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Tear the world down and build a new one, keeping gravity, timestep and the enabled flag
    pub fn reset(&mut self) {
        let dt = self.integration_parameters.dt;
        self.pipeline = PhysicsPipeline::new();
        self.integration_parameters = IntegrationParameters::default();
        self.integration_parameters.dt = dt;
        self.islands = IslandManager::new();
        self.broad_phase = BroadPhaseMultiSap::new();
        self.narrow_phase = NarrowPhase::new();
        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.ccd_solver = CCDSolver::new();
        self.query_pipeline = QueryPipeline::new();
        self.hooks = MaterialHooks::default();
        self.query_dirty = false;
        log::debug!("Physics world reset");
    }

    /// Cast a camera ray from `start` to `end`. On a hit `end` moves to the closest hit point.
    pub fn raycast_world(&mut self, start: &Vector3<f32>, end: &mut Vector3<f32>) -> bool {
        if !self.enabled {
            return false;
        }
        let delta = *end - *start;
        let length = delta.norm();
        if length <= f32::EPSILON {
            return false;
        }
        if self.query_dirty {
            self.query_pipeline.update(&self.colliders);
            self.query_dirty = false;
        }

        let ray = Ray::new(Point::from(*start), delta / length);
        let filter = QueryFilter::default()
            .groups(collision::camera_ray_groups())
            .exclude_sensors();
        match self.query_pipeline.cast_ray(&self.bodies, &self.colliders, &ray, length, true, filter) {
            Some((_, toi)) => {
                *end = ray.point_at(toi).coords;
                true
            }
            None => false,
        }
    }

    pub(crate) fn mark_query_dirty(&mut self) {
        self.query_dirty = true;
    }

    pub(crate) fn clear_query_dirty(&mut self) {
        self.query_dirty = false;
    }

    /// Current pose of a dynamic body
    pub fn body_pose(&self, binding: &BodyBinding) -> Option<(Vector3<f32>, UnitQuaternion<f32>)> {
        let body = self.bodies.get(binding.rigid_body()?)?;
        Some((*body.translation(), *body.rotation()))
    }

    pub fn body_velocities(&self, binding: &BodyBinding) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let body = self.bodies.get(binding.rigid_body()?)?;
        Some((*body.linvel(), *body.angvel()))
    }

    pub fn is_dynamic(&self, binding: &BodyBinding) -> bool {
        binding
            .rigid_body()
            .and_then(|h| self.bodies.get(h))
            .is_some_and(|b| b.is_dynamic())
    }

    /// Teleport a body or static collider
    pub fn set_pose(&mut self, binding: &BodyBinding, position: Vector3<f32>, rotation: UnitQuaternion<f32>) {
        match *binding {
            BodyBinding::Body { body, .. } => {
                if let Some(rb) = self.bodies.get_mut(body) {
                    rb.set_position(Isometry::from_parts(position.into(), rotation), true);
                }
            }
            BodyBinding::Collider(collider) => {
                if let Some(c) = self.colliders.get_mut(collider) {
                    c.set_position(Isometry::from_parts(position.into(), rotation));
                }
                self.query_dirty = true;
            }
            BodyBinding::Detached | BodyBinding::Joint { .. } => {}
        }
    }

    pub fn set_velocities(&mut self, binding: &BodyBinding, linear: Vector3<f32>, angular: Vector3<f32>) {
        if let Some(rb) = binding.rigid_body().and_then(|h| self.bodies.get_mut(h)) {
            rb.set_linvel(linear, true);
            rb.set_angvel(angular, true);
        }
    }

    /// Apply a torque for one step of length `dt`
    pub fn apply_torque(&mut self, binding: &BodyBinding, torque: Vector3<f32>, dt: f32) {
        if let Some(rb) = binding.rigid_body().and_then(|h| self.bodies.get_mut(h)) {
            rb.apply_torque_impulse(torque * dt, true);
        }
    }

    pub fn apply_impulse(&mut self, binding: &BodyBinding, impulse: Vector3<f32>) {
        if let Some(rb) = binding.rigid_body().and_then(|h| self.bodies.get_mut(h)) {
            rb.apply_impulse(impulse, true);
        }
    }

    /// Write the owning object into the collider and body user data
    pub fn tag_binding(&mut self, binding: &BodyBinding, data: UserData) {
        let packed = data.pack();
        if let Some(c) = binding.collider().and_then(|h| self.colliders.get_mut(h)) {
            c.user_data = packed;
        }
        if let Some(rb) = binding.rigid_body().and_then(|h| self.bodies.get_mut(h)) {
            rb.user_data = packed;
        }
    }
}
