/**
 * Live simulation objects
 *
 * Every object shares one lifecycle (begin frame, update, end frame,
 * collision handling) and carries a `Behavior` with the state only its
 * kind needs. Physics and render ownership are explicit enums so
 * destruction releases exactly what was created.
 */
use std::path::PathBuf;
use std::sync::Arc;

use rapier3d::na::{UnitQuaternion, Vector3};
use spherefall_common::ObjectId;
use spherefall_common::shape::ShapeError;
use thiserror::Error;

use crate::constants::{
    GROUND_GRACE, GROUND_NORMAL_THRESHOLD, PLAYER_COLLISION_CALLBACK, WALL_NORMAL_THRESHOLD, ZONE_COLLISION_CALLBACK,
};
use crate::physics::{self, BodyBinding, BodySpec, PhysicsWorld, UserData};
use crate::replay::ReplayError;
use crate::services::{SceneSync, ScriptHost, ZoneEvent};

pub mod collision_mesh;
pub mod constraint;
pub mod orb;
pub mod player;
pub mod template;
pub mod terrain;
pub mod zone;

pub use constraint::{ConstraintSpawn, ConstraintState};
pub use orb::OrbState;
pub use player::{PlayerInput, PlayerState};
pub use template::{ObjectSpawn, Template};
pub use zone::ZoneState;

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("shape error: {0}")] Shape(#[from] ShapeError),
    #[error("template {0} needs a file")] MissingFile(String),
    #[error("collision mesh {path}: {source}")]
    CollisionMesh { path: PathBuf, source: std::io::Error },
    #[error("heightmap {path}: {source}")]
    Heightmap { path: PathBuf, source: image::ImageError },
    #[error("{0:?} objects cannot be spawned directly")] NotSpawnable(ObjectType),
    #[error("constraint {constraint} references missing object {object}")]
    MissingEndpoint { constraint: String, object: String },
    #[error("object {0} has no rigid body to attach")] MissingBody(String),
    #[error("replay write failed: {0}")] Replay(#[from] ReplayError),
}

/// Object kind. The discriminant doubles as the user data tag, so 0 stays reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectType {
    None = 0,
    Player,
    Orb,
    Collision,
    Sphere,
    Box,
    Cylinder,
    Terrain,
    Plane,
    Zone,
    ConstraintHinge,
}

impl ObjectType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Kind named by a level file's template element
    pub fn from_element(name: &str) -> Option<Self> {
        Some(match name {
            "player" => ObjectType::Player,
            "orb" => ObjectType::Orb,
            "collision" => ObjectType::Collision,
            "sphere" => ObjectType::Sphere,
            "box" => ObjectType::Box,
            "cylinder" => ObjectType::Cylinder,
            "terrain" => ObjectType::Terrain,
            "plane" => ObjectType::Plane,
            "zone" => ObjectType::Zone,
            "hinge" => ObjectType::ConstraintHinge,
            _ => return None,
        })
    }

    pub fn is_constraint(self) -> bool {
        matches!(self, ObjectType::ConstraintHinge)
    }

    /// Kinds built from an `ObjectSpawn`
    pub fn is_spawnable(self) -> bool {
        !matches!(self, ObjectType::None | ObjectType::ConstraintHinge)
    }
}

/// Whether the scene holds a render node for the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeBinding {
    #[default]
    Detached,
    Attached,
}

/// Kind-specific state
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Inert,
    Player(PlayerState),
    Orb(OrbState),
    Zone(ZoneState),
    Constraint(ConstraintState),
}

pub fn quaternion_from_degrees(euler: &Vector3<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::from_euler_angles(euler.x.to_radians(), euler.y.to_radians(), euler.z.to_radians())
}

pub fn degrees_from_quaternion(rotation: &UnitQuaternion<f32>) -> Vector3<f32> {
    let (roll, pitch, yaw) = rotation.euler_angles();
    Vector3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
}

#[derive(Debug)]
pub struct Object {
    id: ObjectId,
    name: String,
    template: Arc<Template>,
    kind: ObjectType,
    deleted: bool,
    timer: f32,
    lifetime: f32,
    position: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    last_position: Vector3<f32>,
    last_rotation: UnitQuaternion<f32>,
    linear_velocity: Vector3<f32>,
    angular_velocity: Vector3<f32>,
    needs_replay_packet: bool,
    touching_ground: bool,
    ground_timer: f32,
    touching_wall: bool,
    collision_callback: Option<String>,
    dynamic: bool,
    pub(crate) body: BodyBinding,
    pub(crate) node: NodeBinding,
    behavior: Behavior,
}

impl Object {
    fn base(name: String, template: Arc<Template>, behavior: Behavior) -> Self {
        let default_callback = match template.kind {
            ObjectType::Player => Some(PLAYER_COLLISION_CALLBACK.to_string()),
            ObjectType::Zone => Some(ZONE_COLLISION_CALLBACK.to_string()),
            _ => None,
        };
        Self {
            id: ObjectId::default(),
            name,
            kind: template.kind,
            deleted: false,
            timer: 0.0,
            lifetime: template.lifetime,
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            last_position: Vector3::zeros(),
            last_rotation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            needs_replay_packet: false,
            touching_ground: false,
            ground_timer: 0.0,
            touching_wall: false,
            collision_callback: template.collision_callback.clone().or(default_callback),
            dynamic: false,
            body: BodyBinding::Detached,
            node: NodeBinding::Detached,
            behavior,
            template,
        }
    }

    /// Build an object from a spawn. Physics state is only created while the world is enabled.
    pub fn new(spawn: &ObjectSpawn, world: &mut PhysicsWorld) -> Result<Self, ObjectError> {
        let template = Arc::clone(&spawn.template);
        let behavior = match template.kind {
            ObjectType::Player => Behavior::Player(PlayerState::default()),
            ObjectType::Orb => Behavior::Orb(OrbState::Normal),
            ObjectType::Zone => Behavior::Zone(ZoneState::new(template.active)),
            ObjectType::None | ObjectType::ConstraintHinge => return Err(ObjectError::NotSpawnable(template.kind)),
            _ => Behavior::Inert,
        };
        let mut object = Self::base(spawn.name.clone(), Arc::clone(&template), behavior);

        let (position, rotation) = if template.kind == ObjectType::Plane {
            (spawn.plane_origin(), UnitQuaternion::identity())
        } else {
            (spawn.position, spawn.initial_rotation())
        };
        object.position = position;
        object.rotation = rotation;
        object.last_position = position;
        object.last_rotation = rotation;
        object.linear_velocity = spawn.linear_velocity;
        object.angular_velocity = spawn.angular_velocity;

        if world.is_enabled() {
            let spec = BodySpec {
                shape: template.collider_shape(spawn)?,
                position,
                rotation,
                linear_velocity: spawn.linear_velocity,
                angular_velocity: spawn.angular_velocity,
                mass: template.mass,
                material: template.material(),
                linear_damping: template.linear_damping,
                angular_damping: template.angular_damping,
                sleep: template.sleep,
                sensor: template.kind == ObjectType::Zone,
                group: template.collision_group,
                mask: template.collision_mask,
                user_data: object.user_data(),
            };
            object.body = physics::spawn_body(world, &spec)?;
            object.dynamic = world.is_dynamic(&object.body);
        }
        Ok(object)
    }

    /// Build a hinge between two live objects. `other` may be absent to pin `main` in place.
    pub fn new_constraint(
        spawn: &ConstraintSpawn,
        main: &Object,
        other: Option<&Object>,
        world: &mut PhysicsWorld,
    ) -> Result<Self, ObjectError> {
        let state = ConstraintState { main: main.id, other: other.map(|o| o.id) };
        let mut object = Self::base(spawn.name.clone(), Arc::clone(&spawn.template), Behavior::Constraint(state));
        let anchor = spawn.anchor.unwrap_or(main.position);
        object.position = anchor;
        object.last_position = anchor;

        if world.is_enabled() {
            let main_body = main.body.rigid_body().ok_or_else(|| ObjectError::MissingBody(main.name.clone()))?;
            let other_body = match other {
                Some(o) => Some(o.body.rigid_body().ok_or_else(|| ObjectError::MissingBody(o.name.clone()))?),
                None => None,
            };
            object.body = physics::create_hinge(world, main_body, other_body, anchor, spawn.template.axis)
                .ok_or_else(|| ObjectError::MissingBody(main.name.clone()))?;
        }
        Ok(object)
    }

    fn user_data(&self) -> UserData {
        UserData { object_type: self.kind.tag(), zone: self.kind == ObjectType::Zone, object_id: self.id }
    }

    /// Give the object its manager-assigned id and stamp it on the physics state
    pub(crate) fn assign_id(&mut self, id: ObjectId, world: &mut PhysicsWorld) {
        self.id = id;
        world.tag_binding(&self.body, self.user_data());
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectType {
        self.kind
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn body(&self) -> &BodyBinding {
        &self.body
    }

    pub fn has_node(&self) -> bool {
        self.node == NodeBinding::Attached
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn set_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    /// Rotation as Euler degrees, the form replays store
    pub fn euler_rotation(&self) -> Vector3<f32> {
        degrees_from_quaternion(&self.rotation)
    }

    pub fn linear_velocity(&self) -> Vector3<f32> {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vector3<f32> {
        self.angular_velocity
    }

    pub fn is_touching_ground(&self) -> bool {
        self.touching_ground
    }

    pub fn is_touching_wall(&self) -> bool {
        self.touching_wall
    }

    pub fn needs_replay_packet(&self) -> bool {
        self.needs_replay_packet
    }

    pub fn clear_replay_packet(&mut self) {
        self.needs_replay_packet = false;
    }

    pub fn collision_callback(&self) -> Option<&str> {
        self.collision_callback.as_deref()
    }

    pub fn set_collision_callback(&mut self, name: Option<String>) {
        self.collision_callback = name;
    }

    pub fn begin_frame(&mut self) {
        self.last_position = self.position;
        self.last_rotation = self.rotation;
        self.touching_wall = false;
        if let Behavior::Zone(zone) = &mut self.behavior {
            zone.begin_frame();
        }
    }

    pub fn update(&mut self, dt: f32, world: &mut PhysicsWorld, scene: &mut dyn SceneSync, scripts: &mut dyn ScriptHost) {
        self.advance_timer(dt);
        if self.lifetime > 0.0 && self.timer > self.lifetime {
            self.deleted = true;
        }

        match &mut self.behavior {
            Behavior::Player(player) => {
                if player.update(dt, self.touching_ground) {
                    world.apply_impulse(&self.body, player::jump_impulse());
                }
                scene.sync_audio(self.id, &self.position, player::rolling_pitch(&self.linear_velocity, &self.angular_velocity));
            }
            Behavior::Orb(orb) => {
                if let Some(callback) = orb.update(dt) {
                    scripts.call_function(&callback);
                }
            }
            Behavior::Inert | Behavior::Zone(_) | Behavior::Constraint(_) => {}
        }

        if self.ground_timer > 0.0 {
            self.ground_timer -= dt;
            if self.ground_timer <= 0.0 {
                self.touching_ground = false;
            }
        }
    }

    /// Replay-view update: timers only, physics never runs
    pub fn update_replay(&mut self, dt: f32, scripts: &mut dyn ScriptHost) {
        self.advance_timer(dt);
        if let Behavior::Orb(orb) = &mut self.behavior {
            if let Some(callback) = orb.update(dt) {
                scripts.call_function(&callback);
            }
        }
    }

    fn advance_timer(&mut self, dt: f32) {
        self.timer += dt;
    }

    pub fn end_frame(&mut self, scripts: &mut dyn ScriptHost) {
        if self.has_node()
            && self.dynamic
            && !self.needs_replay_packet
            && (self.position != self.last_position || self.rotation != self.last_rotation)
        {
            self.needs_replay_packet = true;
        }

        if let Behavior::Zone(zone) = &mut self.behavior {
            for other in zone.expire() {
                if let Some(callback) = &self.collision_callback {
                    if scripts.call_zone_handler(callback, ZoneEvent::Exit, self.id, other) {
                        zone.set_active(false);
                    }
                }
            }
        }
    }

    /// React to touching `other`. `normal` points towards this object once multiplied by `sign`.
    pub fn handle_collision(
        &mut self,
        other: ObjectId,
        other_is_zone: bool,
        normal: &Vector3<f32>,
        sign: f32,
        scripts: &mut dyn ScriptHost,
    ) {
        if let Behavior::Zone(zone) = &mut self.behavior {
            if zone.touch(other) {
                if let Some(callback) = &self.collision_callback {
                    if scripts.call_zone_handler(callback, ZoneEvent::Enter, self.id, other) {
                        zone.set_active(false);
                    }
                }
            }
            return;
        }

        if !other_is_zone {
            let normal_y = normal.y * sign;
            if normal_y > GROUND_NORMAL_THRESHOLD {
                self.touching_ground = true;
                self.ground_timer = GROUND_GRACE;
            }
            if normal_y.abs() < WALL_NORMAL_THRESHOLD {
                self.touching_wall = true;
            }
        }

        if let Some(callback) = &self.collision_callback {
            scripts.call_collision_handler(callback, self.id, other);
        }
    }

    /// Copy the solver pose and velocities into the object
    pub fn sync_from_physics(&mut self, world: &PhysicsWorld) -> bool {
        let Some((position, rotation)) = world.body_pose(&self.body) else {
            return false;
        };
        self.position = position;
        self.rotation = rotation;
        if let Some((linear, angular)) = world.body_velocities(&self.body) {
            self.linear_velocity = linear;
            self.angular_velocity = angular;
        }
        true
    }

    /// Place the object where a replay says it was
    pub fn set_transform_from_replay(&mut self, position: Vector3<f32>, euler_degrees: &Vector3<f32>) {
        self.position = position;
        self.rotation = quaternion_from_degrees(euler_degrees);
    }

    /// Move the object and its body
    pub fn set_position(&mut self, world: &mut PhysicsWorld, position: Vector3<f32>) {
        self.position = position;
        world.set_pose(&self.body, position, self.rotation);
    }

    /// Zero both velocities
    pub fn stop(&mut self, world: &mut PhysicsWorld) {
        self.linear_velocity = Vector3::zeros();
        self.angular_velocity = Vector3::zeros();
        world.set_velocities(&self.body, Vector3::zeros(), Vector3::zeros());
    }

    /// Release the physics state and render node
    pub fn destroy(self, world: &mut PhysicsWorld, scene: &mut dyn SceneSync) {
        physics::release(world, self.body);
        match self.node {
            NodeBinding::Attached => scene.remove_node(self.id),
            NodeBinding::Detached => {}
        }
    }
}
