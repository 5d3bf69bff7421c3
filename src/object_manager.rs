use rapier3d::na::Vector3;
use spherefall_common::ObjectId;

use crate::objects::{
    ConstraintSpawn, NodeBinding, Object, ObjectError, ObjectSpawn, ObjectType, degrees_from_quaternion,
};
use crate::physics::{CollisionNotification, PhysicsWorld};
use crate::replay::{CreatePacket, MovementRecord, OrbDeactivatePacket, Placement, Replay, ReplayError};
use crate::services::{SceneSync, ScriptHost};

/// Owns every live object of a level, ordered by id
#[derive(Debug, Default)]
pub struct ObjectManager {
    objects: Vec<Object>,
    next_id: u16,
}

impl ObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `object` the next id and take ownership of it
    pub fn add_object(&mut self, object: Object, world: &mut PhysicsWorld, scene: &mut dyn SceneSync) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.insert(object, id, world, scene)
    }

    fn insert(&mut self, mut object: Object, id: ObjectId, world: &mut PhysicsWorld, scene: &mut dyn SceneSync) -> ObjectId {
        object.assign_id(id, world);
        if object.template().has_render_node() {
            scene.attach_node(id, object.template());
            object.node = NodeBinding::Attached;
        }
        log::debug!("Object {} '{}' added as {:?}", id, object.name(), object.kind());
        self.next_id = self.next_id.max(id.next().0);
        self.objects.push(object);
        id
    }

    /// Build and add the object a spawn describes. Kinds without a constructor yield `None`.
    /// While recording, templates with an id also get a CREATE event.
    pub fn create_object(
        &mut self,
        spawn: &ObjectSpawn,
        world: &mut PhysicsWorld,
        scene: &mut dyn SceneSync,
        replay: &mut Replay,
    ) -> Result<Option<ObjectId>, ObjectError> {
        if !spawn.template.kind.is_spawnable() {
            return Ok(None);
        }
        let object = Object::new(spawn, world)?;
        let id = self.add_object(object, world, scene);

        if let Some(template) = spawn.template.id.filter(|_| replay.needs_packet()) {
            let placement = match spawn.template.kind {
                ObjectType::Plane => Placement::Plane(spawn.plane),
                _ => Placement::Position(spawn.position),
            };
            let rotation = spawn.quaternion.as_ref().map(degrees_from_quaternion).unwrap_or(spawn.rotation);
            replay.record_create(&CreatePacket { template, object: id, placement, rotation })?;
        }
        Ok(Some(id))
    }

    /// Playback path: build the object under the id the recording gave it
    pub fn create_object_with_id(
        &mut self,
        spawn: &ObjectSpawn,
        id: ObjectId,
        world: &mut PhysicsWorld,
        scene: &mut dyn SceneSync,
    ) -> Result<Option<ObjectId>, ObjectError> {
        if !spawn.template.kind.is_spawnable() {
            return Ok(None);
        }
        let object = Object::new(spawn, world)?;
        Ok(Some(self.insert(object, id, world, scene)))
    }

    /// Join the named objects. A missing `other` pins `main` to the world.
    pub fn create_constraint(
        &mut self,
        spawn: &ConstraintSpawn,
        world: &mut PhysicsWorld,
        scene: &mut dyn SceneSync,
    ) -> Result<ObjectId, ObjectError> {
        let main = self.get_object_by_name(&spawn.main).ok_or_else(|| ObjectError::MissingEndpoint {
            constraint: spawn.name.clone(),
            object: spawn.main.clone(),
        })?;
        let other = spawn.other.as_deref().and_then(|name| {
            let found = self.get_object_by_name(name);
            if found.is_none() {
                log::warn!("Constraint '{}' has no object '{}', pinning to the world", spawn.name, name);
            }
            found
        });
        let constraint = Object::new_constraint(spawn, main, other, world)?;
        Ok(self.add_object(constraint, world, scene))
    }

    /// Destroy everything, constraints before the bodies they hold, and restart ids at 0
    pub fn clear_objects(&mut self, world: &mut PhysicsWorld, scene: &mut dyn SceneSync) {
        let (constraints, others): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.objects).into_iter().partition(|o| o.kind().is_constraint());
        for object in constraints.into_iter().chain(others) {
            object.destroy(world, scene);
        }
        self.next_id = 0;
    }

    /// Flag an object for removal at the next `update`
    pub fn delete_object(&mut self, id: ObjectId) -> bool {
        match self.get_object_by_id_mut(id) {
            Some(object) => {
                object.set_deleted();
                true
            }
            None => false,
        }
    }

    /// Remove an object right away, as a replayed DELETE does
    pub fn delete_object_by_id(&mut self, id: ObjectId, world: &mut PhysicsWorld, scene: &mut dyn SceneSync) -> bool {
        let Some(index) = self.objects.iter().position(|o| o.id() == id) else {
            return false;
        };
        self.objects.remove(index).destroy(world, scene);
        true
    }

    pub fn begin_frame(&mut self) {
        for object in &mut self.objects {
            object.begin_frame();
        }
    }

    /// Hand both sides of every notification to their objects, deleted ones included
    pub fn dispatch_collisions(&mut self, notifications: &[CollisionNotification], scripts: &mut dyn ScriptHost) {
        for notification in notifications {
            for (id, other, other_is_zone, sign) in notification.sides() {
                if let Some(object) = self.get_object_by_id_mut(id) {
                    object.handle_collision(other, other_is_zone, &notification.normal, sign, scripts);
                }
            }
        }
    }

    pub fn sync_from_physics(&mut self, world: &PhysicsWorld, scene: &mut dyn SceneSync) {
        for object in &mut self.objects {
            if object.sync_from_physics(world) && object.has_node() {
                scene.sync_object(object.id(), &object.position(), &object.rotation());
            }
        }
    }

    /// Update every object. Objects deleted before or during their update are recorded, released and erased.
    pub fn update(
        &mut self,
        dt: f32,
        world: &mut PhysicsWorld,
        scene: &mut dyn SceneSync,
        scripts: &mut dyn ScriptHost,
        replay: &mut Replay,
    ) -> Result<(), ReplayError> {
        let mut result = Ok(());
        let mut index = 0;
        while index < self.objects.len() {
            self.objects[index].update(dt, world, scene, scripts);
            if !self.objects[index].is_deleted() {
                index += 1;
                continue;
            }

            let object = self.objects.remove(index);
            if replay.needs_packet() {
                if let Err(e) = replay.record_delete(object.id()) {
                    log::warn!("Could not record deletion of {}: {}", object.id(), e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
            log::debug!("Object {} '{}' erased", object.id(), object.name());
            object.destroy(world, scene);
        }
        result
    }

    /// Finish the frame and, while recording, write one MOVEMENT event for the objects that moved.
    /// Returns how many objects moved.
    pub fn end_frame(&mut self, replay: &mut Replay, scripts: &mut dyn ScriptHost) -> Result<usize, ReplayError> {
        let mut records = Vec::new();
        for object in &mut self.objects {
            object.end_frame(scripts);
            if object.needs_replay_packet() {
                records.push(MovementRecord {
                    id: object.id(),
                    position: object.position(),
                    rotation: object.euler_rotation(),
                });
            }
        }

        if !records.is_empty() && replay.needs_packet() {
            replay.record_movement(&records)?;
            for object in self.objects.iter_mut().filter(|o| o.needs_replay_packet()) {
                object.clear_replay_packet();
            }
        }
        Ok(records.len())
    }

    /// Advance timers while viewing a replay
    pub fn update_replay(&mut self, dt: f32, scripts: &mut dyn ScriptHost) {
        for object in &mut self.objects {
            object.update_replay(dt, scripts);
        }
    }

    /// Read one MOVEMENT payload and place each listed object. Unknown ids are skipped.
    pub fn update_from_replay(&mut self, replay: &mut Replay, scene: &mut dyn SceneSync) -> Result<usize, ReplayError> {
        let mut applied = 0;
        for record in replay.read_movement()? {
            let Some(object) = self.objects.iter_mut().find(|o| o.id() == record.id) else {
                continue;
            };
            object.set_transform_from_replay(record.position, &record.rotation);
            if object.has_node() {
                scene.sync_object(object.id(), &object.position(), &object.rotation());
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Start an orb's deactivation, recording it when a replay is running
    pub fn start_orb_deactivation(
        &mut self,
        id: ObjectId,
        callback: Option<String>,
        length: f32,
        replay: &mut Replay,
    ) -> Result<bool, ReplayError> {
        let started = self.get_object_by_id_mut(id).is_some_and(|o| o.start_deactivation(callback, length));
        if started && replay.needs_packet() {
            replay.record_orb_deactivate(&OrbDeactivatePacket { id, length })?;
        }
        Ok(started)
    }

    pub fn get_object_by_id(&self, id: ObjectId) -> Option<&Object> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn get_object_by_id_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<&Object> {
        self.objects.iter().find(|o| o.name() == name)
    }

    pub fn get_object_by_name_mut(&mut self, name: &str) -> Option<&mut Object> {
        self.objects.iter_mut().find(|o| o.name() == name)
    }

    /// First object of a kind
    pub fn get_object_by_type(&self, kind: ObjectType) -> Option<&Object> {
        self.objects.iter().find(|o| o.kind() == kind)
    }

    pub fn get_object_by_type_mut(&mut self, kind: ObjectType) -> Option<&mut Object> {
        self.objects.iter_mut().find(|o| o.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Position of an object, for scripts and the camera
    pub fn position_of(&self, id: ObjectId) -> Option<Vector3<f32>> {
        self.get_object_by_id(id).map(Object::position)
    }
}
