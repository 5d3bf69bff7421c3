//! Collaborators the core calls but does not implement: level scripting and the render/audio scene.

use rapier3d::na::{UnitQuaternion, Vector3};
use spherefall_common::ObjectId;

use crate::objects::Template;

/// Which edge of a zone touch a handler is told about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneEvent {
    Enter,
    Exit,
}

impl ZoneEvent {
    /// Numeric code passed to script handlers
    pub const fn code(self) -> i32 {
        match self {
            ZoneEvent::Enter => 0,
            ZoneEvent::Exit => 1,
        }
    }
}

/// Level scripting. Handler names come from templates; the core never interprets them.
pub trait ScriptHost {
    fn call_collision_handler(&mut self, name: &str, object: ObjectId, other: ObjectId);

    /// Returning true disables the zone
    fn call_zone_handler(&mut self, name: &str, event: ZoneEvent, zone: ObjectId, other: ObjectId) -> bool;

    fn call_function(&mut self, name: &str);
}

/// Script host that ignores every call
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScripts;

impl ScriptHost for NullScripts {
    fn call_collision_handler(&mut self, _name: &str, _object: ObjectId, _other: ObjectId) {}

    fn call_zone_handler(&mut self, _name: &str, _event: ZoneEvent, _zone: ObjectId, _other: ObjectId) -> bool {
        false
    }

    fn call_function(&mut self, _name: &str) {}
}

/// Render and audio hooks. The core pushes state into them and never reads back.
pub trait SceneSync {
    fn attach_node(&mut self, _id: ObjectId, _template: &Template) {}

    fn sync_object(&mut self, _id: ObjectId, _position: &Vector3<f32>, _rotation: &UnitQuaternion<f32>) {}

    /// Rolling sound position and pitch for the player
    fn sync_audio(&mut self, _id: ObjectId, _position: &Vector3<f32>, _pitch: f32) {}

    fn remove_node(&mut self, _id: ObjectId) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullScene;

impl SceneSync for NullScene {}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Script host that remembers every call
    #[derive(Debug, Default)]
    pub struct RecordingScripts {
        pub collisions: Vec<(String, ObjectId, ObjectId)>,
        pub zone_events: Vec<(ZoneEvent, ObjectId, ObjectId)>,
        pub functions: Vec<String>,
        pub disable_on_enter: bool,
    }

    impl ScriptHost for RecordingScripts {
        fn call_collision_handler(&mut self, name: &str, object: ObjectId, other: ObjectId) {
            self.collisions.push((name.to_string(), object, other));
        }

        fn call_zone_handler(&mut self, _name: &str, event: ZoneEvent, zone: ObjectId, other: ObjectId) -> bool {
            self.zone_events.push((event, zone, other));
            self.disable_on_enter && event == ZoneEvent::Enter
        }

        fn call_function(&mut self, name: &str) {
            self.functions.push(name.to_string());
        }
    }

    #[derive(Debug, Default)]
    pub struct RecordingScene {
        pub attached: Vec<ObjectId>,
        pub synced: Vec<(ObjectId, Vector3<f32>)>,
        pub removed: Vec<ObjectId>,
    }

    impl SceneSync for RecordingScene {
        fn attach_node(&mut self, id: ObjectId, _template: &Template) {
            self.attached.push(id);
        }

        fn sync_object(&mut self, id: ObjectId, position: &Vector3<f32>, _rotation: &UnitQuaternion<f32>) {
            self.synced.push((id, *position));
        }

        fn remove_node(&mut self, id: ObjectId) {
            self.removed.push(id);
        }
    }
}
