/**
 * Play and replay-view drivers
 *
 * `Session` owns one physics world, one object manager and one recording
 * replay, and runs the fixed tick in a set order. `ReplayPlayback` owns
 * its own disabled world and feeds recorded events to a fresh manager.
 * Frame pacing stays with the caller.
 */
use std::path::Path;

use rapier3d::na::Vector3;
use spherefall_common::ObjectId;
use thiserror::Error;

use crate::config::CoreConfig;
use crate::constants::REPLAY_VERSION;
use crate::level::{Level, LevelError};
use crate::object_manager::ObjectManager;
use crate::objects::{Object, ObjectError, ObjectType, PlayerInput};
use crate::physics::PhysicsWorld;
use crate::replay::{CameraPacket, EventType, Replay, ReplayError, ReplayEvent};
use crate::services::{SceneSync, ScriptHost};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("no level loaded")]
    NoLevel,
}

pub struct Session {
    config: CoreConfig,
    world: PhysicsWorld,
    objects: ObjectManager,
    replay: Replay,
    level: Option<Level>,
    player: Option<ObjectId>,
    /// Seconds since the level started
    timer: f32,
}

impl Session {
    pub fn new(config: CoreConfig) -> Self {
        let mut world = PhysicsWorld::new(&config);
        world.set_enabled(true);
        Self {
            replay: Replay::from_config(&config),
            world,
            objects: ObjectManager::new(),
            level: None,
            player: None,
            timer: 0.0,
            config,
        }
    }

    /// Replace whatever is running with `level`: fresh world, fresh objects, fresh recording
    pub fn load_level(&mut self, level: Level, scene: &mut dyn SceneSync) -> Result<(), SessionError> {
        self.replay.stop_recording();
        self.objects.clear_objects(&mut self.world, scene);
        self.world.reset();
        self.timer = 0.0;
        self.player = None;

        self.replay.start_recording(&level.name, level.version)?;
        level.spawn_objects(&mut self.objects, &mut self.world, scene, &mut self.replay)?;
        level.spawn_constraints(&mut self.objects, &mut self.world, scene)?;

        self.player = self.objects.get_object_by_type(ObjectType::Player).map(Object::id);
        if self.player.is_none() {
            log::warn!("Level {} has no player object", level.name);
        }
        log::info!("Level {} started with {} objects", level.name, self.objects.len());
        self.level = Some(level);
        Ok(())
    }

    /// Start the current level over
    pub fn restart(&mut self, scene: &mut dyn SceneSync) -> Result<(), SessionError> {
        let level = self.level.take().ok_or(SessionError::NoLevel)?;
        self.load_level(level, scene)
    }

    /// Run one fixed step
    pub fn tick(
        &mut self,
        input: &PlayerInput,
        scripts: &mut dyn ScriptHost,
        scene: &mut dyn SceneSync,
    ) -> Result<(), SessionError> {
        let dt = self.config.timestep;
        self.replay.update(dt);
        self.timer += dt;
        self.objects.begin_frame();

        if let Some(player) = self.player.and_then(|id| self.objects.get_object_by_id_mut(id)) {
            player.apply_input(input, dt, &mut self.world);
        }
        if self.replay.needs_packet() {
            self.replay.record_input(input)?;
        }

        let notifications = self.world.update(dt);
        self.objects.dispatch_collisions(&notifications, scripts);
        self.objects.sync_from_physics(&self.world, scene);
        self.objects.update(dt, &mut self.world, scene, scripts, &mut self.replay)?;
        self.objects.end_frame(&mut self.replay, scripts)?;
        Ok(())
    }

    pub fn record_camera(&mut self, position: Vector3<f32>, target: Vector3<f32>) -> Result<(), SessionError> {
        if self.replay.needs_packet() {
            self.replay.record_camera(&CameraPacket { position, target })?;
        }
        Ok(())
    }

    /// Clip a camera ray against the level. Returns true when `end` was pulled in.
    pub fn clip_camera(&mut self, start: &Vector3<f32>, end: &mut Vector3<f32>) -> bool {
        self.world.raycast_world(start, end)
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut ObjectManager {
        &mut self.objects
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    pub fn replay_mut(&mut self) -> &mut Replay {
        &mut self.replay
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    pub fn player(&self) -> Option<&Object> {
        self.player.and_then(|id| self.objects.get_object_by_id(id))
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }
}

/// What one playback update surfaced for the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackFrame {
    /// Latest recorded camera pose, if one was due
    pub camera: Option<CameraPacket>,
    pub inputs: Vec<PlayerInput>,
    pub events: usize,
}

pub struct ReplayPlayback {
    world: PhysicsWorld,
    objects: ObjectManager,
    replay: Replay,
    level: Level,
    timer: f32,
    next: Option<ReplayEvent>,
}

impl ReplayPlayback {
    /// Open a saved replay. `load_level` receives the parsed header and returns the level it names.
    pub fn open<F>(config: &CoreConfig, path: impl AsRef<Path>, load_level: F) -> Result<Self, SessionError>
    where
        F: FnOnce(&Replay) -> Result<Level, LevelError>,
    {
        let mut replay = Replay::from_config(config);
        replay.load_replay(path, false)?;
        if replay.replay_version() != REPLAY_VERSION {
            return Err(ReplayError::VersionMismatch { found: replay.replay_version(), expected: REPLAY_VERSION }.into());
        }
        replay.start_replay()?;
        let next = replay.read_event()?;
        let level = load_level(&replay)?;

        let mut world = PhysicsWorld::new(config);
        world.set_enabled(false);
        Ok(Self { world, objects: ObjectManager::new(), replay, level, timer: 0.0, next })
    }

    /// Apply every event that is due, then advance object timers
    pub fn update(
        &mut self,
        dt: f32,
        scripts: &mut dyn ScriptHost,
        scene: &mut dyn SceneSync,
    ) -> Result<PlaybackFrame, SessionError> {
        self.timer += dt;
        let mut frame = PlaybackFrame::default();
        while let Some(event) = self.next {
            if self.timer < event.timestamp {
                break;
            }
            self.apply(event.kind, scene, &mut frame)?;
            frame.events += 1;
            self.next = self.replay.read_event()?;
        }
        self.objects.update_replay(dt, scripts);
        Ok(frame)
    }

    fn apply(&mut self, kind: EventType, scene: &mut dyn SceneSync, frame: &mut PlaybackFrame) -> Result<(), SessionError> {
        match kind {
            EventType::Movement => {
                self.objects.update_from_replay(&mut self.replay, scene)?;
            }
            EventType::Create => {
                let packet = self.replay.read_create()?;
                if let Some(spawn) = self.level.spawn_from_packet(&packet) {
                    self.objects.create_object_with_id(&spawn, packet.object, &mut self.world, scene)?;
                }
            }
            EventType::Delete => {
                let id = self.replay.read_delete()?;
                self.objects.delete_object_by_id(id, &mut self.world, scene);
            }
            EventType::Camera => frame.camera = Some(self.replay.read_camera()?),
            EventType::OrbDeactivate => {
                let packet = self.replay.read_orb_deactivate()?;
                if let Some(orb) = self.objects.get_object_by_id_mut(packet.id) {
                    orb.start_deactivation(None, packet.length);
                }
            }
            EventType::Input => frame.inputs.push(self.replay.read_input()?),
        }
        Ok(())
    }

    /// True once every recorded event has been applied
    pub fn is_finished(&self) -> bool {
        self.next.is_none() && self.replay.replay_stopped()
    }

    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }
}
