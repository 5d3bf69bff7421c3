/**
 * Spherefall simulation core
 *
 * A rolling-sphere platformer core: a fixed-step rigid-body world, the
 * object lifecycle that sits on top of it, and a binary replay log that
 * records a session and plays it back without running physics.
 *
 * Rendering, audio and scripting stay outside the crate and are reached
 * through the traits in `services`.
 */

pub mod constants;
pub mod config;
pub mod physics;
pub mod objects;
pub mod object_manager;
pub mod replay;
pub mod level;
pub mod services;
pub mod session;

pub use spherefall_common::{ObjectId, TemplateId};

// Re-export the types a driver needs for one session
pub use config::CoreConfig;
pub use level::{Level, LevelError};
pub use object_manager::ObjectManager;
pub use objects::{Object, ObjectError, ObjectType, PlayerInput};
pub use physics::PhysicsWorld;
pub use replay::{HeaderMode, Replay, ReplayError};
pub use services::{NullScene, NullScripts, SceneSync, ScriptHost, ZoneEvent};
pub use session::{ReplayPlayback, Session, SessionError};
