/// Fixed simulation step in seconds
pub const PHYSICS_TIMESTEP: f32 = 1.0 / 100.0;

/// Default gravity along Y
pub const GRAVITY_Y: f32 = -9.81;

/// Default global error reduction parameter
pub const DEFAULT_ERP: f32 = 0.2;
/// Default global constraint force mixing
pub const DEFAULT_CFM: f32 = 0.0;

/// Replay format version written into every saved header
pub const REPLAY_VERSION: i32 = 2;

/// Platform tag stored in replay headers
pub const PLATFORM: u8 = 0;

/// Name of the scratch event stream inside the replay directory
pub const REPLAY_SCRATCH_FILE: &str = "replay.dat";
pub const REPLAY_EXTENSION: &str = "replay";

/// Longest string a header chunk may carry
pub const MAX_HEADER_STRING: u32 = 1024;

/// Seconds a jump request stays armed while waiting for ground contact
pub const JUMP_WINDOW: f32 = 0.2;
/// Upward impulse applied by one jump
pub const JUMP_POWER: f32 = 5.0;
/// Seconds after a jump before the next one may fire
pub const JUMP_COOLDOWN: f32 = 0.1;

/// Push to torque conversion factor for the player sphere
pub const PLAYER_TORQUE_FACTOR: f32 = 4.0;

/// Minimum signed normal.y that counts as standing on ground
pub const GROUND_NORMAL_THRESHOLD: f32 = 0.6;
/// Maximum |normal.y| that counts as touching a wall
pub const WALL_NORMAL_THRESHOLD: f32 = 0.7;
/// Seconds touching-ground survives without a fresh ground contact
pub const GROUND_GRACE: f32 = 1.5 * PHYSICS_TIMESTEP;

/// Frames a zone keeps a touch alive without a fresh contact
pub const ZONE_TOUCH_FRAMES: i32 = 2;

/// Default callback names
pub const PLAYER_COLLISION_CALLBACK: &str = "OnHitPlayer";
pub const ZONE_COLLISION_CALLBACK: &str = "OnHitZone";

/// Player audio pitch mapping
pub const AUDIO_MIN_SPEED: f32 = 3.0;
pub const AUDIO_MAX_SPEED: f32 = 120.0;

/// Highest texture slot a template may declare
pub const MAX_TEXTURES: usize = 4;
