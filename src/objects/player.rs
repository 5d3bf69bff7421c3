use rapier3d::na::{UnitQuaternion, Vector3};

use crate::constants::{
    AUDIO_MAX_SPEED, AUDIO_MIN_SPEED, JUMP_COOLDOWN, JUMP_POWER, JUMP_WINDOW, PLAYER_TORQUE_FACTOR,
};
use crate::objects::{Behavior, Object};
use crate::physics::PhysicsWorld;

/// One sample of player controls
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerInput {
    /// Strafe, right positive
    pub push_x: f32,
    /// Forward positive
    pub push_z: f32,
    /// Camera yaw in degrees
    pub yaw: f32,
    pub pitch: f32,
    pub jumping: bool,
}

impl PlayerInput {
    /// Push direction, clamped to unit length
    pub fn push(&self) -> Vector3<f32> {
        let push = Vector3::new(self.push_x, 0.0, self.push_z);
        if push.norm() > 1.0 { push.normalize() } else { push }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Remaining seconds a jump request stays armed
    pub jump_timer: f32,
    pub jump_cooldown: f32,
    pub torque_factor: f32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self { jump_timer: 0.0, jump_cooldown: 0.0, torque_factor: PLAYER_TORQUE_FACTOR }
    }
}

impl PlayerState {
    pub fn request_jump(&mut self) {
        self.jump_timer = JUMP_WINDOW;
    }

    /// Advance jump timers. Returns true when a jump fires this frame.
    pub fn update(&mut self, dt: f32, touching_ground: bool) -> bool {
        if self.jump_cooldown > 0.0 {
            self.jump_cooldown -= dt;
        }

        if self.jump_timer > 0.0 {
            self.jump_timer = (self.jump_timer - dt).max(0.0);
            if touching_ground && self.jump_cooldown <= 0.0 {
                self.jump_timer = 0.0;
                self.jump_cooldown = JUMP_COOLDOWN;
                return true;
            }
        }
        false
    }

    /// Torque that rolls the sphere towards `push`, given relative to a camera looking along `yaw`
    pub fn push_torque(&self, push: &Vector3<f32>, yaw_degrees: f32) -> Option<Vector3<f32>> {
        if *push == Vector3::zeros() {
            return None;
        }
        let camera = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw_degrees.to_radians());
        let world_push = camera * push;
        Some(world_push.cross(&Vector3::new(0.0, -1.0, 0.0)) * self.torque_factor)
    }
}

pub(crate) fn jump_impulse() -> Vector3<f32> {
    Vector3::new(0.0, JUMP_POWER, 0.0)
}

/// Rolling sound pitch from the sphere's speed
pub(crate) fn rolling_pitch(linear: &Vector3<f32>, angular: &Vector3<f32>) -> f32 {
    let speed = (angular.norm() + linear.norm()).clamp(AUDIO_MIN_SPEED, AUDIO_MAX_SPEED);
    (speed - AUDIO_MIN_SPEED) / (AUDIO_MAX_SPEED / 2.0) + 0.9
}

impl Object {
    /// Arm a jump. Returns false for non-player objects.
    pub fn jump(&mut self) -> bool {
        match &mut self.behavior {
            Behavior::Player(player) => {
                player.request_jump();
                true
            }
            _ => false,
        }
    }

    /// Turn a camera-relative push into torque on the player body
    pub fn handle_push(&mut self, push: &Vector3<f32>, yaw_degrees: f32, dt: f32, world: &mut PhysicsWorld) {
        if let Behavior::Player(player) = &self.behavior {
            if let Some(torque) = player.push_torque(push, yaw_degrees) {
                world.apply_torque(&self.body, torque, dt);
            }
        }
    }

    /// Apply one input sample: push, then jump request
    pub fn apply_input(&mut self, input: &PlayerInput, dt: f32, world: &mut PhysicsWorld) {
        self.handle_push(&input.push(), input.yaw, dt, world);
        if input.jumping {
            self.jump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_waits_for_ground_inside_window() {
        let mut p = PlayerState::default();
        p.request_jump();
        assert!(!p.update(0.01, false));
        assert!(p.update(0.01, true));
        // Cooldown blocks an immediate second jump from the same contact
        p.request_jump();
        assert!(!p.update(0.01, true));
    }

    #[test]
    fn jump_request_expires() {
        let mut p = PlayerState::default();
        p.request_jump();
        let frames = (JUMP_WINDOW / 0.01).ceil() as usize + 1;
        for _ in 0..frames {
            assert!(!p.update(0.01, false));
        }
        assert!(!p.update(0.01, true));
    }

    #[test]
    fn forward_push_rolls_about_x() {
        let p = PlayerState::default();
        let torque = p.push_torque(&Vector3::new(0.0, 0.0, 1.0), 0.0).unwrap();
        assert!((torque - Vector3::new(PLAYER_TORQUE_FACTOR, 0.0, 0.0)).norm() < 1.0e-5);
        assert!(p.push_torque(&Vector3::zeros(), 45.0).is_none());
    }

    #[test]
    fn input_push_is_clamped() {
        let input = PlayerInput { push_x: 1.0, push_z: 1.0, ..Default::default() };
        assert!((input.push().norm() - 1.0).abs() < 1.0e-6);
        let half = PlayerInput { push_z: 0.5, ..Default::default() };
        assert_eq!(half.push(), Vector3::new(0.0, 0.0, 0.5));
    }
}
