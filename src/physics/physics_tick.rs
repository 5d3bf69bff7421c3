use rapier3d::prelude::*;

use crate::physics::PhysicsWorld;
use crate::physics::contact_tracker::{CollisionNotification, collect_notifications};

impl PhysicsWorld {
    /// Advance the world by `dt` and return the collisions found during the step.
    ///
    /// Callers dispatch the notifications before copying body poses back into objects,
    /// so handlers see the state the contacts were detected against.
    pub fn update(&mut self, dt: f32) -> Vec<CollisionNotification> {
        if !self.is_enabled() {
            return Vec::new();
        }
        self.integration_parameters.dt = dt;

        // Step physics simulation with the material hooks
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &self.hooks,
            &(),
        );
        self.clear_query_dirty();

        let notifications = collect_notifications(self);
        log::trace!("Physics step produced {} collision notifications", notifications.len());
        notifications
    }
}
