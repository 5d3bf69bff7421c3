/// Orb deactivation progress
#[derive(Debug, Clone, PartialEq)]
pub enum OrbState {
    Normal,
    Deactivating { timer: f32, length: f32, callback: Option<String> },
    Deactivated,
}

impl OrbState {
    /// Begin deactivating. Ignored unless the orb is still normal.
    pub fn start_deactivation(&mut self, callback: Option<String>, length: f32) -> bool {
        if *self != OrbState::Normal {
            return false;
        }
        *self = OrbState::Deactivating { timer: 0.0, length, callback };
        true
    }

    /// Advance deactivation. Returns the callback to run when it just completed.
    pub fn update(&mut self, dt: f32) -> Option<String> {
        let OrbState::Deactivating { timer, length, callback } = self else {
            return None;
        };
        *timer += dt;
        if *timer < *length {
            return None;
        }
        let callback = callback.take();
        *self = OrbState::Deactivated;
        callback
    }
}

impl crate::objects::Object {
    /// Start deactivating an orb. Returns false for other objects or orbs already deactivating.
    pub fn start_deactivation(&mut self, callback: Option<String>, length: f32) -> bool {
        match &mut self.behavior {
            crate::objects::Behavior::Orb(orb) => orb.start_deactivation(callback, length),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_callback_once_when_done() {
        let mut orb = OrbState::Normal;
        assert!(orb.start_deactivation(Some("OnOrbDone".into()), 0.025));
        assert!(!orb.start_deactivation(None, 1.0));
        assert_eq!(orb.update(0.01), None);
        assert_eq!(orb.update(0.01), None);
        assert_eq!(orb.update(0.01), Some("OnOrbDone".to_string()));
        assert_eq!(orb, OrbState::Deactivated);
        assert_eq!(orb.update(0.01), None);
    }
}
