use spherefall_common::ObjectId;

use crate::constants::ZONE_TOUCH_FRAMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneTouch {
    pub object: ObjectId,
    /// Frames left before the touch expires without a fresh contact
    pub countdown: i32,
}

/// Objects currently inside a zone
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneState {
    active: bool,
    touches: Vec<ZoneTouch>,
}

impl ZoneState {
    pub fn new(active: bool) -> Self {
        Self { active, touches: Vec::new() }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enable or disable the zone. Either way it forgets every touch.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.touches.clear();
    }

    pub fn touches(&self) -> &[ZoneTouch] {
        &self.touches
    }

    pub fn begin_frame(&mut self) {
        for touch in &mut self.touches {
            touch.countdown -= 1;
        }
    }

    /// Refresh or add a touch. Returns true for a new touch.
    pub fn touch(&mut self, object: ObjectId) -> bool {
        if !self.active {
            return false;
        }
        if let Some(touch) = self.touches.iter_mut().find(|t| t.object == object) {
            touch.countdown = ZONE_TOUCH_FRAMES;
            return false;
        }
        self.touches.push(ZoneTouch { object, countdown: ZONE_TOUCH_FRAMES });
        true
    }

    /// Remove and return the touches whose countdown ran out
    pub fn expire(&mut self) -> Vec<ObjectId> {
        let mut expired = Vec::new();
        self.touches.retain(|t| {
            if t.countdown <= 0 {
                expired.push(t.object);
                false
            } else {
                true
            }
        });
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_missed_frame_keeps_the_touch() {
        let mut zone = ZoneState::new(true);
        assert!(zone.touch(ObjectId(1)));
        assert!(zone.expire().is_empty());

        // Contact withheld for one frame
        zone.begin_frame();
        assert!(zone.expire().is_empty());

        zone.begin_frame();
        assert!(!zone.touch(ObjectId(1)));
        assert!(zone.expire().is_empty());
    }

    #[test]
    fn two_missed_frames_expire() {
        let mut zone = ZoneState::new(true);
        zone.touch(ObjectId(1));
        zone.begin_frame();
        zone.begin_frame();
        assert_eq!(zone.expire(), vec![ObjectId(1)]);
        assert!(zone.touches().is_empty());
    }

    #[test]
    fn inactive_zone_ignores_touches() {
        let mut zone = ZoneState::new(true);
        zone.touch(ObjectId(1));
        zone.set_active(false);
        assert!(zone.touches().is_empty());
        assert!(!zone.touch(ObjectId(2)));
    }
}
