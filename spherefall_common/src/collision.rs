use rapier3d::geometry::InteractionGroups;

/// Collision filter bits. A body's group says what it is, its mask what it collides with.
pub mod filter {
    pub const RIGIDBODY: u32 = 1 << 0;
    pub const STATIC:    u32 = 1 << 1;
    pub const CAMERA:    u32 = 1 << 2;
    pub const ZONE:      u32 = 1 << 3;

    /// Bits that classify how a body takes part in contact response
    pub const BODY_BITS: u32 = RIGIDBODY | STATIC;

    /// Group of a freshly declared template
    pub const DEFAULT_GROUP: u32 = RIGIDBODY | CAMERA;
    /// Mask of a freshly declared template. Includes ZONE so zone overlaps are reported.
    pub const DEFAULT_MASK:  u32 = RIGIDBODY | STATIC | ZONE;
}

/// Clear `bits` from `value`
#[inline]
pub const fn remove_filter(value: u32, bits: u32) -> u32 {
    value & !bits
}

/// Set `bits` in `value`
#[inline]
pub const fn add_filter(value: u32, bits: u32) -> u32 {
    value | bits
}

/// Two bodies collide only when each one's group is accepted by the other's mask
#[inline]
pub const fn collides(group_a: u32, mask_a: u32, group_b: u32, mask_b: u32) -> bool {
    (group_a & mask_b) != 0 && (group_b & mask_a) != 0
}

/// Build the two-mask InteractionGroups for Rapier
#[inline]
pub fn interaction_groups(group: u32, mask: u32) -> InteractionGroups {
    InteractionGroups::new(group.into(), mask.into())
}

/// Query groups for camera rays: they hit any collider that is a CAMERA member
#[inline]
pub fn camera_ray_groups() -> InteractionGroups {
    InteractionGroups::new(u32::MAX.into(), filter::CAMERA.into())
}

#[cfg(test)]
mod tests {
    use super::filter::*;
    use super::*;

    #[test]
    fn static_bodies_do_not_push_each_other() {
        let mask = remove_filter(DEFAULT_MASK, STATIC);
        assert!(!collides(STATIC, mask, STATIC, mask));
        assert!(collides(STATIC, mask, RIGIDBODY, DEFAULT_MASK));
    }

    #[test]
    fn zones_only_see_rigid_bodies() {
        assert!(collides(ZONE, RIGIDBODY, DEFAULT_GROUP, DEFAULT_MASK));
        assert!(!collides(ZONE, RIGIDBODY, STATIC | CAMERA, RIGIDBODY));
    }

    #[test]
    fn camera_rays_skip_zones() {
        let ray = camera_ray_groups();
        assert!(ray.test(interaction_groups(DEFAULT_GROUP, DEFAULT_MASK)));
        assert!(!ray.test(interaction_groups(ZONE, RIGIDBODY)));
    }
}
