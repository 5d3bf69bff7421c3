//! Packing of the owning object into Rapier `user_data`

use spherefall_common::ObjectId;

// Bit shifts for user_data packing
pub const OBJECT_TYPE_SHIFT: u32 = 24;
pub const ZONE_FLAG_SHIFT: u32 = 16;
pub const OBJECT_ID_SHIFT: u32 = 0;

/// Owner payload stored on every collider and body the world creates for an object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserData {
    /// Tag of the owner's object type; 0 means untagged
    pub object_type: u8,
    pub zone: bool,
    pub object_id: ObjectId,
}

impl UserData {
    /// Pack all fields into a single u128 value (const fn)
    #[inline(always)]
    pub const fn pack(self) -> u128 {
        ((self.object_type as u128) << OBJECT_TYPE_SHIFT)
        | ((self.zone as u8 as u128) << ZONE_FLAG_SHIFT)
        | ((self.object_id.0 as u128) << OBJECT_ID_SHIFT)
    }

    /// Unpack a u128 payload into its constituent fields
    #[inline(always)]
    pub fn unpack(data: u128) -> Self {
        let object_type = ((data >> OBJECT_TYPE_SHIFT) & 0xFF) as u8;
        let zone = ((data >> ZONE_FLAG_SHIFT) & 0x1) != 0;
        let object_id = ObjectId(((data >> OBJECT_ID_SHIFT) & 0xFFFF) as u16);
        Self { object_type, zone, object_id }
    }

    /// Colliders nobody has claimed yet carry zero user data
    #[inline]
    pub fn is_tagged(self) -> bool {
        self.object_type != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_keeps_fields_apart() {
        let data = UserData { object_type: 9, zone: true, object_id: ObjectId(0xFFFF) };
        assert_eq!(UserData::unpack(data.pack()), data);
        assert!(!UserData::unpack(0).is_tagged());
    }
}
