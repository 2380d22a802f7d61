use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Movement state of a unit as seen by clients.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MovementFlags: u32 {
        const FORWARD = 0x0000_0001;
        const BACKWARD = 0x0000_0002;
        const STRAFE_LEFT = 0x0000_0004;
        const STRAFE_RIGHT = 0x0000_0008;
        const LEFT = 0x0000_0010;
        const RIGHT = 0x0000_0020;
        const PITCH_UP = 0x0000_0040;
        const PITCH_DOWN = 0x0000_0080;
        const WALKING = 0x0000_0100;
        const DISABLE_GRAVITY = 0x0000_0200;
        const ROOT = 0x0000_0400;
        const FALLING = 0x0000_0800;
        const FALLING_FAR = 0x0000_1000;
        const PENDING_STOP = 0x0000_2000;
        const SWIMMING = 0x0010_0000;
        const ASCENDING = 0x0020_0000;
        const DESCENDING = 0x0040_0000;
        const CAN_FLY = 0x0080_0000;
        const FLYING = 0x0100_0000;
        const SPLINE_ELEVATION = 0x0200_0000;
        const WATERWALKING = 0x0400_0000;
        const FALLING_SLOW = 0x0800_0000;
        const HOVER = 0x1000_0000;
    }
}

impl MovementFlags {
    /// Flags that describe translation, stripped when a unit is rooted.
    pub const MASK_MOVING: Self = Self::FORWARD
        .union(Self::BACKWARD)
        .union(Self::STRAFE_LEFT)
        .union(Self::STRAFE_RIGHT)
        .union(Self::FALLING)
        .union(Self::ASCENDING)
        .union(Self::DESCENDING);

    /// Any of these puts the unit on the flight speed table.
    pub const MASK_AIRBORNE: Self = Self::FLYING
        .union(Self::CAN_FLY)
        .union(Self::DISABLE_GRAVITY);

    pub fn directional(self) -> Self {
        self & Self::MASK_MOVING
    }

    pub fn capability(self) -> Self {
        self & (Self::MASK_AIRBORNE | Self::SWIMMING | Self::WATERWALKING | Self::HOVER)
    }

    #[inline]
    pub fn is_airborne(self) -> bool {
        self.intersects(Self::MASK_AIRBORNE)
    }

    #[inline]
    pub fn is_swimming(self) -> bool {
        self.contains(Self::SWIMMING)
    }

    #[inline]
    pub fn is_walking(self) -> bool {
        self.contains(Self::WALKING)
    }

    #[inline]
    pub fn is_backward(self) -> bool {
        self.contains(Self::BACKWARD)
    }

    #[inline]
    pub fn is_rooted(self) -> bool {
        self.contains(Self::ROOT)
    }

    pub fn is_moving(self) -> bool {
        self.intersects(Self::MASK_MOVING)
    }

    pub fn strip_moving(&mut self) {
        self.remove(Self::MASK_MOVING);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_strips_only_moving_bits() {
        let mut flags = MovementFlags::FORWARD
            | MovementFlags::FALLING
            | MovementFlags::ROOT
            | MovementFlags::WALKING
            | MovementFlags::LEFT;
        flags.strip_moving();

        assert!(!flags.is_moving());
        assert!(flags.is_rooted());
        assert!(flags.is_walking());
        assert!(flags.contains(MovementFlags::LEFT));
    }

    #[test]
    fn group_accessors() {
        let flags = MovementFlags::BACKWARD | MovementFlags::CAN_FLY | MovementFlags::PITCH_UP;
        assert_eq!(flags.directional(), MovementFlags::BACKWARD);
        assert_eq!(flags.capability(), MovementFlags::CAN_FLY);
        assert!(flags.is_airborne());
    }
}
