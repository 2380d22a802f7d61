use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Classification of a committed spline. The low three bits carry the
    /// animation id when [`SplineFlags::ANIMATION`] is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SplineFlags: u32 {
        const ANIM_BIT_1 = 0x0000_0001;
        const ANIM_BIT_2 = 0x0000_0002;
        const ANIM_BIT_3 = 0x0000_0004;
        const FALLING_SLOW = 0x0000_0010;
        const DONE = 0x0000_0020;
        const FALLING = 0x0000_0040;
        const NO_SPLINE = 0x0000_0080;
        const FLYING = 0x0000_0200;
        const ORIENTATION_FIXED = 0x0000_0400;
        const CATMULL_ROM = 0x0000_0800;
        const CYCLIC = 0x0000_1000;
        const ENTER_CYCLE = 0x0000_2000;
        const FROZEN = 0x0000_4000;
        const TRANSPORT_ENTER = 0x0000_8000;
        const TRANSPORT_EXIT = 0x0001_0000;
        const BACKWARD = 0x0008_0000;
        const SMOOTH_GROUND_PATH = 0x0010_0000;
        const WALKMODE = 0x0020_0000;
        const UNCOMPRESSED_PATH = 0x0040_0000;
        const ANIMATION = 0x0100_0000;
        const PARABOLIC = 0x0200_0000;
        const FINAL_POINT = 0x0400_0000;
        const FINAL_TARGET = 0x0800_0000;
        const FINAL_ANGLE = 0x1000_0000;
    }
}

impl SplineFlags {
    pub const MASK_ANIMATIONS: Self = Self::ANIM_BIT_1
        .union(Self::ANIM_BIT_2)
        .union(Self::ANIM_BIT_3);

    pub const MASK_FINAL_FACING: Self = Self::FINAL_POINT
        .union(Self::FINAL_TARGET)
        .union(Self::FINAL_ANGLE);

    /// Bits the client derives from other packet fields; never sent raw.
    pub const MASK_NO_MONSTER_MOVE: Self = Self::MASK_FINAL_FACING
        .union(Self::MASK_ANIMATIONS)
        .union(Self::DONE);

    /// Either of these makes the curve evaluate in Catmull-Rom mode.
    pub const MASK_CATMULL_ROM: Self = Self::FLYING.union(Self::CATMULL_ROM);

    pub fn animation_id(self) -> u8 {
        (self & Self::MASK_ANIMATIONS).bits() as u8
    }

    pub fn is_smooth(self) -> bool {
        self.intersects(Self::MASK_CATMULL_ROM)
    }

    pub fn is_facing(self) -> bool {
        self.intersects(Self::MASK_FINAL_FACING)
    }

    /// Value for the raw flags field of the monster move packet.
    pub fn wire_bits(self) -> u32 {
        (self - Self::MASK_NO_MONSTER_MOVE).bits()
    }

    pub fn enable_animation(&mut self, anim: u8) {
        self.remove(Self::MASK_ANIMATIONS | Self::FALLING | Self::PARABOLIC | Self::FALLING_SLOW);
        self.insert(Self::ANIMATION | Self::from_bits_retain(u32::from(anim & 0x7)));
    }

    pub fn enable_parabolic(&mut self) {
        self.remove(Self::MASK_ANIMATIONS | Self::FALLING | Self::ANIMATION);
        self.insert(Self::PARABOLIC);
    }

    pub fn enable_flying(&mut self) {
        self.remove(Self::FALLING);
        self.insert(Self::FLYING);
    }

    pub fn enable_falling(&mut self) {
        self.remove(Self::MASK_CATMULL_ROM | Self::PARABOLIC | Self::ANIMATION);
        self.insert(Self::FALLING);
    }

    pub fn enable_catmull_rom(&mut self) {
        self.remove(Self::SMOOTH_GROUND_PATH);
        self.insert(Self::CATMULL_ROM | Self::UNCOMPRESSED_PATH);
    }

    pub fn enable_transport_enter(&mut self) {
        self.remove(Self::TRANSPORT_EXIT);
        self.insert(Self::TRANSPORT_ENTER);
    }

    pub fn enable_transport_exit(&mut self) {
        self.remove(Self::TRANSPORT_ENTER);
        self.insert(Self::TRANSPORT_EXIT);
    }

    /// Replaces the final-facing bits with the ones matching `facing`.
    pub fn with_facing(self, facing: &FacingSpec) -> Self {
        let base = self - Self::MASK_FINAL_FACING;
        match facing {
            FacingSpec::None => base,
            FacingSpec::Angle(_) => base | Self::FINAL_ANGLE,
            FacingSpec::Target(_) => base | Self::FINAL_TARGET,
            FacingSpec::Spot(_) => base | Self::FINAL_POINT,
        }
    }
}

/// How the mover is oriented once it reaches the end of the path.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum FacingSpec {
    #[default]
    None,
    /// Radians in `[0, 2π)`.
    Angle(f32),
    /// Guid of the unit to keep facing.
    Target(u64),
    Spot(Vec3),
}

impl FacingSpec {
    pub fn move_type(&self) -> MonsterMoveType {
        match self {
            Self::None => MonsterMoveType::Normal,
            Self::Spot(_) => MonsterMoveType::FacingSpot,
            Self::Target(_) => MonsterMoveType::FacingTarget,
            Self::Angle(_) => MonsterMoveType::FacingAngle,
        }
    }
}

/// Wrapped into `[0, 2π)`.
pub fn normalize_orientation(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(std::f32::consts::TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= std::f32::consts::TAU {
        0.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MonsterMoveType {
    Normal = 0,
    FacingSpot = 1,
    FacingTarget = 2,
    FacingAngle = 3,
    Stop = 4,
}

impl TryFrom<u8> for MonsterMoveType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::FacingSpot),
            2 => Ok(Self::FacingTarget),
            3 => Ok(Self::FacingAngle),
            4 => Ok(Self::Stop),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{PI, TAU};

    use super::*;

    #[test]
    fn falling_clears_smooth_bits() {
        let mut flags = SplineFlags::FLYING | SplineFlags::CATMULL_ROM | SplineFlags::WALKMODE;
        flags.enable_falling();
        assert!(flags.contains(SplineFlags::FALLING | SplineFlags::WALKMODE));
        assert!(!flags.is_smooth());
    }

    #[test]
    fn animation_id_in_low_bits() {
        let mut flags = SplineFlags::FALLING;
        flags.enable_animation(13);
        assert_eq!(flags.animation_id(), 5);
        assert!(flags.contains(SplineFlags::ANIMATION));
        assert!(!flags.contains(SplineFlags::FALLING));
        assert_eq!(flags.wire_bits() & 0x7, 0);
    }

    #[test]
    fn facing_bits_follow_facing_spec() {
        let flags = SplineFlags::FINAL_TARGET | SplineFlags::WALKMODE;
        let flags = flags.with_facing(&FacingSpec::Angle(1.0));
        assert!(flags.contains(SplineFlags::FINAL_ANGLE));
        assert!(!flags.contains(SplineFlags::FINAL_TARGET));
        assert!(!flags.with_facing(&FacingSpec::None).is_facing());
    }

    #[test]
    fn catmull_rom_is_uncompressed() {
        let mut flags = SplineFlags::SMOOTH_GROUND_PATH;
        flags.enable_catmull_rom();
        assert!(flags.contains(SplineFlags::UNCOMPRESSED_PATH));
        assert!(!flags.contains(SplineFlags::SMOOTH_GROUND_PATH));
    }

    #[test]
    fn orientation_wraps() {
        assert!((normalize_orientation(3.0 * PI) - PI).abs() < 1e-5);
        assert!((normalize_orientation(-PI / 2.0) - 1.5 * PI).abs() < 1e-5);
        assert!(normalize_orientation(-1e-9) < TAU);
    }
}
