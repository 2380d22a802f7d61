use serde::{Deserialize, Serialize};

use super::MovementFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SpeedCategory {
    Walk = 0,
    Run = 1,
    RunBack = 2,
    Swim = 3,
    SwimBack = 4,
    Flight = 5,
    FlightBack = 6,
}

impl SpeedCategory {
    pub const ALL: [SpeedCategory; 7] = [
        Self::Walk,
        Self::Run,
        Self::RunBack,
        Self::Swim,
        Self::SwimBack,
        Self::Flight,
        Self::FlightBack,
    ];
}

/// Picks the speed table entry a unit travels at for the given movement state.
///
/// The checks run in a fixed order and the first match wins: airborne beats
/// swimming, swimming beats walking, and walking has no backward variant.
pub fn select_speed_category(flags: MovementFlags) -> SpeedCategory {
    if flags.is_airborne() {
        if flags.is_backward() {
            SpeedCategory::FlightBack
        } else {
            SpeedCategory::Flight
        }
    } else if flags.is_swimming() {
        if flags.is_backward() {
            SpeedCategory::SwimBack
        } else {
            SpeedCategory::Swim
        }
    } else if flags.is_walking() {
        SpeedCategory::Walk
    } else if flags.is_backward() {
        SpeedCategory::RunBack
    } else {
        SpeedCategory::Run
    }
}

/// Per-category travel speeds in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedTable {
    speeds: [f32; 7],
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self {
            speeds: [2.5, 7.0, 4.5, 4.722_222, 2.5, 7.0, 4.5],
        }
    }
}

impl SpeedTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, category: SpeedCategory) -> f32 {
        self.speeds[category as usize]
    }

    pub fn set(&mut self, category: SpeedCategory, speed: f32) {
        self.speeds[category as usize] = speed;
    }

    pub fn with(mut self, category: SpeedCategory, speed: f32) -> Self {
        self.set(category, speed);
        self
    }

    /// Scales every entry, e.g. for a haste or slow effect.
    pub fn scaled(mut self, rate: f32) -> Self {
        for speed in &mut self.speeds {
            *speed *= rate;
        }
        self
    }
}
