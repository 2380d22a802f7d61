use glam::Vec3;

use crate::movement::{MovementFlags, SpeedCategory};

use super::flags::{FacingSpec, SplineFlags};

/// Orders slower than this are rejected at commit.
pub const MIN_VELOCITY: f32 = 0.1;

/// Speed resolution behind an order, reported when its velocity is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedContext {
    pub flags: MovementFlags,
    pub category: SpeedCategory,
    /// The mover's table speed for `category`.
    pub tabulated: f32,
}

/// Why a motion order was not committed.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Rejected {
    #[error("path has no points beyond the anchor")]
    EmptyPath,
    #[error(
        "velocity {velocity} below minimum (flags {:?}, category {:?}, tabulated {})",
        .speed.flags,
        .speed.category,
        .speed.tabulated
    )]
    VelocityTooLow {
        velocity: f32,
        has_velocity: bool,
        speed: SpeedContext,
    },
    #[error("time percentage {0} outside [0, 1]")]
    TimeOutOfRange(f32),
}

/// A staged motion order, consumed by a single commit.
#[derive(Debug, Clone)]
pub struct MoveSplineInitArgs {
    pub path: Vec<Vec3>,
    pub facing: FacingSpec,
    pub flags: SplineFlags,
    pub path_idx_offset: i32,
    pub velocity: f32,
    pub has_velocity: bool,
    pub parabolic_amplitude: f32,
    /// Fraction of the duration after which the animation or arc starts.
    pub time_perc: f32,
    pub spline_id: u32,
    pub initial_orientation: f32,
    pub transform_for_transport: bool,
}

impl Default for MoveSplineInitArgs {
    fn default() -> Self {
        Self::new(16)
    }
}

impl MoveSplineInitArgs {
    pub fn new(path_capacity: usize) -> Self {
        Self {
            path: Vec::with_capacity(path_capacity),
            facing: FacingSpec::None,
            flags: SplineFlags::empty(),
            path_idx_offset: 0,
            velocity: 0.0,
            has_velocity: false,
            parabolic_amplitude: 0.0,
            time_perc: 0.0,
            spline_id: 0,
            initial_orientation: 0.0,
            transform_for_transport: true,
        }
    }

    pub fn validate(&self) -> bool {
        !self.path.is_empty() && self.velocity_in_range() && self.timing_in_range()
    }

    /// Like [`validate`](Self::validate), naming the first failure. `speed`
    /// is how the velocity was resolved.
    pub fn check(&self, speed: SpeedContext) -> Result<(), Rejected> {
        if self.path.is_empty() {
            return Err(Rejected::EmptyPath);
        }
        if !self.velocity_in_range() {
            return Err(Rejected::VelocityTooLow {
                velocity: self.velocity,
                has_velocity: self.has_velocity,
                speed,
            });
        }
        if !self.timing_in_range() {
            return Err(Rejected::TimeOutOfRange(self.time_perc));
        }
        Ok(())
    }

    // written so that NaN fails too
    fn velocity_in_range(&self) -> bool {
        self.velocity > MIN_VELOCITY
    }

    fn timing_in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.time_perc)
    }
}
