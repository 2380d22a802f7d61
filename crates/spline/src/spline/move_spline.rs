use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::args::MoveSplineInitArgs;
use super::curve::{Spline, SplineMode};
use super::fall::{compute_fall_elevation, compute_fall_time};
use super::flags::{FacingSpec, SplineFlags};

/// Position plus facing in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub position: Vec3,
    pub orientation: f32,
}

impl Location {
    pub fn new(position: Vec3, orientation: f32) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplineState {
    /// Nothing was ever committed.
    Uncommitted,
    Active,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    None,
    NextSegment,
    NextCycle,
    Arrived,
}

/// The motion state a unit is following right now.
#[derive(Debug, Clone)]
pub struct MoveSpline {
    id: u32,
    spline: Spline,
    flags: SplineFlags,
    facing: FacingSpec,
    time_passed: i32,
    vertical_acceleration: f32,
    initial_orientation: f32,
    effect_start_time: i32,
    point_idx: usize,
    point_idx_offset: i32,
    on_transport: bool,
}

impl Default for MoveSpline {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveSpline {
    pub fn new() -> Self {
        Self {
            id: 0,
            spline: Spline::default(),
            flags: SplineFlags::DONE,
            facing: FacingSpec::None,
            time_passed: 0,
            vertical_acceleration: 0.0,
            initial_orientation: 0.0,
            effect_start_time: 0,
            point_idx: 0,
            point_idx_offset: 0,
            on_transport: false,
        }
    }

    /// Builds the curve, timings and effects for a validated order.
    pub fn initialize(args: &MoveSplineInitArgs, on_transport: bool) -> Self {
        let mut move_spline = Self {
            id: args.spline_id,
            spline: Spline::default(),
            flags: args.flags.with_facing(&args.facing),
            facing: args.facing,
            time_passed: 0,
            vertical_acceleration: 0.0,
            initial_orientation: args.initial_orientation,
            effect_start_time: 0,
            point_idx: 1,
            point_idx_offset: args.path_idx_offset,
            on_transport,
        };

        // stop splines only hold the anchor
        if move_spline.flags.contains(SplineFlags::DONE) {
            let anchor = args.path.first().copied().unwrap_or(Vec3::ZERO);
            move_spline.spline = Spline::stationary(anchor);
            return move_spline;
        }

        move_spline.init_spline(args);

        let duration = move_spline.duration();
        if move_spline
            .flags
            .intersects(SplineFlags::PARABOLIC | SplineFlags::ANIMATION)
        {
            move_spline.effect_start_time = (duration as f32 * args.time_perc) as i32;
            if move_spline.flags.contains(SplineFlags::PARABOLIC)
                && move_spline.effect_start_time < duration
            {
                let f_duration = (duration - move_spline.effect_start_time) as f32 / 1000.0;
                move_spline.vertical_acceleration =
                    args.parabolic_amplitude * 8.0 / (f_duration * f_duration);
            }
        }

        move_spline
    }

    fn init_spline(&mut self, args: &MoveSplineInitArgs) {
        let mode = if self.flags.is_smooth() {
            SplineMode::CatmullRom
        } else {
            SplineMode::Linear
        };
        let cyclic = self.flags.contains(SplineFlags::CYCLIC);
        self.spline = Spline::new(&args.path, mode, cyclic);

        if self.flags.contains(SplineFlags::FALLING) {
            let start_z = args.path[0].z;
            let safe_fall = self.flags.contains(SplineFlags::FALLING_SLOW);
            self.spline.init_lengths(|spline, index| {
                let drop = start_z - spline.point(index + 1).z;
                (compute_fall_time(drop, safe_fall) * 1000.0) as i32
            });
        } else {
            let ms_per_unit = 1000.0 / args.velocity;
            let mut elapsed = 0.0f32;
            self.spline.init_lengths(|spline, index| {
                elapsed += spline.segment_length(index) * ms_per_unit;
                elapsed as i32
            });
        }

        // a zero-length path would finish before it is ever sent
        if self.spline.length() <= 0 {
            let last = self.spline.last();
            let time = if self.spline.is_cyclic() { 1000 } else { 1 };
            self.spline.set_length(last, time);
        }
        self.point_idx = self.spline.first();
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    pub fn flags(&self) -> SplineFlags {
        self.flags
    }

    pub fn facing(&self) -> &FacingSpec {
        &self.facing
    }

    pub fn time_elapsed(&self) -> i32 {
        self.time_passed
    }

    pub fn duration(&self) -> i32 {
        self.spline.length()
    }

    pub fn vertical_acceleration(&self) -> f32 {
        self.vertical_acceleration
    }

    pub fn effect_start_time(&self) -> i32 {
        self.effect_start_time
    }

    pub fn initial_orientation(&self) -> f32 {
        self.initial_orientation
    }

    pub fn on_transport(&self) -> bool {
        self.on_transport
    }

    pub fn is_cyclic(&self) -> bool {
        self.flags.contains(SplineFlags::CYCLIC)
    }

    pub fn finalized(&self) -> bool {
        self.flags.contains(SplineFlags::DONE)
    }

    pub fn state(&self) -> SplineState {
        if self.id == 0 && self.spline.is_empty() {
            SplineState::Uncommitted
        } else if self.finalized() {
            SplineState::Finalized
        } else {
            SplineState::Active
        }
    }

    /// Waypoint the mover is heading to, in the caller's path numbering.
    pub fn current_path_idx(&self) -> i32 {
        let point = self.point_idx_offset + self.point_idx as i32 - self.spline.first() as i32;
        if self.finalized() { point + 1 } else { point }
    }

    pub fn final_destination(&self) -> Vec3 {
        if self.spline.is_empty() {
            return Vec3::ZERO;
        }
        self.spline.point(self.spline.last())
    }

    pub fn current_destination(&self) -> Vec3 {
        if self.spline.is_empty() {
            return Vec3::ZERO;
        }
        if self.finalized() {
            return self.final_destination();
        }
        self.spline.point(self.point_idx + 1)
    }

    /// Advances elapsed time by `diff` milliseconds.
    pub fn update_state(&mut self, diff: i32) -> UpdateResult {
        if self.finalized() || self.spline.is_empty() {
            return UpdateResult::None;
        }

        self.time_passed = self.time_passed.saturating_add(diff.max(0));
        let mut result = UpdateResult::None;

        while self.time_passed >= self.spline.length_at(self.point_idx + 1) {
            if self.point_idx + 1 < self.spline.last() {
                self.point_idx += 1;
                result = UpdateResult::NextSegment;
            } else if self.is_cyclic() {
                self.point_idx = self.spline.first();
                self.time_passed %= self.duration().max(1);
                self.flags.remove(SplineFlags::ENTER_CYCLE);
                result = UpdateResult::NextCycle;
            } else {
                self.finalize();
                self.time_passed = self.duration();
                result = UpdateResult::Arrived;
                break;
            }
        }

        result
    }

    pub fn finalize(&mut self) {
        self.flags.insert(SplineFlags::DONE);
        self.flags.remove(SplineFlags::ENTER_CYCLE);
    }

    /// Interpolated position and facing at the current elapsed time.
    pub fn compute_position(&self) -> Location {
        let (index, u) = self.spline.segment_at(self.time_passed);
        let mut position = self.spline.evaluate(index, u);
        let mut orientation = self.initial_orientation;

        if self.flags.contains(SplineFlags::FALLING) {
            position.z = self.fall_elevation();
        } else if self.flags.contains(SplineFlags::PARABOLIC) {
            position.z += self.parabolic_elevation();
        }

        if self.finalized() && self.flags.is_facing() {
            match self.facing {
                FacingSpec::Angle(angle) => orientation = angle,
                FacingSpec::Spot(spot) => {
                    orientation = (spot.y - position.y).atan2(spot.x - position.x)
                }
                // tracked by the client
                FacingSpec::Target(_) | FacingSpec::None => {}
            }
        } else {
            if !self
                .flags
                .intersects(SplineFlags::ORIENTATION_FIXED | SplineFlags::FALLING)
            {
                let tangent = self.spline.evaluate_derivative(index, u);
                if tangent.x != 0.0 || tangent.y != 0.0 {
                    orientation = tangent.y.atan2(tangent.x);
                }
            }
            if self.flags.contains(SplineFlags::BACKWARD) {
                orientation += std::f32::consts::PI;
            }
        }

        Location::new(position, super::flags::normalize_orientation(orientation))
    }

    fn fall_elevation(&self) -> f32 {
        let start_z = self.spline.point(self.spline.first()).z;
        let safe_fall = self.flags.contains(SplineFlags::FALLING_SLOW);
        let fallen = compute_fall_elevation(self.time_passed as f32 / 1000.0, safe_fall, 0.0);
        (start_z - fallen).max(self.final_destination().z)
    }

    fn parabolic_elevation(&self) -> f32 {
        if self.time_passed <= self.effect_start_time {
            return 0.0;
        }
        let passed = (self.time_passed - self.effect_start_time) as f32 / 1000.0;
        let duration = (self.duration() - self.effect_start_time) as f32 / 1000.0;
        (duration - passed) * 0.5 * self.vertical_acceleration * passed
    }
}
