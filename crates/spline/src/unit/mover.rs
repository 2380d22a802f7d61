use glam::Vec3;

use crate::movement::{MovementFlags, SpeedCategory};
use crate::spline::MoveSpline;

use super::TransportFrame;

/// What the spline pipeline needs to know about the unit it moves.
pub trait Mover {
    fn guid(&self) -> u64;

    /// Raw world position.
    fn position(&self) -> Vec3;

    fn orientation(&self) -> f32;

    /// Height the unit floats above its path, e.g. while hovering.
    fn hover_offset(&self) -> f32 {
        0.0
    }

    /// World position with the hover offset removed; splines start here.
    fn anchor_position(&self) -> Vec3 {
        let position = self.position();
        Vec3::new(position.x, position.y, position.z - self.hover_offset())
    }

    fn movement_flags(&self) -> MovementFlags;

    fn set_movement_flags(&mut self, flags: MovementFlags);

    /// Tabulated speed in units per second.
    fn speed(&self, category: SpeedCategory) -> f32;

    fn transport(&self) -> Option<&TransportFrame>;

    fn move_spline(&self) -> &MoveSpline;

    fn move_spline_mut(&mut self) -> &mut MoveSpline;

    fn transport_guid(&self) -> u64 {
        self.transport().map_or(0, |transport| transport.guid)
    }

    fn transport_seat(&self) -> i8 {
        self.transport().map_or(-1, |transport| transport.seat)
    }
}
