use glam::Vec3;

use crate::unit::{Mover, TransportFrame};

/// Maps world points into the mover's transport frame.
///
/// Identity when the mover is not attached or the transform was disabled.
#[derive(Debug, Clone, Copy)]
pub struct TransportPathTransform<'a> {
    transport: Option<&'a TransportFrame>,
}

impl<'a> TransportPathTransform<'a> {
    pub fn new<M: Mover + ?Sized>(mover: &'a M, enabled: bool) -> Self {
        Self {
            transport: if enabled { mover.transport() } else { None },
        }
    }

    pub fn is_active(&self) -> bool {
        self.transport.is_some()
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        match self.transport {
            Some(transport) => transport.passenger_offset(world),
            None => world,
        }
    }

    /// Facing angle relative to the frame, unwrapped.
    pub fn to_local_angle(&self, angle: f32) -> f32 {
        match self.transport {
            Some(transport) => angle - transport.frame_orientation(),
            None => angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;
    use crate::unit::Unit;

    #[test]
    fn identity_when_unattached() {
        let unit = Unit::new(1, Vec3::ZERO);
        let transform = TransportPathTransform::new(&unit, true);
        assert!(!transform.is_active());
        assert_eq!(transform.to_local(Vec3::new(4.0, 5.0, 6.0)), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(transform.to_local_angle(1.0), 1.0);
    }

    #[test]
    fn attached_points_become_offsets() {
        let mut unit = Unit::new(1, Vec3::new(101.0, 0.0, 0.0));
        unit.board(TransportFrame::new(5, Vec3::new(100.0, 0.0, 0.0), PI));

        let transform = TransportPathTransform::new(&unit, true);
        let local = transform.to_local(Vec3::new(98.0, 1.0, 2.0));
        assert!(local.distance(Vec3::new(2.0, -1.0, 2.0)) < 1e-4);
        assert!((transform.to_local_angle(PI) - 0.0).abs() < 1e-6);

        let disabled = TransportPathTransform::new(&unit, false);
        assert_eq!(disabled.to_local(Vec3::new(98.0, 1.0, 2.0)), Vec3::new(98.0, 1.0, 2.0));
    }
}
