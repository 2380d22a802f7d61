use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// The platform a unit is riding, as seen from the passenger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportFrame {
    pub guid: u64,
    /// -1 for transports without seats.
    pub seat: i8,
    pub local_offset: Vec3,
    pub local_orientation: f32,
    pub platform_position: Vec3,
    pub platform_orientation: f32,
    /// Set when the passenger is driving a vehicle that sits on the platform.
    pub vehicle_orientation: Option<f32>,
}

impl TransportFrame {
    pub fn new(guid: u64, platform_position: Vec3, platform_orientation: f32) -> Self {
        Self {
            guid,
            seat: -1,
            local_offset: Vec3::ZERO,
            local_orientation: 0.0,
            platform_position,
            platform_orientation,
            vehicle_orientation: None,
        }
    }

    pub fn with_seat(mut self, seat: i8) -> Self {
        self.seat = seat;
        self
    }

    /// World point to platform-local offset.
    pub fn passenger_offset(&self, world: Vec3) -> Vec3 {
        Quat::from_rotation_z(-self.platform_orientation) * (world - self.platform_position)
    }

    /// Platform-local offset back to world space.
    pub fn world_position(&self, local: Vec3) -> Vec3 {
        self.platform_position + Quat::from_rotation_z(self.platform_orientation) * local
    }

    /// Orientation subtracted from facing angles of transport-relative orders.
    pub fn frame_orientation(&self) -> f32 {
        self.vehicle_orientation.unwrap_or(self.platform_orientation)
    }

    /// Places the passenger at `world`, keeping the local offset in sync.
    pub fn attach_at(&mut self, world: Vec3, orientation: f32) {
        self.local_offset = self.passenger_offset(world);
        self.local_orientation = orientation - self.platform_orientation;
    }
}
