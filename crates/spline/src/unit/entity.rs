use glam::Vec3;

use crate::movement::{MovementFlags, SpeedCategory, SpeedTable};
use crate::net::MessageSink;
use crate::spline::{MoveSpline, MoveSplineInit, UpdateResult};

use super::{Mover, TransportFrame};

/// High guid part for server-controlled units.
pub const UNIT_GUID_HIGH: u64 = 0xF130 << 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitHandle(pub u64);

impl UnitHandle {
    pub fn guid(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub guid: u64,
    pub position: Vec3,
    pub orientation: f32,
    pub hover_offset: f32,
    pub movement_flags: MovementFlags,
    pub speeds: SpeedTable,
    pub transport: Option<TransportFrame>,
    pub move_spline: MoveSpline,
    pub dirty: bool,
}

impl Unit {
    pub fn new(guid: u64, position: Vec3) -> Self {
        Self {
            guid,
            position,
            orientation: 0.0,
            hover_offset: 0.0,
            movement_flags: MovementFlags::empty(),
            speeds: SpeedTable::default(),
            transport: None,
            move_spline: MoveSpline::new(),
            dirty: true,
        }
    }

    pub fn with_speeds(mut self, speeds: SpeedTable) -> Self {
        self.speeds = speeds;
        self
    }

    pub fn handle(&self) -> UnitHandle {
        UnitHandle(self.guid)
    }

    pub fn is_moving(&self) -> bool {
        !self.move_spline.finalized()
    }

    /// Boards `transport`, keeping the current world position.
    pub fn board(&mut self, mut transport: TransportFrame) {
        transport.attach_at(self.position, self.orientation);
        self.transport = Some(transport);
        self.dirty = true;
    }

    pub fn leave_transport(&mut self) -> Option<TransportFrame> {
        self.dirty = true;
        self.transport.take()
    }

    /// Advances the active spline and moves the unit along it.
    pub fn update_spline_movement(&mut self, diff_ms: u32) -> UpdateResult {
        if self.move_spline.finalized() {
            return UpdateResult::None;
        }

        let diff = i32::try_from(diff_ms).unwrap_or(i32::MAX);
        let result = self.move_spline.update_state(diff);
        self.sync_spline_position();

        if result == UpdateResult::Arrived {
            self.movement_flags.remove(MovementFlags::FORWARD);
        }
        result
    }

    /// Writes the spline's current sample back into the unit's position.
    pub fn sync_spline_position(&mut self) {
        let location = self.move_spline.compute_position();
        let on_transport = self.move_spline.on_transport();

        match self.transport.as_mut() {
            Some(transport) if on_transport => {
                transport.local_offset = location.position;
                transport.local_orientation = location.orientation;
                let world = transport.world_position(location.position);
                self.position = Vec3::new(world.x, world.y, world.z + self.hover_offset);
                self.orientation = location.orientation + transport.platform_orientation;
            }
            _ => {
                self.position = location.position + Vec3::new(0.0, 0.0, self.hover_offset);
                self.orientation = location.orientation;
            }
        }
        self.dirty = true;
    }

    /// Halts the unit where it currently is and tells observers.
    pub fn stop_moving(&mut self, sink: &mut impl MessageSink) {
        if self.move_spline.finalized() {
            return;
        }
        self.sync_spline_position();
        MoveSplineInit::new(self).stop(false, sink);
    }
}

impl Mover for Unit {
    fn guid(&self) -> u64 {
        self.guid
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn orientation(&self) -> f32 {
        self.orientation
    }

    fn hover_offset(&self) -> f32 {
        self.hover_offset
    }

    fn movement_flags(&self) -> MovementFlags {
        self.movement_flags
    }

    fn set_movement_flags(&mut self, flags: MovementFlags) {
        self.movement_flags = flags;
    }

    fn speed(&self, category: SpeedCategory) -> f32 {
        self.speeds.get(category)
    }

    fn transport(&self) -> Option<&TransportFrame> {
        self.transport.as_ref()
    }

    fn move_spline(&self) -> &MoveSpline {
        &self.move_spline
    }

    fn move_spline_mut(&mut self) -> &mut MoveSpline {
        &mut self.move_spline
    }
}
