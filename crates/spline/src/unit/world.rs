use std::collections::HashMap;

use glam::Vec3;

use crate::spline::UpdateResult;

use super::entity::{Unit, UnitHandle, UNIT_GUID_HIGH};

/// Owns the units of one map and steps their splines.
#[derive(Debug)]
pub struct UnitRegistry {
    tick: u32,
    units: HashMap<u64, Unit>,
    next_counter: u64,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self {
            tick: 0,
            units: HashMap::new(),
            next_counter: 1,
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn spawn(&mut self, position: Vec3) -> UnitHandle {
        let guid = UNIT_GUID_HIGH | self.next_counter;
        self.next_counter += 1;
        self.units.insert(guid, Unit::new(guid, position));
        UnitHandle(guid)
    }

    pub fn despawn(&mut self, handle: UnitHandle) -> Option<Unit> {
        self.units.remove(&handle.0)
    }

    pub fn get(&self, handle: UnitHandle) -> Option<&Unit> {
        self.units.get(&handle.0)
    }

    pub fn get_mut(&mut self, handle: UnitHandle) -> Option<&mut Unit> {
        self.units.get_mut(&handle.0)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Steps every unit's spline by `diff_ms` and reports the units that
    /// reached the end of their path.
    pub fn update(&mut self, diff_ms: u32) -> Vec<UnitHandle> {
        self.tick = self.tick.wrapping_add(1);

        let mut arrived = Vec::new();
        for unit in self.units.values_mut() {
            unit.dirty = false;
            if unit.update_spline_movement(diff_ms) == UpdateResult::Arrived {
                arrived.push(unit.handle());
            }
        }
        arrived
    }
}

/// Millisecond clock truncated to 32 bits, as sent in stop packets.
pub fn ms_time() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u32)
        .unwrap_or_default()
}
