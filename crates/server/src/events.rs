use std::net::SocketAddr;

use glam::Vec3;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    UnitSpawned {
        guid: u64,
        position: Vec3,
    },
    SplineLaunched {
        guid: u64,
        duration_ms: i32,
    },
    OrderRejected {
        guid: u64,
    },
    UnitArrived {
        guid: u64,
        position: Vec3,
    },
    UnitStopped {
        guid: u64,
        position: Vec3,
    },
    SendFailed {
        addr: SocketAddr,
        message: String,
    },
}
