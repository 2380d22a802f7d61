mod entity;
mod mover;
mod transport;
mod world;

pub use entity::{Unit, UnitHandle, UNIT_GUID_HIGH};
pub use mover::Mover;
pub use transport::TransportFrame;
pub use world::{ms_time, UnitRegistry};
