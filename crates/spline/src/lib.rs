pub mod movement;
pub mod net;
pub mod simulation;
pub mod spline;
pub mod unit;

pub use movement::{select_speed_category, MovementFlags, SpeedCategory, SpeedTable};
pub use net::{MessageSink, MonsterMove, MovePath, PacketError, PacketLog};
pub use simulation::FixedTimestep;
pub use spline::{
    FacingSpec, Location, MonsterMoveType, MoveSpline, MoveSplineInit, MoveSplineInitArgs,
    Rejected, SpeedContext, Spline, SplineFlags, SplineMode, SplineState, TransportPathTransform,
    UpdateResult,
};
pub use unit::{Mover, TransportFrame, Unit, UnitHandle, UnitRegistry};
