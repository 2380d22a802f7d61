mod args;
mod curve;
mod fall;
mod flags;
mod init;
mod move_spline;
mod transform;

pub use args::{MoveSplineInitArgs, Rejected, SpeedContext, MIN_VELOCITY};
pub use curve::{Spline, SplineMode};
pub use fall::{
    compute_fall_elevation, compute_fall_time, GRAVITY, TERMINAL_SAFE_FALL_VELOCITY,
    TERMINAL_VELOCITY,
};
pub use flags::{normalize_orientation, FacingSpec, MonsterMoveType, SplineFlags};
pub use init::MoveSplineInit;
pub use move_spline::{Location, MoveSpline, SplineState, UpdateResult};
pub use transform::TransportPathTransform;
