mod flags;
mod speed;

pub use flags::MovementFlags;
pub use speed::{select_speed_category, SpeedCategory, SpeedTable};
