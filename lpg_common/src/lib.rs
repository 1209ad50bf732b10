mod points;

pub mod helpers;
pub mod op;
mod secret;

pub use points::{Points, PointsConversionError, POINTS_UNIT};
pub use secret::Secret;
