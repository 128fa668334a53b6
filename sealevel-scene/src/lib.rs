#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::indexing_slicing,
    clippy::expect_used
)]

mod bounding_sphere;
mod ellipsoid;
mod geographic_tiling_scheme;
mod math;
mod rectangle;

pub use bounding_sphere::*;
pub use ellipsoid::*;
pub use geographic_tiling_scheme::*;
pub use math::*;
pub use rectangle::*;
