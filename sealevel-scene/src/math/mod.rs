use std::f64::consts::{PI, TAU};

mod cartesian3;
mod cartographic;
mod heading_pitch_roll;
mod quaternion;
mod transform;

pub use cartesian3::*;
pub use cartographic::*;
pub use heading_pitch_roll::*;
pub use quaternion::*;
pub use transform::*;

pub const EPSILON1: f64 = 0.1;
pub const EPSILON2: f64 = 0.01;
pub const EPSILON3: f64 = 0.001;
pub const EPSILON5: f64 = 0.00001;
pub const EPSILON6: f64 = 0.000001;
pub const EPSILON7: f64 = 0.0000001;
pub const EPSILON10: f64 = 0.0000000001;
pub const EPSILON11: f64 = 0.00000000001;
pub const EPSILON12: f64 = 0.000000000001;
pub const EPSILON14: f64 = 0.00000000000001;
pub const EPSILON15: f64 = 0.000000000000001;

pub const RADIANS_PER_DEGREE: f64 = PI / 180.0;
pub const DEGREES_PER_RADIAN: f64 = 180.0 / PI;

/// Compares two numbers using an absolute tolerance, falling back to a
/// tolerance relative to the larger magnitude.
///
/// When `absolute_epsilon` is omitted it defaults to `relative_epsilon`.
pub fn equals_epsilon(
    left: f64,
    right: f64,
    relative_epsilon: Option<f64>,
    absolute_epsilon: Option<f64>,
) -> bool {
    let relative_epsilon = relative_epsilon.unwrap_or(0.0);
    let absolute_epsilon = absolute_epsilon.unwrap_or(relative_epsilon);
    let abs_diff = (left - right).abs();
    abs_diff <= absolute_epsilon || abs_diff <= relative_epsilon * left.abs().max(right.abs())
}

pub fn negative_pi_to_pi(angle: f64) -> f64 {
    if (-PI..=PI).contains(&angle) {
        return angle;
    }
    zero_to_two_pi(angle + PI) - PI
}

pub fn zero_to_two_pi(angle: f64) -> f64 {
    if (0.0..=TAU).contains(&angle) {
        return angle;
    }
    let modulo = angle.rem_euclid(TAU);
    if modulo.abs() < EPSILON14 && angle.abs() > EPSILON14 {
        return TAU;
    }
    modulo
}

pub fn lerp(start: f64, end: f64, t: f64) -> f64 {
    (1.0 - t) * start + t * end
}
