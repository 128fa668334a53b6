use std::f64::consts::FRAC_PI_2;

use bevy::math::{DMat3, DMat4, DQuat, DVec3};

use super::{equals_epsilon, HeadingPitchRoll, HeadingPitchRollQuaternion, EPSILON14};
use crate::ellipsoid::Ellipsoid;

/// Local frame at `origin` whose axes point east, north and up.
pub fn east_north_up_to_fixed_frame(origin: &DVec3, ellipsoid: Option<&Ellipsoid>) -> DMat4 {
    let (east, north, up) = if equals_epsilon(origin.x, 0.0, Some(EPSILON14), None)
        && equals_epsilon(origin.y, 0.0, Some(EPSILON14), None)
    {
        // center of the earth or a pole
        let sign = if origin.z < 0.0 { -1.0 } else { 1.0 };
        (
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(-sign, 0.0, 0.0),
            DVec3::new(0.0, 0.0, sign),
        )
    } else {
        let ellipsoid = ellipsoid.unwrap_or(&Ellipsoid::WGS84);
        let up = ellipsoid.geodetic_surface_normal(origin).unwrap_or(DVec3::Z);
        let east = DVec3::new(-origin.y, origin.x, 0.0).normalize();
        let north = up.cross(east);
        (east, north, up)
    };
    DMat4::from_cols(
        east.extend(0.0),
        north.extend(0.0),
        up.extend(0.0),
        origin.extend(1.0),
    )
}

/// World-space view direction and up vector of a camera placed at `position`
/// and oriented by `hpr` relative to the local east-north-up frame.
pub fn heading_pitch_roll_to_direction_up(
    position: &DVec3,
    hpr: &HeadingPitchRoll,
    ellipsoid: Option<&Ellipsoid>,
) -> (DVec3, DVec3) {
    let enu = DMat3::from_mat4(east_north_up_to_fixed_frame(position, ellipsoid));
    let mut local = *hpr;
    local.heading -= FRAC_PI_2;
    let rotation = DMat3::from_quat(DQuat::from_heading_pitch_roll(&local));
    let direction = enu * rotation.col(0);
    let up = enu * rotation.col(2);
    (direction.normalize(), up.normalize())
}
