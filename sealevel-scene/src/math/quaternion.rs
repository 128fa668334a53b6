use bevy::math::{DQuat, DVec3};

use super::HeadingPitchRoll;

pub trait HeadingPitchRollQuaternion {
    fn from_heading_pitch_roll(hpr: &HeadingPitchRoll) -> DQuat;
}

impl HeadingPitchRollQuaternion for DQuat {
    fn from_heading_pitch_roll(hpr: &HeadingPitchRoll) -> DQuat {
        let roll = DQuat::from_axis_angle(DVec3::X, hpr.roll);
        let pitch = DQuat::from_axis_angle(DVec3::Y, -hpr.pitch);
        let heading = DQuat::from_axis_angle(DVec3::Z, -hpr.heading);
        heading * (pitch * roll)
    }
}
