use bevy::math::DVec3;
use serde::{Deserialize, Serialize};

use crate::ellipsoid::Ellipsoid;

/// A geodetic position. Angles are radians unless a constructor says otherwise.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub height: f64,
}

impl Cartographic {
    pub const ZERO: Cartographic = Cartographic {
        longitude: 0.0,
        latitude: 0.0,
        height: 0.0,
    };
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Cartographic {
            longitude,
            latitude,
            height,
        }
    }
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Cartographic {
            longitude: longitude.to_radians(),
            latitude: latitude.to_radians(),
            height,
        }
    }
    pub fn to_degrees(&self) -> Self {
        Cartographic {
            longitude: self.longitude.to_degrees(),
            latitude: self.latitude.to_degrees(),
            height: self.height,
        }
    }
    pub fn to_radians(&self) -> Self {
        Cartographic {
            longitude: self.longitude.to_radians(),
            latitude: self.latitude.to_radians(),
            height: self.height,
        }
    }
    /// Returns `None` for positions too close to the ellipsoid center.
    pub fn from_cartesian(cartesian: DVec3, ellipsoid: Option<&Ellipsoid>) -> Option<Self> {
        ellipsoid
            .unwrap_or(&Ellipsoid::WGS84)
            .cartesian_to_cartographic(&cartesian)
    }
    pub fn to_cartesian(&self, ellipsoid: Option<&Ellipsoid>) -> DVec3 {
        ellipsoid
            .unwrap_or(&Ellipsoid::WGS84)
            .cartographic_to_cartesian(self)
    }
    pub fn equals_epsilon(&self, right: &Cartographic, epsilon: f64) -> bool {
        (self.longitude - right.longitude).abs() <= epsilon
            && (self.latitude - right.latitude).abs() <= epsilon
            && (self.height - right.height).abs() <= epsilon
    }
}
