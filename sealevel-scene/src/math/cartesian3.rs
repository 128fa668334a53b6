use bevy::math::DVec3;

use super::equals_epsilon;
use crate::ellipsoid::Ellipsoid;

/// Cesium-flavoured helpers on top of [`DVec3`], which is used for every
/// earth-centered, earth-fixed position in the workspace.
pub trait Cartesian3 {
    const ZERO: DVec3 = DVec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    const UNIT_X: DVec3 = DVec3 {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    };
    const UNIT_Y: DVec3 = DVec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    const UNIT_Z: DVec3 = DVec3 {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };
    fn from_radians(
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
        radii_squared: Option<DVec3>,
    ) -> DVec3;
    fn from_degrees(
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
        radii_squared: Option<DVec3>,
    ) -> DVec3;
    /// Converts a flat `[lon, lat, lon, lat, ...]` list in degrees.
    fn from_degrees_array(coordinates: &[f64], radii_squared: Option<DVec3>) -> Vec<DVec3>;
    fn equals_epsilon(
        &self,
        right: DVec3,
        relative_epsilon: Option<f64>,
        absolute_epsilon: Option<f64>,
    ) -> bool;
    fn multiply_components(&self, right: &DVec3) -> DVec3;
    fn multiply_by_scalar(&self, scalar: f64) -> DVec3;
    fn divide_by_scalar(&self, scalar: f64) -> DVec3;
    fn magnitude(&self) -> f64;
    fn magnitude_squared(&self) -> f64;
    fn maximum_component(&self) -> f64;
}

impl Cartesian3 for DVec3 {
    fn from_radians(
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
        radii_squared: Option<DVec3>,
    ) -> DVec3 {
        let radii_squared = radii_squared.unwrap_or(Ellipsoid::WGS84.radii_squared);
        let height = height.unwrap_or(0.0);
        let cos_latitude = latitude.cos();
        let n = DVec3::new(
            cos_latitude * longitude.cos(),
            cos_latitude * longitude.sin(),
            latitude.sin(),
        )
        .normalize();
        let k = radii_squared.multiply_components(&n);
        let gamma = n.dot(k).sqrt();
        k.divide_by_scalar(gamma) + n.multiply_by_scalar(height)
    }
    fn from_degrees(
        longitude: f64,
        latitude: f64,
        height: Option<f64>,
        radii_squared: Option<DVec3>,
    ) -> DVec3 {
        DVec3::from_radians(
            longitude.to_radians(),
            latitude.to_radians(),
            height,
            radii_squared,
        )
    }
    fn from_degrees_array(coordinates: &[f64], radii_squared: Option<DVec3>) -> Vec<DVec3> {
        coordinates
            .chunks_exact(2)
            .map(|pair| DVec3::from_degrees(pair[0], pair[1], None, radii_squared))
            .collect()
    }
    fn equals_epsilon(
        &self,
        right: DVec3,
        relative_epsilon: Option<f64>,
        absolute_epsilon: Option<f64>,
    ) -> bool {
        self.eq(&right)
            || equals_epsilon(self.x, right.x, relative_epsilon, absolute_epsilon)
                && equals_epsilon(self.y, right.y, relative_epsilon, absolute_epsilon)
                && equals_epsilon(self.z, right.z, relative_epsilon, absolute_epsilon)
    }
    fn multiply_components(&self, right: &DVec3) -> DVec3 {
        DVec3::new(self.x * right.x, self.y * right.y, self.z * right.z)
    }
    fn multiply_by_scalar(&self, scalar: f64) -> DVec3 {
        DVec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
    fn divide_by_scalar(&self, scalar: f64) -> DVec3 {
        DVec3::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
    fn magnitude(&self) -> f64 {
        self.length()
    }
    fn magnitude_squared(&self) -> f64 {
        self.length_squared()
    }
    fn maximum_component(&self) -> f64 {
        self.x.max(self.y).max(self.z)
    }
}
