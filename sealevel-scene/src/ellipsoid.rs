use bevy::math::DVec3;

use crate::math::{Cartesian3, Cartographic, EPSILON1, EPSILON12};

/// A quadratic surface defined in cartesian coordinates by
/// `(x / a)^2 + (y / b)^2 + (z / c)^2 = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub radii: DVec3,
    pub radii_squared: DVec3,
    pub one_over_radii: DVec3,
    pub one_over_radii_squared: DVec3,
    pub minimum_radius: f64,
    pub maximum_radius: f64,
    pub center_tolerance_squared: f64,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid::new(6378137.0, 6378137.0, 6356752.3142451793);
    pub const UNIT_SPHERE: Ellipsoid = Ellipsoid::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Ellipsoid {
            radii: DVec3::new(x, y, z),
            radii_squared: DVec3::new(x * x, y * y, z * z),
            one_over_radii: DVec3::new(1.0 / x, 1.0 / y, 1.0 / z),
            one_over_radii_squared: DVec3::new(1.0 / (x * x), 1.0 / (y * y), 1.0 / (z * z)),
            minimum_radius: if x < y {
                if x < z {
                    x
                } else {
                    z
                }
            } else if y < z {
                y
            } else {
                z
            },
            maximum_radius: if x > y {
                if x > z {
                    x
                } else {
                    z
                }
            } else if y > z {
                y
            } else {
                z
            },
            center_tolerance_squared: EPSILON1,
        }
    }
    pub fn geodetic_surface_normal_cartographic(&self, cartographic: &Cartographic) -> DVec3 {
        let cos_latitude = cartographic.latitude.cos();
        DVec3::new(
            cos_latitude * cartographic.longitude.cos(),
            cos_latitude * cartographic.longitude.sin(),
            cartographic.latitude.sin(),
        )
        .normalize()
    }

    /// `None` when `cartesian` is (nearly) the ellipsoid center.
    pub fn geodetic_surface_normal(&self, cartesian: &DVec3) -> Option<DVec3> {
        if cartesian.abs_diff_eq(DVec3::ZERO, crate::math::EPSILON14) {
            return None;
        }
        Some(
            cartesian
                .multiply_components(&self.one_over_radii_squared)
                .normalize(),
        )
    }

    pub fn cartographic_to_cartesian(&self, cartographic: &Cartographic) -> DVec3 {
        let n = self.geodetic_surface_normal_cartographic(cartographic);
        let k = self.radii_squared.multiply_components(&n);
        let gamma = n.dot(k).sqrt();
        k.divide_by_scalar(gamma) + n.multiply_by_scalar(cartographic.height)
    }

    pub fn cartesian_to_cartographic(&self, cartesian: &DVec3) -> Option<Cartographic> {
        let p = self.scale_to_geodetic_surface(cartesian)?;
        let n = self.geodetic_surface_normal(&p)?;
        let h = *cartesian - p;
        let longitude = n.y.atan2(n.x);
        let latitude = n.z.asin();
        let height = h.dot(*cartesian).signum() * h.magnitude();
        Some(Cartographic::new(longitude, latitude, height))
    }

    /// Projects `cartesian` onto the surface along the geodetic normal using
    /// Newton's method.
    pub fn scale_to_geodetic_surface(&self, cartesian: &DVec3) -> Option<DVec3> {
        let one_over_radii = self.one_over_radii;
        let one_over_radii_squared = self.one_over_radii_squared;

        let x2 = cartesian.x * cartesian.x * one_over_radii.x * one_over_radii.x;
        let y2 = cartesian.y * cartesian.y * one_over_radii.y * one_over_radii.y;
        let z2 = cartesian.z * cartesian.z * one_over_radii.z * one_over_radii.z;

        let squared_norm = x2 + y2 + z2;
        let ratio = (1.0 / squared_norm).sqrt();

        // initial approximation: the geocentric projection
        let intersection = cartesian.multiply_by_scalar(ratio);

        if squared_norm < self.center_tolerance_squared {
            return if ratio.is_finite() {
                Some(intersection)
            } else {
                None
            };
        }

        let gradient = DVec3::new(
            intersection.x * one_over_radii_squared.x * 2.0,
            intersection.y * one_over_radii_squared.y * 2.0,
            intersection.z * one_over_radii_squared.z * 2.0,
        );

        let mut lambda = ((1.0 - ratio) * cartesian.magnitude()) / (0.5 * gradient.magnitude());
        let mut correction = 0.0;
        let mut multiplier;

        loop {
            lambda -= correction;

            multiplier = DVec3::new(
                1.0 / (1.0 + lambda * one_over_radii_squared.x),
                1.0 / (1.0 + lambda * one_over_radii_squared.y),
                1.0 / (1.0 + lambda * one_over_radii_squared.z),
            );
            let multiplier2 = multiplier.multiply_components(&multiplier);
            let multiplier3 = multiplier2.multiply_components(&multiplier);

            let func = x2 * multiplier2.x + y2 * multiplier2.y + z2 * multiplier2.z - 1.0;
            let denominator = x2 * multiplier3.x * one_over_radii_squared.x
                + y2 * multiplier3.y * one_over_radii_squared.y
                + z2 * multiplier3.z * one_over_radii_squared.z;
            let derivative = -2.0 * denominator;
            correction = func / derivative;

            if func.abs() <= EPSILON12 {
                break;
            }
        }

        Some(cartesian.multiply_components(&multiplier))
    }
}
