use std::f64::consts::{FRAC_PI_2, PI, TAU};

use bevy::math::DVec3;
use serde::{Deserialize, Serialize};

use crate::{ellipsoid::Ellipsoid, math::*};

/// A two dimensional region given by longitude and latitude.
///
/// Math on a rectangle expects radians; configuration files carry degrees and
/// convert with [`Rectangle::to_radians`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Rectangle {
    pub const MAX_VALUE: Rectangle = Rectangle {
        west: -PI,
        south: -FRAC_PI_2,
        east: PI,
        north: FRAC_PI_2,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.to_radians(),
            south: south.to_radians(),
            east: east.to_radians(),
            north: north.to_radians(),
        }
    }
    pub fn to_radians(&self) -> Self {
        Rectangle::from_degrees(self.west, self.south, self.east, self.north)
    }
    pub fn to_degrees(&self) -> Self {
        Self {
            west: self.west.to_degrees(),
            south: self.south.to_degrees(),
            east: self.east.to_degrees(),
            north: self.north.to_degrees(),
        }
    }
    pub fn compute_width(&self) -> f64 {
        let mut east = self.east;
        if east < self.west {
            east += TAU;
        }
        east - self.west
    }
    pub fn compute_height(&self) -> f64 {
        self.north - self.south
    }
    pub fn center(&self) -> Cartographic {
        let mut east = self.east;
        if east < self.west {
            east += TAU;
        }
        let longitude = negative_pi_to_pi((self.west + east) * 0.5);
        let latitude = (self.south + self.north) * 0.5;
        Cartographic::new(longitude, latitude, 0.0)
    }
    pub fn contains(&self, cartographic: &Cartographic) -> bool {
        let mut longitude = cartographic.longitude;
        let latitude = cartographic.latitude;
        let west = self.west;
        let mut east = self.east;
        if east < west {
            east += TAU;
            if longitude < 0.0 {
                longitude += TAU;
            }
        }
        (longitude > west || equals_epsilon(longitude, west, Some(EPSILON14), None))
            && (longitude < east || equals_epsilon(longitude, east, Some(EPSILON14), None))
            && latitude >= self.south
            && latitude <= self.north
    }
    /// Interpolates a position inside the rectangle; `u` runs west to east and
    /// `v` south to north, both in `[0, 1]`.
    pub fn interpolate(&self, u: f64, v: f64, height: f64) -> Cartographic {
        let longitude = negative_pi_to_pi(self.west + u * self.compute_width());
        let latitude = lerp(self.south, self.north, v);
        Cartographic::new(longitude, latitude, height)
    }
    /// Samples the corners, edge midpoints and center of the rectangle at
    /// `surface_height`.
    pub fn subsample(&self, ellipsoid: Option<&Ellipsoid>, surface_height: f64) -> Vec<DVec3> {
        let ellipsoid = ellipsoid.unwrap_or(&Ellipsoid::WGS84);
        let mut positions = Vec::with_capacity(9);
        for v in [0.0, 0.5, 1.0] {
            for u in [0.0, 0.5, 1.0] {
                positions.push(
                    ellipsoid.cartographic_to_cartesian(&self.interpolate(u, v, surface_height)),
                );
            }
        }
        if self.south < 0.0 && self.north > 0.0 {
            let mut equator = self.center();
            equator.latitude = 0.0;
            equator.height = surface_height;
            positions.push(ellipsoid.cartographic_to_cartesian(&equator));
        }
        positions
    }
    pub fn equals_epsilon(&self, right: &Rectangle, absolute_epsilon: f64) -> bool {
        (self.west - right.west).abs() <= absolute_epsilon
            && (self.south - right.south).abs() <= absolute_epsilon
            && (self.east - right.east).abs() <= absolute_epsilon
            && (self.north - right.north).abs() <= absolute_epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hong_kong() -> Rectangle {
        Rectangle::from_degrees(113.8, 22.15, 114.45, 22.6)
    }

    #[test]
    fn degrees_convert_both_ways() {
        let rectangle = hong_kong();
        assert!(rectangle
            .to_degrees()
            .equals_epsilon(&Rectangle::new(113.8, 22.15, 114.45, 22.6), EPSILON10));
    }

    #[test]
    fn center_and_contains() {
        let rectangle = hong_kong();
        let center = rectangle.center().to_degrees();
        assert!((center.longitude - 114.125).abs() < EPSILON10);
        assert!((center.latitude - 22.375).abs() < EPSILON10);
        assert!(rectangle.contains(&Cartographic::from_degrees(114.0, 22.3, 0.0)));
        assert!(!rectangle.contains(&Cartographic::from_degrees(114.0, 22.7, 0.0)));
    }

    #[test]
    fn width_wraps_the_antimeridian() {
        let rectangle = Rectangle::from_degrees(170.0, -10.0, -170.0, 10.0);
        assert!((rectangle.compute_width() - 20.0_f64.to_radians()).abs() < EPSILON10);
        assert!(rectangle.contains(&Cartographic::from_degrees(-175.0, 0.0, 0.0)));
        assert!(rectangle.contains(&Cartographic::from_degrees(175.0, 0.0, 0.0)));
        assert!(!rectangle.contains(&Cartographic::from_degrees(0.0, 0.0, 0.0)));
    }

    #[test]
    fn subsample_respects_height() {
        let positions = hong_kong().subsample(None, 100.0);
        assert_eq!(positions.len(), 9);
        for position in positions {
            let cartographic = Cartographic::from_cartesian(position, None).expect("valid");
            assert!((cartographic.height - 100.0).abs() < EPSILON5);
        }
    }

    #[test]
    fn deserializes_from_json_degrees() {
        let rectangle: Rectangle =
            serde_json::from_str(r#"{"west":113.8,"south":22.15,"east":114.45,"north":22.6}"#)
                .expect("valid json");
        assert_eq!(rectangle, Rectangle::new(113.8, 22.15, 114.45, 22.6));
    }
}
