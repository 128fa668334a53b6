use bevy::math::{DMat3, DMat4, DVec3};

use crate::{ellipsoid::Ellipsoid, math::*, rectangle::Rectangle};

#[derive(Debug, Clone, PartialEq, Copy, Default)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Computes a tight-fitting sphere by running Ritter's algorithm and a
    /// naive box fit, keeping whichever is smaller.
    pub fn from_points(positions: &[DVec3]) -> Self {
        let Some(first) = positions.first() else {
            return Self::default();
        };

        let mut x_min = *first;
        let mut y_min = *first;
        let mut z_min = *first;
        let mut x_max = *first;
        let mut y_max = *first;
        let mut z_max = *first;

        for p in positions.iter().skip(1) {
            if p.x < x_min.x {
                x_min = *p;
            }
            if p.x > x_max.x {
                x_max = *p;
            }
            if p.y < y_min.y {
                y_min = *p;
            }
            if p.y > y_max.y {
                y_max = *p;
            }
            if p.z < z_min.z {
                z_min = *p;
            }
            if p.z > z_max.z {
                z_max = *p;
            }
        }

        let x_span = (x_max - x_min).magnitude_squared();
        let y_span = (y_max - y_min).magnitude_squared();
        let z_span = (z_max - z_min).magnitude_squared();

        let (mut diameter1, mut diameter2, mut max_span) = (x_min, x_max, x_span);
        if y_span > max_span {
            max_span = y_span;
            diameter1 = y_min;
            diameter2 = y_max;
        }
        if z_span > max_span {
            diameter1 = z_min;
            diameter2 = z_max;
        }

        let mut ritter_center = diameter1.midpoint(diameter2);
        let mut radius_squared = (diameter2 - ritter_center).magnitude_squared();
        let mut ritter_radius = radius_squared.sqrt();

        let min_box = DVec3::new(x_min.x, y_min.y, z_min.z);
        let max_box = DVec3::new(x_max.x, y_max.y, z_max.z);
        let naive_center = min_box.midpoint(max_box);

        let mut naive_radius = 0.0_f64;
        for p in positions {
            naive_radius = naive_radius.max((*p - naive_center).magnitude());

            let old_center_to_point_squared = (*p - ritter_center).magnitude_squared();
            if old_center_to_point_squared > radius_squared {
                let old_center_to_point = old_center_to_point_squared.sqrt();
                ritter_radius = (ritter_radius + old_center_to_point) * 0.5;
                radius_squared = ritter_radius * ritter_radius;
                let old_to_new = old_center_to_point - ritter_radius;
                ritter_center = (ritter_center * ritter_radius + *p * old_to_new)
                    / old_center_to_point;
            }
        }

        if ritter_radius < naive_radius {
            Self::new(ritter_center, ritter_radius)
        } else {
            Self::new(naive_center, naive_radius)
        }
    }

    /// Encloses `rectangle` (radians) between `minimum_height` and
    /// `maximum_height` above the ellipsoid.
    pub fn from_rectangle_3d(
        rectangle: &Rectangle,
        ellipsoid: Option<&Ellipsoid>,
        minimum_height: f64,
        maximum_height: f64,
    ) -> Self {
        let mut positions = rectangle.subsample(ellipsoid, minimum_height);
        positions.extend(rectangle.subsample(ellipsoid, maximum_height));
        Self::from_points(&positions)
    }

    /// Encloses an oriented box given by its center and the three half-axes
    /// stored as matrix columns.
    pub fn from_oriented_bounding_box(center: DVec3, half_axes: &DMat3) -> Self {
        let corner = half_axes.x_axis + half_axes.y_axis + half_axes.z_axis;
        Self::new(center, corner.magnitude())
    }

    /// Applies an affine transform; the radius grows by the largest axis scale.
    pub fn transform(&self, transform: &DMat4) -> Self {
        let center = transform.transform_point3(self.center);
        let scale = DVec3::new(
            transform.x_axis.truncate().magnitude(),
            transform.y_axis.truncate().magnitude(),
            transform.z_axis.truncate().magnitude(),
        );
        Self::new(center, self.radius * scale.maximum_component())
    }
}

trait Midpoint {
    fn midpoint(&self, right: DVec3) -> DVec3;
}

impl Midpoint for DVec3 {
    fn midpoint(&self, right: DVec3) -> DVec3 {
        (*self + right) * 0.5
    }
}
