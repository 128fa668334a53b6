use bevy::{math::DVec3, prelude::*};
use bevy_prototype_debug_lines::DebugLines;
use sealevel_scene::{BoundingSphere, Cartesian3, Rectangle};

mod load_tileset_job;
mod tileset_json;

pub use load_tileset_job::{load_tileset, LoadTilesetJob, LoadedTileset};
pub use tileset_json::{Asset, BoundingVolume, Content, Tile, TilesetJson};

#[cfg(test)]
pub(crate) use load_tileset_job::tests::box_tileset_bytes;

/// A loaded dataset. Its content is not drawn, only its bounds.
#[derive(Component, Debug, Clone)]
pub struct Tileset {
    pub url: String,
    pub json: TilesetJson,
    pub bounding_sphere: BoundingSphere,
}

/// What the rest of the app needs to know about the dataset once it has
/// loaded. Created once and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetInfo {
    pub tileset: Entity,
    pub url: String,
    pub center: DVec3,
    pub bounding_sphere: BoundingSphere,
    /// Degrees.
    pub longitude: f64,
    /// Degrees.
    pub latitude: f64,
    pub terrain_height: f64,
    /// Overlay footprint in radians.
    pub rectangle: Rectangle,
}

impl TilesetInfo {
    pub fn new(tileset: Entity, loaded: &LoadedTileset) -> Self {
        Self {
            tileset,
            url: loaded.url.clone(),
            center: loaded.center,
            bounding_sphere: loaded.bounding_sphere,
            longitude: loaded.longitude,
            latitude: loaded.latitude,
            terrain_height: loaded.terrain_height,
            rectangle: loaded.rectangle,
        }
    }
}

impl From<LoadedTileset> for Tileset {
    fn from(loaded: LoadedTileset) -> Self {
        Self {
            url: loaded.url,
            json: loaded.json,
            bounding_sphere: loaded.bounding_sphere,
        }
    }
}

const BOUNDS_SEGMENTS: usize = 64;

/// Outlines each tileset's bounding sphere with three great circles.
pub fn draw_tileset_bounds(query: Query<&Tileset>, mut lines: ResMut<DebugLines>) {
    for tileset in &query {
        for (start, end) in sphere_outline(&tileset.bounding_sphere, BOUNDS_SEGMENTS) {
            lines.line_colored(start.as_vec3(), end.as_vec3(), 0.0, Color::ORANGE);
        }
    }
}

fn sphere_outline(sphere: &BoundingSphere, segments: usize) -> Vec<(DVec3, DVec3)> {
    let axes = [
        (DVec3::UNIT_X, DVec3::UNIT_Y),
        (DVec3::UNIT_Y, DVec3::UNIT_Z),
        (DVec3::UNIT_Z, DVec3::UNIT_X),
    ];
    let point = |a: DVec3, b: DVec3, i: usize| {
        let angle = std::f64::consts::TAU * i as f64 / segments as f64;
        sphere.center + (a * angle.cos() + b * angle.sin()).multiply_by_scalar(sphere.radius)
    };
    axes.iter()
        .flat_map(|&(a, b)| (0..segments).map(move |i| (point(a, b, i), point(a, b, i + 1))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_points_lie_on_the_sphere() {
        let sphere = BoundingSphere::new(DVec3::new(10.0, -4.0, 2.0), 250.0);
        let segments = sphere_outline(&sphere, 16);
        assert_eq!(segments.len(), 48);
        for (start, end) in segments {
            assert!((start.distance(sphere.center) - 250.0).abs() < 1e-6);
            assert!((end.distance(sphere.center) - 250.0).abs() < 1e-6);
        }
    }
}
