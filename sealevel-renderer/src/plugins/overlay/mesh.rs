use bevy::{
    math::DVec3,
    prelude::*,
    render::{mesh::Indices, render_resource::PrimitiveTopology},
};
use bevy_prototype_debug_lines::DebugLines;
use sealevel_scene::{Cartesian3, Ellipsoid};

use super::PolygonGraphics;

/// Grid cells along each side of the rectangle.
const GRANULARITY: usize = 16;

/// Triangles of an extruded rectangle, positions relative to `origin`.
#[derive(Debug, Clone, Default)]
pub struct PolygonGeometry {
    pub origin: DVec3,
    pub positions: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub indices: Vec<u32>,
}

impl PolygonGeometry {
    /// Top and bottom follow the rectangle's lines of constant latitude and
    /// longitude. Walls are only emitted when the polygon has thickness.
    pub fn from_graphics(graphics: &PolygonGraphics, granularity: usize) -> Self {
        let granularity = granularity.max(1);
        let rectangle = graphics.rectangle;
        let ellipsoid = Ellipsoid::WGS84;
        let bottom = graphics.height.min(graphics.extruded_height);
        let top = graphics.height.max(graphics.extruded_height);
        let origin = ellipsoid.cartographic_to_cartesian(&rectangle.center());

        let mut geometry = Self {
            origin,
            ..Default::default()
        };
        let step = 1.0 / granularity as f64;
        let point = |i: usize, j: usize, height: f64| {
            rectangle.interpolate(i as f64 * step, j as f64 * step, height)
        };

        geometry.push_grid(granularity, false, |i, j| point(i, j, top));
        if top > bottom {
            geometry.push_grid(granularity, true, |i, j| point(i, j, bottom));

            // counter-clockwise seen from above
            let mut ring = Vec::with_capacity(4 * granularity + 1);
            ring.extend((0..granularity).map(|i| (i, 0)));
            ring.extend((0..granularity).map(|j| (granularity, j)));
            ring.extend((0..granularity).map(|i| (granularity - i, granularity)));
            ring.extend((0..granularity).map(|j| (0, granularity - j)));
            ring.push((0, 0));
            for pair in ring.windows(2) {
                if let [(ai, aj), (bi, bj)] = pair {
                    let a_bottom = ellipsoid.cartographic_to_cartesian(&point(*ai, *aj, bottom));
                    let b_bottom = ellipsoid.cartographic_to_cartesian(&point(*bi, *bj, bottom));
                    let b_top = ellipsoid.cartographic_to_cartesian(&point(*bi, *bj, top));
                    let a_top = ellipsoid.cartographic_to_cartesian(&point(*ai, *aj, top));
                    geometry.push_quad([a_bottom, b_bottom, b_top, a_top]);
                }
            }
        }
        geometry
    }

    fn push_grid(
        &mut self,
        granularity: usize,
        facing_down: bool,
        point: impl Fn(usize, usize) -> sealevel_scene::Cartographic,
    ) {
        let ellipsoid = Ellipsoid::WGS84;
        let first = self.positions.len() as u32;
        let columns = granularity + 1;
        for j in 0..columns {
            for i in 0..columns {
                let cartographic = point(i, j);
                let normal = ellipsoid.geodetic_surface_normal_cartographic(&cartographic);
                self.positions
                    .push(ellipsoid.cartographic_to_cartesian(&cartographic) - self.origin);
                self.normals
                    .push(if facing_down { -normal } else { normal });
            }
        }
        let index = |i: usize, j: usize| first + (j * columns + i) as u32;
        for j in 0..granularity {
            for i in 0..granularity {
                let (sw, se, ne, nw) = (
                    index(i, j),
                    index(i + 1, j),
                    index(i + 1, j + 1),
                    index(i, j + 1),
                );
                if facing_down {
                    self.indices.extend([sw, ne, se, sw, nw, ne]);
                } else {
                    self.indices.extend([sw, se, ne, sw, ne, nw]);
                }
            }
        }
    }

    /// Corners in counter-clockwise order as seen from outside.
    fn push_quad(&mut self, corners: [DVec3; 4]) {
        let [a, b, c, _] = corners;
        let normal = (b - a).cross(c - a).normalize_or_zero();
        let first = self.positions.len() as u32;
        for corner in corners {
            self.positions.push(corner - self.origin);
            self.normals.push(normal);
        }
        self.indices
            .extend([first, first + 1, first + 2, first, first + 2, first + 3]);
    }

    pub fn to_mesh(&self) -> Mesh {
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.as_vec3().into()).collect();
        let normals: Vec<[f32; 3]> = self.normals.iter().map(|n| n.as_vec3().into()).collect();
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList);
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.set_indices(Some(Indices::U32(self.indices.clone())));
        mesh
    }
}

/// Gives freshly created polygons something to draw.
pub fn attach_polygon_meshes(
    mut commands: Commands,
    polygons: Query<(Entity, &PolygonGraphics), Added<PolygonGraphics>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (entity, graphics) in &polygons {
        let geometry = PolygonGeometry::from_graphics(graphics, GRANULARITY);
        let material = StandardMaterial {
            base_color: graphics.material,
            alpha_mode: AlphaMode::Blend,
            cull_mode: None,
            double_sided: true,
            unlit: true,
            ..default()
        };
        commands.entity(entity).insert(PbrBundle {
            mesh: meshes.add(geometry.to_mesh()),
            material: materials.add(material),
            transform: Transform::from_translation(geometry.origin.as_vec3()),
            ..default()
        });
    }
}

pub fn draw_polygon_outlines(polygons: Query<&PolygonGraphics>, mut lines: ResMut<DebugLines>) {
    for graphics in polygons.iter().filter(|graphics| graphics.outline) {
        let ring = &graphics.hierarchy;
        let normal_offset = |p: &DVec3, height: f64| {
            let normal = Ellipsoid::WGS84
                .geodetic_surface_normal(p)
                .unwrap_or(DVec3::ZERO);
            (*p + normal.multiply_by_scalar(height)).as_vec3()
        };
        for (index, start) in ring.iter().enumerate() {
            let Some(end) = ring.get((index + 1) % ring.len()) else {
                continue;
            };
            for height in [graphics.height, graphics.extruded_height] {
                lines.line_colored(
                    normal_offset(start, height),
                    normal_offset(end, height),
                    0.0,
                    graphics.outline_color,
                );
            }
            lines.line_colored(
                normal_offset(start, graphics.height),
                normal_offset(start, graphics.extruded_height),
                0.0,
                graphics.outline_color,
            );
        }
    }
}
