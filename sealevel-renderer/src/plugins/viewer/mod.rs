use std::f32::consts::FRAC_PI_2;

use bevy::{prelude::*, render::camera::Projection};
use bevy_egui::EguiPlugin;
use bevy_prototype_debug_lines::DebugLinesPlugin;
use sealevel_scene::Ellipsoid;

use crate::{
    config::SeaLevelConfig,
    plugins::{
        camera::{keyboard_home, GlobeCamera},
        overlay::{attach_polygon_meshes, draw_polygon_outlines},
        tileset::draw_tileset_bounds,
        ui::control_panel_system,
    },
};

/// Meters the globe surface sits below the ellipsoid so overlays at height 0
/// stay in front of it.
const GLOBE_SINK: f64 = 2.0;

pub struct Plugin;

impl bevy::app::Plugin for Plugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((EguiPlugin, DebugLinesPlugin::with_depth_test(true)))
            .insert_resource(ClearColor(Color::BLACK))
            .insert_resource(AmbientLight {
                color: Color::WHITE,
                brightness: 0.4,
            })
            .add_systems(Startup, setup)
            .add_systems(
                Update,
                (
                    control_panel_system,
                    keyboard_home,
                    attach_polygon_meshes,
                    draw_polygon_outlines,
                    draw_tileset_bounds.run_if(bounds_visible),
                ),
            );
    }
}

fn bounds_visible(config: Res<SeaLevelConfig>) -> bool {
    config.viewer.bounds_visible
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let radii = Ellipsoid::WGS84.radii;
    // uv sphere poles lie on +y, earth's on +z
    commands.spawn(PbrBundle {
        mesh: meshes.add(
            shape::UVSphere {
                radius: 1.0,
                sectors: 256,
                stacks: 128,
            }
            .into(),
        ),
        material: materials.add(StandardMaterial {
            base_color: Color::rgb(0.16, 0.32, 0.22),
            perceptual_roughness: 0.9,
            ..default()
        }),
        transform: Transform {
            scale: Vec3::new(
                (radii.x - GLOBE_SINK) as f32,
                (radii.z - GLOBE_SINK) as f32,
                (radii.y - GLOBE_SINK) as f32,
            ),
            rotation: Quat::from_rotation_x(FRAC_PI_2),
            ..default()
        },
        ..default()
    });

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 20000.0,
            ..default()
        },
        transform: Transform::from_xyz(1.0, 1.0, 1.0).looking_at(Vec3::ZERO, Vec3::Z),
        ..default()
    });

    let globe_camera = GlobeCamera::default();
    commands.spawn((
        Camera3dBundle {
            projection: Projection::Perspective(PerspectiveProjection {
                fov: GlobeCamera::FIELD_OF_VIEW as f32,
                near: 1.0,
                far: 1.0e8,
                ..default()
            }),
            transform: globe_camera.transform(),
            ..default()
        },
        globe_camera,
    ));
}
