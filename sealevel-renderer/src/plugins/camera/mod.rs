use std::f64::consts::{FRAC_PI_2, FRAC_PI_3};

use bevy::{math::DVec3, prelude::*};
use sealevel_scene::{
    heading_pitch_roll_to_direction_up, lerp, negative_pi_to_pi, BoundingSphere, Cartesian3,
    Cartographic, Ellipsoid, HeadingPitchRoll, Rectangle,
};

pub struct Plugin;

impl bevy::app::Plugin for Plugin {
    fn build(&self, app: &mut App) {
        app.add_event::<FlyTo>()
            .add_event::<HomeCommand>()
            .init_resource::<HomeNavigation>()
            .add_systems(
                Update,
                (
                    handle_home_commands,
                    start_camera_flights,
                    apply_deferred,
                    advance_camera_flights,
                    sync_camera_transforms,
                )
                    .chain(),
            );
    }
}

/// Camera pose in earth-fixed coordinates, orientation relative to the local
/// east-north-up frame.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct GlobeCamera {
    pub position: DVec3,
    pub orientation: HeadingPitchRoll,
}

impl Default for GlobeCamera {
    fn default() -> Self {
        let view = default_home_view();
        Self {
            position: view.destination,
            orientation: view.orientation,
        }
    }
}

impl GlobeCamera {
    pub const DEFAULT_VIEW_RECTANGLE: Rectangle = Rectangle {
        west: -1.6580627893946132,
        south: -0.3490658503988659,
        east: -1.2217304763960306,
        north: 1.5707963267948966,
    };
    pub const DEFAULT_VIEW_FACTOR: f64 = 0.5;
    pub const FIELD_OF_VIEW: f64 = FRAC_PI_3;

    pub fn direction_up(&self) -> (DVec3, DVec3) {
        heading_pitch_roll_to_direction_up(&self.position, &self.orientation, None)
    }

    pub fn cartographic(&self) -> Option<Cartographic> {
        Cartographic::from_cartesian(self.position, None)
    }

    pub fn transform(&self) -> Transform {
        let (direction, up) = self.direction_up();
        Transform::from_translation(self.position.as_vec3())
            .looking_to(direction.as_vec3(), up.as_vec3())
    }
}

/// Frames [`GlobeCamera::DEFAULT_VIEW_RECTANGLE`] looking straight down.
pub fn default_home_view() -> FlyTo {
    let rectangle = GlobeCamera::DEFAULT_VIEW_RECTANGLE;
    let sphere = BoundingSphere::from_rectangle_3d(&rectangle, None, 0.0, 0.0);
    let center = rectangle.center();
    let surface = Ellipsoid::WGS84.cartographic_to_cartesian(&center);
    let normal = Ellipsoid::WGS84.geodetic_surface_normal_cartographic(&center);
    let distance = sphere.radius / (GlobeCamera::FIELD_OF_VIEW * 0.5).tan();
    let position = surface + normal.multiply_by_scalar(distance);
    let magnitude = position.magnitude() * (1.0 + GlobeCamera::DEFAULT_VIEW_FACTOR);
    FlyTo {
        destination: position.normalize().multiply_by_scalar(magnitude),
        orientation: HeadingPitchRoll::new(0.0, -FRAC_PI_2, 0.0),
        duration: 1.5,
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    pub destination: DVec3,
    pub orientation: HeadingPitchRoll,
    /// Seconds; zero or less jumps immediately.
    pub duration: f64,
}

#[derive(Event, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HomeCommand;

/// Where [`HomeCommand`] goes. Without an override the default view
/// rectangle is framed.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct HomeNavigation {
    pub override_view: Option<FlyTo>,
}

impl HomeNavigation {
    pub fn target(&self) -> FlyTo {
        self.override_view.unwrap_or_else(default_home_view)
    }
}

/// An in-progress [`FlyTo`]. Position is interpolated in geodetic space so
/// the camera travels over the surface rather than through it.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct CameraFlight {
    from: Cartographic,
    from_orientation: HeadingPitchRoll,
    to: Cartographic,
    destination: DVec3,
    to_orientation: HeadingPitchRoll,
    duration: f64,
    elapsed: f64,
}

impl CameraFlight {
    /// `None` when either end is too close to the center of the earth.
    pub fn new(camera: &GlobeCamera, fly_to: &FlyTo) -> Option<Self> {
        Some(Self {
            from: camera.cartographic()?,
            from_orientation: camera.orientation,
            to: Cartographic::from_cartesian(fly_to.destination, None)?,
            destination: fly_to.destination,
            to_orientation: fly_to.orientation,
            duration: fly_to.duration,
            elapsed: 0.0,
        })
    }

    pub fn advance(&mut self, seconds: f64) {
        self.elapsed = (self.elapsed + seconds).min(self.duration);
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn sample(&self) -> (DVec3, HeadingPitchRoll) {
        if self.is_finished() {
            return (self.destination, self.to_orientation);
        }
        let t = self.elapsed / self.duration;
        let s = t * t * (3.0 - 2.0 * t);
        let angle = |from: f64, to: f64| from + negative_pi_to_pi(to - from) * s;

        let position = Cartographic::new(
            angle(self.from.longitude, self.to.longitude),
            lerp(self.from.latitude, self.to.latitude, s),
            lerp(self.from.height, self.to.height, s),
        );
        let orientation = HeadingPitchRoll::new(
            angle(self.from_orientation.heading, self.to_orientation.heading),
            lerp(self.from_orientation.pitch, self.to_orientation.pitch, s),
            angle(self.from_orientation.roll, self.to_orientation.roll),
        );
        (position.to_cartesian(None), orientation)
    }
}

fn handle_home_commands(
    mut home_commands: EventReader<HomeCommand>,
    home: Res<HomeNavigation>,
    mut fly_to: EventWriter<FlyTo>,
) {
    for _ in home_commands.iter() {
        fly_to.send(home.target());
    }
}

fn start_camera_flights(
    mut commands: Commands,
    mut fly_to: EventReader<FlyTo>,
    mut cameras: Query<(Entity, &mut GlobeCamera)>,
) {
    for fly_to in fly_to.iter() {
        for (entity, mut camera) in &mut cameras {
            let flight = if fly_to.duration > 0.0 {
                CameraFlight::new(&camera, fly_to)
            } else {
                None
            };
            match flight {
                Some(flight) => {
                    commands.entity(entity).insert(flight);
                }
                None => {
                    camera.position = fly_to.destination;
                    camera.orientation = fly_to.orientation;
                    commands.entity(entity).remove::<CameraFlight>();
                }
            }
        }
    }
}

fn advance_camera_flights(
    mut commands: Commands,
    time: Res<Time>,
    mut cameras: Query<(Entity, &mut GlobeCamera, &mut CameraFlight)>,
) {
    for (entity, mut camera, mut flight) in &mut cameras {
        flight.advance(time.delta_seconds_f64());
        let (position, orientation) = flight.sample();
        camera.position = position;
        camera.orientation = orientation;
        if flight.is_finished() {
            commands.entity(entity).remove::<CameraFlight>();
        }
    }
}

fn sync_camera_transforms(mut cameras: Query<(&GlobeCamera, &mut Transform), Changed<GlobeCamera>>) {
    for (camera, mut transform) in &mut cameras {
        *transform = camera.transform();
    }
}

/// `H` flies home.
pub fn keyboard_home(keys: Res<Input<KeyCode>>, mut home: EventWriter<HomeCommand>) {
    if keys.just_pressed(KeyCode::H) {
        home.send(HomeCommand);
    }
}
