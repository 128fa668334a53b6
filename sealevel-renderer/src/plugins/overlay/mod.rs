use std::collections::HashMap;

use bevy::{math::DVec3, prelude::*};
use sealevel_scene::{Cartesian3, Rectangle};

use crate::{config::SeaLevelConfig, plugins::bootstrap::SeaLevelContext};

mod mesh;

pub use mesh::{attach_polygon_meshes, draw_polygon_outlines, PolygonGeometry};

pub const SEA_LEVEL_ENTITY_ID: &str = "seaLevelEntity";
pub const SEA_LEVEL_ENTITY_NAME: &str = "Sea Level";

pub struct Plugin;

impl bevy::app::Plugin for Plugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SetSeaLevel>()
            .init_resource::<EntityCollection>()
            .add_systems(Update, apply_sea_level_commands);
    }
}

/// Replace the overlay with one extruded to this height, in meters.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SetSeaLevel(pub f64);

/// Marks the sea level overlay entity.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct SeaLevelOverlay;

#[derive(Component, Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId(pub String);

/// Entities addressable by a string id. The registry is updated as soon as
/// an entity is added or removed, ahead of the queued commands, so ids stay
/// unique within a frame.
#[derive(Resource, Debug, Default)]
pub struct EntityCollection {
    by_id: HashMap<String, Entity>,
}

impl EntityCollection {
    pub fn get_by_id(&self, id: &str) -> Option<Entity> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Spawns `bundle` under `id`, despawning whatever held the id before.
    pub fn add(&mut self, commands: &mut Commands, id: &str, bundle: impl Bundle) -> Entity {
        if self.remove_by_id(commands, id) {
            warn!("Entity id '{}' was already in use and has been replaced", id);
        }
        let entity = commands.spawn((EntityId(id.to_string()), bundle)).id();
        self.by_id.insert(id.to_string(), entity);
        entity
    }

    pub fn remove_by_id(&mut self, commands: &mut Commands, id: &str) -> bool {
        match self.by_id.remove(id) {
            Some(entity) => {
                commands.entity(entity).despawn_recursive();
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcType {
    None,
    Geodesic,
    Rhumb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationType {
    Terrain,
    Cesium3dTile,
    Both,
}

/// A flat polygon extruded between `height` and `extruded_height`.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct PolygonGraphics {
    /// Outer ring in earth-fixed coordinates.
    pub hierarchy: Vec<DVec3>,
    /// Radians.
    pub rectangle: Rectangle,
    pub height: f64,
    pub extruded_height: f64,
    pub material: Color,
    pub outline: bool,
    pub outline_color: Color,
    pub arc_type: ArcType,
    pub per_position_height: bool,
    pub classification_type: ClassificationType,
}

impl PolygonGraphics {
    /// The translucent light blue water body over `rectangle` (radians).
    pub fn sea_level(rectangle: &Rectangle, sea_level_height: f64) -> Self {
        let [west, south, east, north] = [
            rectangle.west,
            rectangle.south,
            rectangle.east,
            rectangle.north,
        ]
        .map(f64::to_degrees);
        let hierarchy = DVec3::from_degrees_array(
            &[west, south, east, south, east, north, west, north],
            None,
        );
        Self {
            hierarchy,
            rectangle: *rectangle,
            height: 0.0,
            extruded_height: sea_level_height,
            material: Color::rgba(0.678, 0.847, 0.902, 0.6),
            outline: true,
            outline_color: Color::rgba(1.0, 1.0, 1.0, 0.8),
            arc_type: ArcType::Rhumb,
            per_position_height: false,
            classification_type: ClassificationType::Terrain,
        }
    }
}

/// Replaces the overlay entity, whatever state it was in.
pub fn create_sea_level_polygon(
    commands: &mut Commands,
    entities: &mut EntityCollection,
    rectangle: &Rectangle,
    sea_level_height: f64,
) -> Entity {
    entities.remove_by_id(commands, SEA_LEVEL_ENTITY_ID);
    entities.add(
        commands,
        SEA_LEVEL_ENTITY_ID,
        (
            SeaLevelOverlay,
            Name::new(SEA_LEVEL_ENTITY_NAME),
            PolygonGraphics::sea_level(rectangle, sea_level_height),
        ),
    )
}

pub fn apply_sea_level_commands(
    mut commands: Commands,
    mut set_sea_level: EventReader<SetSeaLevel>,
    mut entities: ResMut<EntityCollection>,
    context: Res<SeaLevelContext>,
    config: Res<SeaLevelConfig>,
) {
    for SetSeaLevel(height) in set_sea_level.iter() {
        let Some(info) = context.tileset_info.as_ref() else {
            warn!("Ignoring sea level {} before the tileset is ready", height);
            continue;
        };
        if !height.is_finite() {
            warn!("Ignoring non-finite sea level {}", height);
            continue;
        }
        let height = config.slider.clamp(*height);
        create_sea_level_polygon(&mut commands, &mut entities, &info.rectangle, height);
        debug!("Sea level set to {} m", height);
    }
}

#[cfg(test)]
mod tests {
    use sealevel_scene::{Cartographic, EPSILON7};

    use super::*;

    fn hong_kong() -> Rectangle {
        Rectangle::from_degrees(113.8, 22.15, 114.45, 22.6)
    }

    fn overlays(app: &mut App) -> Vec<PolygonGraphics> {
        let mut query = app
            .world
            .query_filtered::<&PolygonGraphics, With<SeaLevelOverlay>>();
        query.iter(&app.world).cloned().collect()
    }

    #[test]
    fn sea_level_polygon_matches_the_rectangle() {
        let graphics = PolygonGraphics::sea_level(&hong_kong(), 7.5);
        assert_eq!(graphics.height, 0.0);
        assert_eq!(graphics.extruded_height, 7.5);
        assert_eq!(graphics.arc_type, ArcType::Rhumb);
        assert_eq!(graphics.classification_type, ClassificationType::Terrain);
        assert!(!graphics.per_position_height);
        assert!(graphics.outline);
        assert_eq!(graphics.material.a(), 0.6);
        assert_eq!(graphics.outline_color.a(), 0.8);
        assert_eq!(graphics.hierarchy.len(), 4);
        let north_west = Cartographic::from_cartesian(graphics.hierarchy[3], None)
            .expect("valid")
            .to_degrees();
        assert!((north_west.longitude - 113.8).abs() < EPSILON7);
        assert!((north_west.latitude - 22.6).abs() < EPSILON7);
    }

    #[test]
    fn recreating_in_one_frame_keeps_a_single_entity() {
        let mut app = App::new();
        app.init_resource::<EntityCollection>();
        let rectangle = hong_kong();
        app.add_systems(
            Update,
            move |mut commands: Commands, mut entities: ResMut<EntityCollection>| {
                for height in [1.0, 2.0, 3.0] {
                    create_sea_level_polygon(&mut commands, &mut entities, &rectangle, height);
                }
            },
        );
        app.update();

        let remaining = overlays(&mut app);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].extruded_height, 3.0);

        let entities = app.world.resource::<EntityCollection>();
        assert_eq!(entities.len(), 1);
        let entity = entities.get_by_id(SEA_LEVEL_ENTITY_ID).expect("registered");
        assert_eq!(
            app.world.get::<Name>(entity).map(|name| name.as_str()),
            Some(SEA_LEVEL_ENTITY_NAME)
        );
        assert_eq!(
            app.world.get::<EntityId>(entity),
            Some(&EntityId(SEA_LEVEL_ENTITY_ID.to_string()))
        );
    }

    #[test]
    fn removing_unknown_ids_is_a_no_op() {
        let mut app = App::new();
        app.init_resource::<EntityCollection>();
        app.add_systems(
            Update,
            |mut commands: Commands, mut entities: ResMut<EntityCollection>| {
                assert!(!entities.remove_by_id(&mut commands, "nothing"));
            },
        );
        app.update();
        assert!(app.world.resource::<EntityCollection>().is_empty());
    }
}
