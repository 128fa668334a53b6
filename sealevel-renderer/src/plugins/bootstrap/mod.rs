use bevy::prelude::*;
use sealevel_jobs::{FinishedJobs, JobSpawner};

use crate::{
    config::{SeaLevelConfig, SEA_LEVEL_SLIDER_ID, SEA_LEVEL_VALUE_ID},
    error::SeaLevelError,
    fetch::FetcherResource,
    plugins::{
        camera::{FlyTo, HomeNavigation},
        overlay::{apply_sea_level_commands, create_sea_level_polygon, EntityCollection, SetSeaLevel},
        terrain::TerrainProviderResource,
        tileset::{LoadTilesetJob, Tileset, TilesetInfo},
        ui::{format_sea_level, UiElements, UiInputEvent},
    },
};

pub struct Plugin;

impl bevy::app::Plugin for Plugin {
    fn build(&self, app: &mut App) {
        app.add_state::<AppState>()
            .init_resource::<SeaLevelContext>()
            .add_systems(Startup, begin_initialization)
            .add_systems(
                Update,
                receive_loaded_tileset.run_if(in_state(AppState::LoadingTileset)),
            )
            .add_systems(OnEnter(AppState::Ready), finish_initialization)
            .add_systems(OnEnter(AppState::Failed), report_failure)
            .add_systems(
                Update,
                forward_slider_input
                    .run_if(in_state(AppState::Ready))
                    .before(apply_sea_level_commands),
            );
    }
}

#[derive(States, Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum AppState {
    #[default]
    Starting,
    LoadingTileset,
    Ready,
    Failed,
}

/// Initialization results shared by the systems that need them.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct SeaLevelContext {
    pub tileset_info: Option<TilesetInfo>,
    /// Id of the bound slider, if one was found.
    pub slider_id: Option<String>,
    /// Id of the bound readout, if one was found.
    pub readout_id: Option<String>,
}

fn begin_initialization(
    mut job_spawner: JobSpawner,
    mut home: ResMut<HomeNavigation>,
    mut next_state: ResMut<NextState<AppState>>,
    config: Res<SeaLevelConfig>,
    fetcher: Res<FetcherResource>,
    terrain_provider: Res<TerrainProviderResource>,
) {
    home.override_view = Some(FlyTo {
        destination: config.home.destination_cartesian(),
        orientation: config.home.orientation,
        duration: config.home.duration,
    });

    info!("Loading tileset {}", config.tileset_url);
    job_spawner.spawn(LoadTilesetJob {
        url: config.tileset_url.clone(),
        rectangle: config.rectangle_radians(),
        fetcher: fetcher.0.clone(),
        terrain_provider: terrain_provider.0.clone(),
    });
    next_state.set(AppState::LoadingTileset);
}

fn receive_loaded_tileset(
    mut commands: Commands,
    mut finished_jobs: ResMut<FinishedJobs>,
    mut context: ResMut<SeaLevelContext>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some(outcome) = finished_jobs.take_next::<LoadTilesetJob>() else {
        return;
    };
    match outcome {
        Ok(loaded) => {
            let tileset = commands.spawn(Tileset::from(loaded.clone())).id();
            context.tileset_info = Some(TilesetInfo::new(tileset, &loaded));
            next_state.set(AppState::Ready);
        }
        Err(e) => {
            error!("{}", e);
            error!("Failed to load tileset information");
            next_state.set(AppState::Failed);
        }
    }
}

fn finish_initialization(
    mut commands: Commands,
    mut entities: ResMut<EntityCollection>,
    mut elements: ResMut<UiElements>,
    mut context: ResMut<SeaLevelContext>,
    mut fly_to: EventWriter<FlyTo>,
    home: Res<HomeNavigation>,
    config: Res<SeaLevelConfig>,
) {
    let Some(info) = context.tileset_info.clone() else {
        error!("Reached the ready state without tileset information");
        return;
    };
    let initial = config.slider.clamp(config.slider.initial);

    create_sea_level_polygon(&mut commands, &mut entities, &info.rectangle, initial);

    let slider = &config.slider;
    if elements.bind_range(SEA_LEVEL_SLIDER_ID, slider.min, slider.max, slider.step, initial) {
        context.slider_id = Some(SEA_LEVEL_SLIDER_ID.to_string());
    } else {
        error!("{}", SeaLevelError::MissingUiElement(SEA_LEVEL_SLIDER_ID.to_string()));
    }
    if elements.set_text(SEA_LEVEL_VALUE_ID, format_sea_level(initial)) {
        context.readout_id = Some(SEA_LEVEL_VALUE_ID.to_string());
    } else {
        error!("{}", SeaLevelError::MissingUiElement(SEA_LEVEL_VALUE_ID.to_string()));
    }

    fly_to.send(FlyTo {
        duration: 0.0,
        ..home.target()
    });

    info!("Terrain height: {}", info.terrain_height);
    info!("Initial sea level (at {}): {}", initial, initial);
}

fn report_failure() {
    error!("Initialization stopped; the sea level overlay is unavailable");
}

fn forward_slider_input(
    mut inputs: EventReader<UiInputEvent>,
    mut elements: ResMut<UiElements>,
    mut set_sea_level: EventWriter<SetSeaLevel>,
    context: Res<SeaLevelContext>,
    config: Res<SeaLevelConfig>,
) {
    let Some(slider_id) = context.slider_id.as_deref() else {
        inputs.clear();
        return;
    };
    for input in inputs.iter().filter(|input| input.id == slider_id) {
        // the readout shows the height the overlay will actually use
        let shown = input
            .value
            .is_finite()
            .then(|| config.slider.clamp(input.value));
        if let (Some(readout_id), Some(shown)) = (context.readout_id.as_deref(), shown) {
            elements.set_text(readout_id, format_sea_level(shown));
        }
        set_sea_level.send(SetSeaLevel(input.value));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sealevel_scene::{Rectangle, EPSILON7};

    use super::*;
    use crate::{
        config::UiConfig,
        fetch::MemoryFetcher,
        plugins::{
            camera::GlobeCamera,
            overlay::{PolygonGraphics, SeaLevelOverlay},
            terrain::{
                tests::{FailingTerrainProvider, FlatTerrainProvider},
                TerrainProvider,
            },
            tileset::box_tileset_bytes,
        },
        SeaLevelPlugin,
    };

    const TILESET_URL: &str = "mem://hong-kong/tileset.json";

    fn config() -> SeaLevelConfig {
        SeaLevelConfig {
            tileset_url: TILESET_URL.to_string(),
            ..Default::default()
        }
    }

    fn app_with(
        config: SeaLevelConfig,
        fetcher: MemoryFetcher,
        terrain_provider: Arc<dyn TerrainProvider>,
    ) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(config)
            .insert_resource(FetcherResource(Arc::new(fetcher)))
            .insert_resource(TerrainProviderResource(terrain_provider))
            .add_plugins(SeaLevelPlugin);
        app.world.spawn(GlobeCamera::default());
        app
    }

    fn hong_kong_app() -> App {
        app_with(
            config(),
            MemoryFetcher::new().with(TILESET_URL, box_tileset_bytes(114.17, 22.3)),
            Arc::new(FlatTerrainProvider(31.0)),
        )
    }

    fn state(app: &App) -> AppState {
        *app.world.resource::<State<AppState>>().get()
    }

    fn run_until_settled(app: &mut App) -> AppState {
        for _ in 0..1000 {
            app.update();
            match state(app) {
                AppState::Ready | AppState::Failed => {
                    app.update();
                    return state(app);
                }
                _ => std::thread::sleep(std::time::Duration::from_millis(1)),
            }
        }
        panic!("initialization did not settle");
    }

    fn overlays(app: &mut App) -> Vec<PolygonGraphics> {
        let mut query = app
            .world
            .query_filtered::<&PolygonGraphics, With<SeaLevelOverlay>>();
        query.iter(&app.world).cloned().collect()
    }

    fn move_slider(app: &mut App, values: &[f64]) {
        let mut events = app.world.resource_mut::<Events<UiInputEvent>>();
        for value in values {
            events.send(UiInputEvent {
                id: SEA_LEVEL_SLIDER_ID.to_string(),
                value: *value,
            });
        }
        app.update();
    }

    #[test]
    fn ready_state_shows_the_initial_overlay() {
        let mut app = hong_kong_app();
        assert_eq!(run_until_settled(&mut app), AppState::Ready);

        let remaining = overlays(&mut app);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].height, 0.0);
        assert_eq!(remaining[0].extruded_height, 0.0);

        let elements = app.world.resource::<UiElements>();
        assert_eq!(elements.range_value(SEA_LEVEL_SLIDER_ID), Some(0.0));
        assert_eq!(elements.text(SEA_LEVEL_VALUE_ID), Some("0.0 m"));

        let context = app.world.resource::<SeaLevelContext>();
        let info = context.tileset_info.as_ref().expect("loaded");
        assert_eq!(info.terrain_height, 31.0);
        assert!((info.longitude - 114.17).abs() < EPSILON7);
        assert!(app.world.get::<Tileset>(info.tileset).is_some());
    }

    #[test]
    fn slider_values_drive_the_overlay_height() {
        let mut app = hong_kong_app();
        run_until_settled(&mut app);

        for step in 0..=200 {
            let value = step as f64 * 0.1;
            move_slider(&mut app, &[value]);
            let remaining = overlays(&mut app);
            assert_eq!(remaining.len(), 1, "slider at {}", value);
            assert_eq!(remaining[0].height, 0.0);
            assert_eq!(remaining[0].extruded_height, value.clamp(0.0, 20.0));
            assert_eq!(
                app.world.resource::<UiElements>().text(SEA_LEVEL_VALUE_ID),
                Some(format_sea_level(value).as_str())
            );
        }
        assert_eq!(
            app.world.resource::<UiElements>().text(SEA_LEVEL_VALUE_ID),
            Some("20.0 m")
        );
    }

    #[test]
    fn readout_agrees_with_a_clamped_overlay() {
        let mut app = hong_kong_app();
        run_until_settled(&mut app);

        move_slider(&mut app, &[42.0]);
        assert_eq!(overlays(&mut app)[0].extruded_height, 20.0);
        assert_eq!(
            app.world.resource::<UiElements>().text(SEA_LEVEL_VALUE_ID),
            Some("20.0 m")
        );

        move_slider(&mut app, &[f64::NAN]);
        assert_eq!(overlays(&mut app)[0].extruded_height, 20.0);
        assert_eq!(
            app.world.resource::<UiElements>().text(SEA_LEVEL_VALUE_ID),
            Some("20.0 m")
        );

        move_slider(&mut app, &[-3.0]);
        assert_eq!(overlays(&mut app)[0].extruded_height, 0.0);
        assert_eq!(
            app.world.resource::<UiElements>().text(SEA_LEVEL_VALUE_ID),
            Some("0.0 m")
        );
    }

    #[test]
    fn many_updates_in_one_frame_leave_one_overlay() {
        let mut app = hong_kong_app();
        run_until_settled(&mut app);

        move_slider(&mut app, &[1.0, 2.0, 3.0, 4.0, 5.5]);
        let remaining = overlays(&mut app);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].extruded_height, 5.5);
        assert_eq!(app.world.resource::<EntityCollection>().len(), 1);
    }

    #[test]
    fn out_of_range_commands_are_clamped_and_nan_is_ignored() {
        let mut app = hong_kong_app();
        run_until_settled(&mut app);

        app.world
            .resource_mut::<Events<SetSeaLevel>>()
            .send(SetSeaLevel(35.0));
        app.update();
        assert_eq!(overlays(&mut app)[0].extruded_height, 20.0);

        app.world
            .resource_mut::<Events<SetSeaLevel>>()
            .send(SetSeaLevel(f64::NAN));
        app.update();
        let remaining = overlays(&mut app);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].extruded_height, 20.0);
    }

    #[test]
    fn footprint_ignores_the_dataset_location() {
        // dataset over Tokyo, overlay still over Hong Kong
        let mut app = app_with(
            config(),
            MemoryFetcher::new().with(TILESET_URL, box_tileset_bytes(139.69, 35.68)),
            Arc::new(FlatTerrainProvider(0.0)),
        );
        run_until_settled(&mut app);
        move_slider(&mut app, &[3.0]);

        let expected = Rectangle::from_degrees(113.8, 22.15, 114.45, 22.6);
        let remaining = overlays(&mut app);
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].rectangle.equals_epsilon(&expected, EPSILON7));
    }

    #[test]
    fn terrain_failure_still_reaches_ready() {
        let mut app = app_with(
            config(),
            MemoryFetcher::new().with(TILESET_URL, box_tileset_bytes(114.17, 22.3)),
            Arc::new(FailingTerrainProvider),
        );
        assert_eq!(run_until_settled(&mut app), AppState::Ready);
        let context = app.world.resource::<SeaLevelContext>();
        assert_eq!(
            context.tileset_info.as_ref().map(|info| info.terrain_height),
            Some(0.0)
        );
        assert_eq!(overlays(&mut app).len(), 1);
    }

    #[test]
    fn dataset_failure_stops_before_any_overlay() {
        let mut app = app_with(
            config(),
            MemoryFetcher::new(),
            Arc::new(FlatTerrainProvider(0.0)),
        );
        assert_eq!(run_until_settled(&mut app), AppState::Failed);
        assert!(app.world.resource::<SeaLevelContext>().tileset_info.is_none());

        move_slider(&mut app, &[4.0]);
        app.world
            .resource_mut::<Events<SetSeaLevel>>()
            .send(SetSeaLevel(4.0));
        app.update();
        assert!(overlays(&mut app).is_empty());
        assert!(app.world.resource::<EntityCollection>().is_empty());
    }

    #[test]
    fn missing_slider_skips_wiring_but_keeps_the_overlay() {
        let mut app = app_with(
            SeaLevelConfig {
                ui: UiConfig { elements: vec![] },
                ..config()
            },
            MemoryFetcher::new().with(TILESET_URL, box_tileset_bytes(114.17, 22.3)),
            Arc::new(FlatTerrainProvider(0.0)),
        );
        assert_eq!(run_until_settled(&mut app), AppState::Ready);

        let context = app.world.resource::<SeaLevelContext>();
        assert!(context.slider_id.is_none());
        assert!(context.readout_id.is_none());

        move_slider(&mut app, &[9.0]);
        let remaining = overlays(&mut app);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].extruded_height, 0.0);
    }

    #[test]
    fn camera_starts_at_home_and_home_command_flies_there() {
        let mut app = hong_kong_app();
        run_until_settled(&mut app);

        let home = SeaLevelConfig::default().home;
        let mut cameras = app.world.query::<&GlobeCamera>();
        let camera = *cameras.single(&app.world);
        assert!(camera
            .position
            .abs_diff_eq(home.destination_cartesian(), 1e-6));
        assert_eq!(camera.orientation, home.orientation);

        let navigation = *app.world.resource::<HomeNavigation>();
        let target = navigation.override_view.expect("installed on startup");
        assert_eq!(target.duration, 1.5);
        assert_eq!(target.orientation, home.orientation);

        app.world
            .resource_mut::<Events<crate::plugins::camera::HomeCommand>>()
            .send(crate::plugins::camera::HomeCommand);
        app.update();
        let events = app.world.resource::<Events<FlyTo>>();
        let sent: Vec<FlyTo> = events.get_reader().iter(events).copied().collect();
        assert!(sent.contains(&target));
    }
}
