#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::indexing_slicing,
    clippy::expect_used
)]

use bevy::prelude::*;

pub mod config;
pub mod error;
pub mod fetch;
pub mod plugins;

pub use config::SeaLevelConfig;
pub use error::SeaLevelError;
pub use plugins::bootstrap::{AppState, SeaLevelContext};

use fetch::FetcherResource;
use plugins::terrain::{create_terrain_provider, TerrainProviderResource};

/// Loads the tileset and drives the sea level overlay. Needs no window or
/// GPU, so it runs under `MinimalPlugins` too.
///
/// [`SeaLevelConfig`], [`FetcherResource`] and [`TerrainProviderResource`]
/// inserted before this plugin are kept; anything missing is created from
/// the configuration.
pub struct SeaLevelPlugin;

impl bevy::app::Plugin for SeaLevelPlugin {
    fn build(&self, app: &mut App) {
        if !app.world.contains_resource::<SeaLevelConfig>() {
            app.insert_resource(SeaLevelConfig::load());
        }
        if !app.world.contains_resource::<FetcherResource>() {
            app.init_resource::<FetcherResource>();
        }
        if !app.world.contains_resource::<TerrainProviderResource>() {
            let fetcher = app.world.resource::<FetcherResource>().0.clone();
            let config = &app.world.resource::<SeaLevelConfig>().terrain;
            let provider = create_terrain_provider(config, fetcher);
            info!("Using {} terrain", provider.name());
            app.insert_resource(TerrainProviderResource(provider));
        }

        app.add_plugins((
            sealevel_jobs::JobsPlugin,
            plugins::camera::Plugin,
            plugins::ui::Plugin,
            plugins::overlay::Plugin,
            plugins::bootstrap::Plugin,
        ));
    }
}

/// Globe, camera, control panel and debug drawing on top of [`SeaLevelPlugin`].
pub struct RendererPlugin;

impl bevy::app::Plugin for RendererPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(plugins::viewer::Plugin);
    }
}
