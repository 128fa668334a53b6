//! Hong Kong buildings over a globe with an adjustable sea level.
//!
//! Set `SEALEVEL_CONFIG` to a JSON file to override the defaults.

use bevy::prelude::*;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Sea Level".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((
            sealevel_renderer::SeaLevelPlugin,
            sealevel_renderer::RendererPlugin,
        ))
        .run();
}
