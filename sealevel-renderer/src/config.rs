use std::{env, fs, path::Path};

use bevy::{math::DVec3, prelude::*};
use sealevel_scene::{Cartographic, HeadingPitchRoll, Rectangle};
use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming an optional JSON file that overrides
/// [`SeaLevelConfig::default`].
pub const CONFIG_ENV_VAR: &str = "SEALEVEL_CONFIG";

pub const SEA_LEVEL_SLIDER_ID: &str = "seaLevel";
pub const SEA_LEVEL_VALUE_ID: &str = "seaLevelValue";

pub const DEFAULT_TILESET_URL: &str =
    "https://data.map.gov.hk/api/3d-data/3dtiles/f2/tileset.json?key=3967f8f365694e0798af3e7678509421";

#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeaLevelConfig {
    pub tileset_url: String,
    /// Footprint of the overlay, in degrees.
    pub rectangle: Rectangle,
    pub home: HomeView,
    pub slider: SliderConfig,
    pub terrain: TerrainConfig,
    pub viewer: ViewerOptions,
    pub ui: UiConfig,
}

impl Default for SeaLevelConfig {
    fn default() -> Self {
        Self {
            tileset_url: DEFAULT_TILESET_URL.to_string(),
            rectangle: Rectangle::new(113.8, 22.15, 114.45, 22.6),
            home: HomeView::default(),
            slider: SliderConfig::default(),
            terrain: TerrainConfig::default(),
            viewer: ViewerOptions::default(),
            ui: UiConfig::default(),
        }
    }
}

impl SeaLevelConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reads the file named by [`CONFIG_ENV_VAR`], falling back to defaults
    /// when the variable is unset or the file cannot be used.
    pub fn load() -> Self {
        let Ok(path) = env::var(CONFIG_ENV_VAR) else {
            return Self::default();
        };
        match Self::from_path(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path);
                config
            }
            Err(e) => {
                error!("Ignoring configuration file {}: {}", path, e);
                Self::default()
            }
        }
    }

    /// The overlay footprint in radians.
    pub fn rectangle_radians(&self) -> Rectangle {
        self.rectangle.to_radians()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HomeView {
    /// Longitude and latitude in degrees, height in meters.
    pub destination: Cartographic,
    /// Radians.
    pub orientation: HeadingPitchRoll,
    /// Seconds.
    pub duration: f64,
}

impl Default for HomeView {
    fn default() -> Self {
        Self {
            destination: Cartographic::new(
                114.09086884578214,
                22.044338206507053,
                35339.14068737606,
            ),
            orientation: HeadingPitchRoll::new(
                6.280194717481077,
                -0.7921019105734031,
                6.283182074536001,
            ),
            duration: 1.5,
        }
    }
}

impl HomeView {
    pub fn destination_cartesian(&self) -> DVec3 {
        Cartographic::from_degrees(
            self.destination.longitude,
            self.destination.latitude,
            self.destination.height,
        )
        .to_cartesian(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SliderConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub initial: f64,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 20.0,
            step: 0.1,
            initial: 0.0,
        }
    }
}

impl SliderConfig {
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerrainConfig {
    #[default]
    Ellipsoid,
    QuantizedMesh {
        /// Tile URL with `{z}`, `{x}` and `{y}` placeholders, rows in TMS order.
        url: String,
        #[serde(default = "default_maximum_level")]
        maximum_level: u32,
    },
}

fn default_maximum_level() -> u32 {
    14
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    pub home_button: bool,
    pub fullscreen_button: bool,
    pub navigation_help_button: bool,
    pub bounds_visible: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            home_button: true,
            fullscreen_button: true,
            navigation_help_button: true,
            bounds_visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiElementKind {
    Range,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UiElementConfig {
    pub id: String,
    pub kind: UiElementKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub elements: Vec<UiElementConfig>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            elements: vec![
                UiElementConfig {
                    id: SEA_LEVEL_SLIDER_ID.to_string(),
                    kind: UiElementKind::Range,
                },
                UiElementConfig {
                    id: SEA_LEVEL_VALUE_ID.to_string(),
                    kind: UiElementKind::Text,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_hong_kong_scene() {
        let config = SeaLevelConfig::default();
        assert!(config.tileset_url.starts_with("https://data.map.gov.hk/"));
        assert_eq!(config.rectangle, Rectangle::new(113.8, 22.15, 114.45, 22.6));
        assert_eq!(config.slider.max, 20.0);
        assert_eq!(config.home.duration, 1.5);
        assert_eq!(config.terrain, TerrainConfig::Ellipsoid);
        assert_eq!(config.ui.elements.len(), 2);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config = SeaLevelConfig::from_json(
            r#"{
                "slider": { "max": 10.0 },
                "terrain": { "kind": "quantized_mesh", "url": "http://localhost/{z}/{x}/{y}.terrain" },
                "ui": { "elements": [] }
            }"#,
        )
        .expect("valid config");
        assert_eq!(config.slider.max, 10.0);
        assert_eq!(config.slider.step, 0.1);
        assert_eq!(
            config.terrain,
            TerrainConfig::QuantizedMesh {
                url: "http://localhost/{z}/{x}/{y}.terrain".to_string(),
                maximum_level: 14,
            }
        );
        assert!(config.ui.elements.is_empty());
        assert_eq!(config.home, HomeView::default());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let result = SeaLevelConfig::from_json(r#"{ "slider": 3 }"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = SeaLevelConfig::from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn slider_clamps_to_bounds() {
        let slider = SliderConfig::default();
        assert_eq!(slider.clamp(-1.0), 0.0);
        assert_eq!(slider.clamp(25.0), 20.0);
        assert_eq!(slider.clamp(12.3), 12.3);
    }

    #[test]
    fn home_destination_is_south_of_hong_kong() {
        let position = HomeView::default().destination_cartesian();
        let cartographic = Cartographic::from_cartesian(position, None)
            .expect("valid")
            .to_degrees();
        assert!((cartographic.longitude - 114.09086884578214).abs() < 1e-9);
        assert!((cartographic.height - 35339.14068737606).abs() < 1e-3);
    }
}
