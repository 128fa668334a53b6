use std::collections::BTreeMap;

use bevy::{
    prelude::*,
    window::{PrimaryWindow, WindowMode},
};
use bevy_egui::{egui, EguiContexts};

use crate::{
    config::{SeaLevelConfig, UiConfig, UiElementKind},
    plugins::camera::HomeCommand,
};

pub struct Plugin;

impl bevy::app::Plugin for Plugin {
    fn build(&self, app: &mut App) {
        let elements = app
            .world
            .get_resource::<SeaLevelConfig>()
            .map(|config| UiElements::from_config(&config.ui))
            .unwrap_or_default();
        app.add_event::<UiInputEvent>().insert_resource(elements);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiElement {
    RangeInput {
        min: f64,
        max: f64,
        step: f64,
        value: f64,
    },
    TextDisplay {
        text: String,
    },
}

impl UiElement {
    pub fn range() -> Self {
        Self::RangeInput {
            min: 0.0,
            max: 100.0,
            step: 1.0,
            value: 0.0,
        }
    }

    pub fn text() -> Self {
        Self::TextDisplay {
            text: String::new(),
        }
    }
}

/// Widgets on the control panel, keyed by id.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct UiElements {
    elements: BTreeMap<String, UiElement>,
}

impl UiElements {
    pub fn from_config(config: &UiConfig) -> Self {
        let mut elements = Self::default();
        for element in &config.elements {
            let widget = match element.kind {
                UiElementKind::Range => UiElement::range(),
                UiElementKind::Text => UiElement::text(),
            };
            elements.register(element.id.clone(), widget);
        }
        elements
    }

    pub fn register(&mut self, id: impl Into<String>, element: UiElement) {
        self.elements.insert(id.into(), element);
    }

    pub fn get(&self, id: &str) -> Option<&UiElement> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut UiElement> {
        self.elements.get_mut(id)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Configures the range input `id`; `false` if there is no such slider.
    pub fn bind_range(&mut self, id: &str, min: f64, max: f64, step: f64, value: f64) -> bool {
        match self.get_mut(id) {
            Some(UiElement::RangeInput {
                min: current_min,
                max: current_max,
                step: current_step,
                value: current_value,
            }) => {
                *current_min = min;
                *current_max = max;
                *current_step = step;
                *current_value = value;
                true
            }
            _ => false,
        }
    }

    /// Sets the text of display `id`; `false` if there is no such display.
    pub fn set_text(&mut self, id: &str, text: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(UiElement::TextDisplay { text: current }) => {
                *current = text.into();
                true
            }
            _ => false,
        }
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        match self.get(id) {
            Some(UiElement::TextDisplay { text }) => Some(text),
            _ => None,
        }
    }

    pub fn range_value(&self, id: &str) -> Option<f64> {
        match self.get(id) {
            Some(UiElement::RangeInput { value, .. }) => Some(*value),
            _ => None,
        }
    }
}

/// The user moved the range input `id` to `value`.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct UiInputEvent {
    pub id: String,
    pub value: f64,
}

pub fn format_sea_level(value: f64) -> String {
    format!("{:.1} m", value)
}

const NAVIGATION_HELP: &str = "Drag the slider to raise the sea level.\n\
    Press H or use Home to return to the Hong Kong view.";

/// Draws every registered widget plus the viewer buttons.
pub fn control_panel_system(
    mut contexts: EguiContexts,
    mut elements: ResMut<UiElements>,
    mut inputs: EventWriter<UiInputEvent>,
    mut home: EventWriter<HomeCommand>,
    config: Res<SeaLevelConfig>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    let ctx = contexts.ctx_mut();
    egui::Window::new("Sea Level")
        .resizable(false)
        .default_pos([16.0, 16.0])
        .default_width(280.0)
        .show(ctx, |ui| {
            for (id, element) in elements.elements.iter_mut() {
                match element {
                    UiElement::RangeInput {
                        min,
                        max,
                        step,
                        value,
                    } => {
                        let response = ui.add(
                            egui::Slider::new(value, *min..=*max)
                                .step_by(*step)
                                .show_value(false),
                        );
                        if response.changed() {
                            inputs.send(UiInputEvent {
                                id: id.clone(),
                                value: *value,
                            });
                        }
                    }
                    UiElement::TextDisplay { text } => {
                        ui.label(text.as_str());
                    }
                }
            }

            ui.separator();
            ui.horizontal(|ui| {
                if config.viewer.home_button && ui.button("Home").clicked() {
                    home.send(HomeCommand);
                }
                if config.viewer.fullscreen_button && ui.button("Fullscreen").clicked() {
                    if let Ok(mut window) = windows.get_single_mut() {
                        window.mode = match window.mode {
                            WindowMode::Windowed => WindowMode::BorderlessFullscreen,
                            _ => WindowMode::Windowed,
                        };
                    }
                }
            });
            if config.viewer.navigation_help_button {
                ui.collapsing("Navigation", |ui| ui.label(NAVIGATION_HELP));
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{UiElementConfig, SEA_LEVEL_SLIDER_ID, SEA_LEVEL_VALUE_ID};

    #[test]
    fn readout_has_one_decimal() {
        assert_eq!(format_sea_level(0.0), "0.0 m");
        assert_eq!(format_sea_level(12.34), "12.3 m");
        assert_eq!(format_sea_level(20.0), "20.0 m");
    }

    #[test]
    fn default_config_registers_slider_and_readout() {
        let mut elements = UiElements::from_config(&UiConfig::default());
        assert!(elements.bind_range(SEA_LEVEL_SLIDER_ID, 0.0, 20.0, 0.1, 0.0));
        assert!(elements.set_text(SEA_LEVEL_VALUE_ID, "0.0 m"));
        assert_eq!(elements.range_value(SEA_LEVEL_SLIDER_ID), Some(0.0));
        assert_eq!(elements.text(SEA_LEVEL_VALUE_ID), Some("0.0 m"));
    }

    #[test]
    fn binding_checks_the_element_kind() {
        let mut elements = UiElements::from_config(&UiConfig {
            elements: vec![UiElementConfig {
                id: SEA_LEVEL_SLIDER_ID.to_string(),
                kind: UiElementKind::Text,
            }],
        });
        assert!(!elements.bind_range(SEA_LEVEL_SLIDER_ID, 0.0, 20.0, 0.1, 0.0));
        assert!(!elements.set_text(SEA_LEVEL_VALUE_ID, "0.0 m"));
        assert_eq!(elements.range_value(SEA_LEVEL_SLIDER_ID), None);
    }

    #[test]
    fn plugin_registers_configured_elements() {
        let mut app = App::new();
        app.insert_resource(SeaLevelConfig {
            ui: UiConfig { elements: vec![] },
            ..Default::default()
        })
        .add_plugins(Plugin);
        assert!(app.world.resource::<UiElements>().is_empty());
    }
}
