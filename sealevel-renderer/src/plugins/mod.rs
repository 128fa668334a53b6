pub mod bootstrap;
pub mod camera;
pub mod overlay;
pub mod terrain;
pub mod tileset;
pub mod ui;
pub mod viewer;
