use bevy::math::UVec2;

use crate::{ellipsoid::Ellipsoid, math::Cartographic, rectangle::Rectangle};

/// Equirectangular tiling of the globe: rows are counted from the north edge.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicTilingScheme {
    pub ellipsoid: Ellipsoid,
    pub rectangle: Rectangle,
    pub number_of_level_zero_tiles_x: u32,
    pub number_of_level_zero_tiles_y: u32,
}

impl Default for GeographicTilingScheme {
    fn default() -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            rectangle: Rectangle::MAX_VALUE,
            number_of_level_zero_tiles_x: 2,
            number_of_level_zero_tiles_y: 1,
        }
    }
}

impl GeographicTilingScheme {
    pub fn get_number_of_x_tiles_at_level(&self, level: u32) -> u32 {
        self.number_of_level_zero_tiles_x << level
    }
    pub fn get_number_of_y_tiles_at_level(&self, level: u32) -> u32 {
        self.number_of_level_zero_tiles_y << level
    }
    pub fn tile_x_y_to_rectangle(&self, x: u32, y: u32, level: u32) -> Rectangle {
        let rectangle = self.rectangle;

        let x_tile_width =
            rectangle.compute_width() / f64::from(self.get_number_of_x_tiles_at_level(level));
        let west = f64::from(x) * x_tile_width + rectangle.west;
        let east = f64::from(x + 1) * x_tile_width + rectangle.west;

        let y_tile_height =
            rectangle.compute_height() / f64::from(self.get_number_of_y_tiles_at_level(level));
        let north = rectangle.north - f64::from(y) * y_tile_height;
        let south = rectangle.north - f64::from(y + 1) * y_tile_height;
        Rectangle::new(west, south, east, north)
    }
    /// `None` when the position lies outside the scheme's rectangle.
    pub fn position_to_tile_x_y(&self, position: &Cartographic, level: u32) -> Option<UVec2> {
        let rectangle = self.rectangle;
        if !rectangle.contains(position) {
            return None;
        }
        let x_tiles = self.get_number_of_x_tiles_at_level(level);
        let y_tiles = self.get_number_of_y_tiles_at_level(level);

        let x_tile_width = rectangle.compute_width() / f64::from(x_tiles);
        let y_tile_height = rectangle.compute_height() / f64::from(y_tiles);

        let x = ((position.longitude - rectangle.west) / x_tile_width).floor() as u32;
        let y = ((rectangle.north - position.latitude) / y_tile_height).floor() as u32;

        Some(UVec2::new(x.min(x_tiles - 1), y.min(y_tiles - 1)))
    }
}
