use std::sync::Arc;

use bevy::{math::DVec3, prelude::*};
use sealevel_jobs::{AsyncReturn, Context, Job};
use sealevel_scene::{BoundingSphere, Cartographic, Rectangle};

use super::tileset_json::TilesetJson;
use crate::{
    error::{SeaLevelError, TilesetError},
    fetch::Fetcher,
    plugins::terrain::{sample_terrain_height, TerrainProvider},
};

/// Everything learned about a dataset before it is handed to the ECS.
#[derive(Debug, Clone)]
pub struct LoadedTileset {
    pub url: String,
    pub json: TilesetJson,
    pub bounding_sphere: BoundingSphere,
    pub center: DVec3,
    /// Degrees.
    pub longitude: f64,
    /// Degrees.
    pub latitude: f64,
    pub terrain_height: f64,
    /// Radians.
    pub rectangle: Rectangle,
}

pub struct LoadTilesetJob {
    pub url: String,
    pub rectangle: Rectangle,
    pub fetcher: Arc<dyn Fetcher>,
    pub terrain_provider: Arc<dyn TerrainProvider>,
}

impl Job for LoadTilesetJob {
    type Outcome = Result<LoadedTileset, SeaLevelError>;

    fn name(&self) -> String {
        format!("Loading tileset '{}'", self.url)
    }

    fn perform(self, ctx: Context) -> AsyncReturn<Self::Outcome> {
        Box::pin(async move {
            let _ = ctx.send_progress(0).await;
            let loaded = load_tileset(
                &self.url,
                self.fetcher.as_ref(),
                self.terrain_provider.as_ref(),
                self.rectangle,
            )
            .await;
            let _ = ctx.send_progress(100).await;
            loaded
        })
    }
}

/// Fetches and parses the dataset, locates its center and samples terrain
/// there. Terrain failures read as height 0; dataset failures are returned.
pub async fn load_tileset(
    url: &str,
    fetcher: &dyn Fetcher,
    terrain_provider: &dyn TerrainProvider,
    rectangle: Rectangle,
) -> Result<LoadedTileset, SeaLevelError> {
    let dataset_error = |source: TilesetError| SeaLevelError::DatasetLoad {
        url: url.to_string(),
        source,
    };

    let bytes = fetcher
        .fetch(url)
        .await
        .map_err(|e| dataset_error(e.into()))?;
    let json = TilesetJson::from_slice(&bytes).map_err(dataset_error)?;
    let bounding_sphere = json.bounding_sphere().map_err(dataset_error)?;
    let center = bounding_sphere.center;
    let cartographic = Cartographic::from_cartesian(center, None)
        .ok_or(TilesetError::DegenerateCenter)
        .map_err(dataset_error)?
        .to_degrees();
    debug!(
        "Tileset {} has {} tiles, center ({}, {})",
        url,
        json.tile_count(),
        cartographic.longitude,
        cartographic.latitude
    );

    let terrain_height =
        sample_terrain_height(terrain_provider, cartographic.longitude, cartographic.latitude)
            .await;

    Ok(LoadedTileset {
        url: url.to_string(),
        json,
        bounding_sphere,
        center,
        longitude: cartographic.longitude,
        latitude: cartographic.latitude,
        terrain_height,
        rectangle,
    })
}
