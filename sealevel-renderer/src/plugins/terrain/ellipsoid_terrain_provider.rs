use sealevel_jobs::AsyncReturn;
use sealevel_scene::Cartographic;

use super::TerrainProvider;
use crate::error::TerrainError;

/// Bare WGS84 ellipsoid: every position sits at height 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct EllipsoidTerrainProvider;

impl TerrainProvider for EllipsoidTerrainProvider {
    fn name(&self) -> &'static str {
        "ellipsoid"
    }

    fn sample_most_detailed(
        &self,
        positions: Vec<Cartographic>,
    ) -> AsyncReturn<Result<Vec<Cartographic>, TerrainError>> {
        Box::pin(async move {
            Ok(positions
                .into_iter()
                .map(|position| Cartographic {
                    height: 0.0,
                    ..position
                })
                .collect())
        })
    }
}
