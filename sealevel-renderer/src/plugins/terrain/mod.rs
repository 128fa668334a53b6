use std::sync::Arc;

use bevy::prelude::*;
use sealevel_jobs::AsyncReturn;
use sealevel_scene::Cartographic;

use crate::{config::TerrainConfig, error::SeaLevelError, error::TerrainError, fetch::Fetcher};

mod ellipsoid_terrain_provider;
mod quantized_mesh_terrain_provider;

pub use ellipsoid_terrain_provider::EllipsoidTerrainProvider;
pub use quantized_mesh_terrain_provider::QuantizedMeshTerrainProvider;

/// Source of terrain elevation.
pub trait TerrainProvider: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Returns `positions` with their heights replaced by the most detailed
    /// elevation available, in the same order.
    fn sample_most_detailed(
        &self,
        positions: Vec<Cartographic>,
    ) -> AsyncReturn<Result<Vec<Cartographic>, TerrainError>>;
}

#[derive(Resource, Clone)]
pub struct TerrainProviderResource(pub Arc<dyn TerrainProvider>);

pub fn create_terrain_provider(
    config: &TerrainConfig,
    fetcher: Arc<dyn Fetcher>,
) -> Arc<dyn TerrainProvider> {
    match config {
        TerrainConfig::Ellipsoid => Arc::new(EllipsoidTerrainProvider),
        TerrainConfig::QuantizedMesh { url, maximum_level } => Arc::new(
            QuantizedMeshTerrainProvider::new(url.clone(), *maximum_level, fetcher),
        ),
    }
}

/// Terrain height in meters at a position given in degrees. Failures are
/// logged and read as sea level.
pub async fn sample_terrain_height(
    provider: &dyn TerrainProvider,
    longitude: f64,
    latitude: f64,
) -> f64 {
    let position = Cartographic::from_degrees(longitude, latitude, 0.0);
    match provider.sample_most_detailed(vec![position]).await {
        Ok(sampled) => match sampled.first() {
            Some(position) if position.height.is_finite() => position.height,
            _ => {
                error!(
                    "{} returned no usable height at ({}, {})",
                    provider.name(),
                    longitude,
                    latitude
                );
                0.0
            }
        },
        Err(e) => {
            error!("Error sampling terrain height: {}", SeaLevelError::from(e));
            0.0
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Always fails, for exercising the fallback.
    pub(crate) struct FailingTerrainProvider;

    impl TerrainProvider for FailingTerrainProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn sample_most_detailed(
            &self,
            positions: Vec<Cartographic>,
        ) -> AsyncReturn<Result<Vec<Cartographic>, TerrainError>> {
            let first = positions.first().copied().unwrap_or_default();
            Box::pin(async move {
                Err(TerrainError::OutsideTilingScheme {
                    longitude: first.longitude,
                    latitude: first.latitude,
                })
            })
        }
    }

    /// Reports a fixed height everywhere.
    pub(crate) struct FlatTerrainProvider(pub f64);

    impl TerrainProvider for FlatTerrainProvider {
        fn name(&self) -> &'static str {
            "flat"
        }

        fn sample_most_detailed(
            &self,
            positions: Vec<Cartographic>,
        ) -> AsyncReturn<Result<Vec<Cartographic>, TerrainError>> {
            let height = self.0;
            Box::pin(async move {
                Ok(positions
                    .into_iter()
                    .map(|p| Cartographic { height, ..p })
                    .collect())
            })
        }
    }

    #[test]
    fn failures_read_as_zero() {
        let height = pollster::block_on(sample_terrain_height(&FailingTerrainProvider, 114.1, 22.3));
        assert_eq!(height, 0.0);
    }

    #[test]
    fn successful_samples_pass_through() {
        let height =
            pollster::block_on(sample_terrain_height(&FlatTerrainProvider(42.5), 114.1, 22.3));
        assert_eq!(height, 42.5);
    }

    #[test]
    fn non_finite_samples_read_as_zero() {
        let height = pollster::block_on(sample_terrain_height(
            &FlatTerrainProvider(f64::NAN),
            114.1,
            22.3,
        ));
        assert_eq!(height, 0.0);
    }

    #[test]
    fn config_selects_the_provider() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(crate::fetch::MemoryFetcher::new());
        let ellipsoid = create_terrain_provider(&TerrainConfig::Ellipsoid, fetcher.clone());
        assert_eq!(ellipsoid.name(), "ellipsoid");
        let quantized = create_terrain_provider(
            &TerrainConfig::QuantizedMesh {
                url: "mem://{z}/{x}/{y}.terrain".to_string(),
                maximum_level: 3,
            },
            fetcher,
        );
        assert_eq!(quantized.name(), "quantized-mesh");
    }
}
