use std::{collections::HashMap, sync::Arc};

use bevy::math::UVec2;
use futures_util::future::join_all;
use new_string_template::template::Template;
use sealevel_jobs::AsyncReturn;
use sealevel_scene::{Cartographic, GeographicTilingScheme, Rectangle};

use super::TerrainProvider;
use crate::{error::TerrainError, fetch::Fetcher};

/// Heightmap tiles in the quantized-mesh format on a geographic tiling
/// scheme. Every sample reads the tile at `maximum_level`.
pub struct QuantizedMeshTerrainProvider {
    url_template: String,
    maximum_level: u32,
    tiling_scheme: GeographicTilingScheme,
    fetcher: Arc<dyn Fetcher>,
}

struct TileRequest {
    url: String,
    xy: UVec2,
    rectangle: Rectangle,
}

impl QuantizedMeshTerrainProvider {
    pub fn new(
        url_template: impl Into<String>,
        maximum_level: u32,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            url_template: url_template.into(),
            maximum_level,
            tiling_scheme: GeographicTilingScheme::default(),
            fetcher,
        }
    }

    /// Fills `{z}`, `{x}` and `{y}`; `y` is flipped to TMS order (row 0 at
    /// the south edge).
    pub fn tile_url(&self, x: u32, y: u32, level: u32) -> Result<String, TerrainError> {
        let rows = self.tiling_scheme.get_number_of_y_tiles_at_level(level);
        let tms_y = rows.saturating_sub(y + 1);
        let mut values = HashMap::new();
        values.insert("z", level.to_string());
        values.insert("x", x.to_string());
        values.insert("y", tms_y.to_string());
        Template::new(self.url_template.as_str())
            .render(&values)
            .map_err(|e| TerrainError::UrlTemplate(format!("{:?}", e)))
    }

    fn request(&self, position: &Cartographic) -> Result<TileRequest, TerrainError> {
        let level = self.maximum_level;
        let xy = self
            .tiling_scheme
            .position_to_tile_x_y(position, level)
            .ok_or(TerrainError::OutsideTilingScheme {
                longitude: position.longitude.to_degrees(),
                latitude: position.latitude.to_degrees(),
            })?;
        Ok(TileRequest {
            url: self.tile_url(xy.x, xy.y, level)?,
            xy,
            rectangle: self.tiling_scheme.tile_x_y_to_rectangle(xy.x, xy.y, level),
        })
    }
}

impl TerrainProvider for QuantizedMeshTerrainProvider {
    fn name(&self) -> &'static str {
        "quantized-mesh"
    }

    fn sample_most_detailed(
        &self,
        positions: Vec<Cartographic>,
    ) -> AsyncReturn<Result<Vec<Cartographic>, TerrainError>> {
        let requests = match positions
            .iter()
            .map(|position| self.request(position))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(requests) => requests,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let fetcher = self.fetcher.clone();
        let level = self.maximum_level;

        Box::pin(async move {
            let samples = requests.into_iter().zip(positions).map(|(request, position)| {
                let fetcher = fetcher.clone();
                async move {
                    let bytes = fetcher.fetch(&request.url).await?;
                    let mesh = quantized_mesh_decoder::from_bytes(&bytes)?;
                    let rectangle = request.rectangle;
                    let u = (position.longitude - rectangle.west) / rectangle.compute_width();
                    let v = (position.latitude - rectangle.south) / rectangle.compute_height();
                    let height =
                        mesh.interpolate_height(u, v)
                            .ok_or(TerrainError::NoTriangle {
                                level,
                                x: request.xy.x,
                                y: request.xy.y,
                            })?;
                    Ok::<_, TerrainError>(Cartographic { height, ..position })
                }
            });
            join_all(samples).await.into_iter().collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use quantized_mesh_decoder::{QuantizedMesh, QuantizedMeshHeader, MAX_QUANTIZED};

    use super::*;
    use crate::fetch::MemoryFetcher;

    const TEMPLATE: &str = "mem://terrain/{z}/{x}/{y}.terrain";

    /// Rises from `low` on the west edge to `high` on the east edge.
    fn sloped_tile(low: f32, high: f32) -> Vec<u8> {
        QuantizedMesh {
            header: QuantizedMeshHeader {
                minimum_height: low,
                maximum_height: high,
                ..Default::default()
            },
            u: vec![0, MAX_QUANTIZED, MAX_QUANTIZED, 0],
            v: vec![0, 0, MAX_QUANTIZED, MAX_QUANTIZED],
            height: vec![0, MAX_QUANTIZED, MAX_QUANTIZED, 0],
            indices: vec![0, 1, 2, 0, 2, 3],
            west_indices: vec![0, 3],
            south_indices: vec![1, 0],
            east_indices: vec![2, 1],
            north_indices: vec![3, 2],
            extensions: vec![],
        }
        .to_bytes()
        .expect("encodes")
    }

    fn provider_with_tile(position: &Cartographic, level: u32) -> (QuantizedMeshTerrainProvider, Rectangle) {
        let probe = QuantizedMeshTerrainProvider::new(TEMPLATE, level, Arc::new(MemoryFetcher::new()));
        let request = probe.request(position).expect("inside scheme");
        let fetcher = MemoryFetcher::new().with(request.url, sloped_tile(10.0, 110.0));
        (
            QuantizedMeshTerrainProvider::new(TEMPLATE, level, Arc::new(fetcher)),
            request.rectangle,
        )
    }

    #[test]
    fn urls_use_tms_rows() {
        let provider =
            QuantizedMeshTerrainProvider::new(TEMPLATE, 0, Arc::new(MemoryFetcher::new()));
        assert_eq!(
            provider.tile_url(1, 0, 0).expect("renders"),
            "mem://terrain/0/1/0.terrain"
        );
        assert_eq!(
            provider.tile_url(3, 0, 1).expect("renders"),
            "mem://terrain/1/3/1.terrain"
        );
    }

    #[test]
    fn samples_interpolate_inside_the_tile() {
        let level = 8;
        let target = Cartographic::from_degrees(114.1, 22.3, 0.0);
        let (provider, rectangle) = provider_with_tile(&target, level);
        let middle = rectangle.interpolate(0.5, 0.5, 0.0);
        let west = rectangle.interpolate(0.0, 0.3, 0.0);

        let sampled = pollster::block_on(provider.sample_most_detailed(vec![middle, west]))
            .expect("tile is available");
        assert_eq!(sampled.len(), 2);
        assert!((sampled[0].height - 60.0).abs() < 0.01);
        assert!((sampled[1].height - 10.0).abs() < 0.01);
        assert_eq!(sampled[0].longitude, middle.longitude);
    }

    #[test]
    fn missing_tiles_are_fetch_errors() {
        let provider =
            QuantizedMeshTerrainProvider::new(TEMPLATE, 5, Arc::new(MemoryFetcher::new()));
        let result = pollster::block_on(
            provider.sample_most_detailed(vec![Cartographic::from_degrees(114.1, 22.3, 0.0)]),
        );
        assert!(matches!(result, Err(TerrainError::Fetch(_))));
    }

    #[test]
    fn garbage_tiles_are_decode_errors() {
        let target = Cartographic::from_degrees(114.1, 22.3, 0.0);
        let probe = QuantizedMeshTerrainProvider::new(TEMPLATE, 2, Arc::new(MemoryFetcher::new()));
        let url = probe.request(&target).expect("inside scheme").url;
        let fetcher = MemoryFetcher::new().with(url, &b"not a tile"[..]);
        let provider = QuantizedMeshTerrainProvider::new(TEMPLATE, 2, Arc::new(fetcher));
        let result = pollster::block_on(provider.sample_most_detailed(vec![target]));
        assert!(matches!(result, Err(TerrainError::Decode(_))));
    }

    #[test]
    fn oversized_tiles_sample_as_sea_level() {
        let target = Cartographic::from_degrees(114.1, 22.3, 0.0);
        let probe = QuantizedMeshTerrainProvider::new(TEMPLATE, 2, Arc::new(MemoryFetcher::new()));
        let url = probe.request(&target).expect("inside scheme").url;
        let mut tile = vec![0u8; 88];
        tile.extend_from_slice(&u32::MAX.to_le_bytes());
        let fetcher = MemoryFetcher::new().with(url, tile);
        let provider = QuantizedMeshTerrainProvider::new(TEMPLATE, 2, Arc::new(fetcher));

        let result = pollster::block_on(provider.sample_most_detailed(vec![target]));
        assert!(matches!(result, Err(TerrainError::Decode(_))));
        let height = pollster::block_on(crate::plugins::terrain::sample_terrain_height(
            &provider, 114.1, 22.3,
        ));
        assert_eq!(height, 0.0);
    }

    #[test]
    fn positions_off_the_globe_are_rejected() {
        let provider =
            QuantizedMeshTerrainProvider::new(TEMPLATE, 2, Arc::new(MemoryFetcher::new()));
        let result = pollster::block_on(
            provider.sample_most_detailed(vec![Cartographic::new(0.0, 2.0, 0.0)]),
        );
        assert!(matches!(
            result,
            Err(TerrainError::OutsideTilingScheme { .. })
        ));
    }
}
