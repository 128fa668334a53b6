use bevy::math::{DMat3, DMat4, DVec3};
use sealevel_scene::{BoundingSphere, Rectangle};
use serde::Deserialize;

use crate::error::TilesetError;

/// The parts of a 3D Tiles `tileset.json` the viewer cares about.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetJson {
    pub asset: Asset,
    #[serde(default)]
    pub geometric_error: f64,
    pub root: Tile,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub version: String,
    #[serde(default)]
    pub tileset_version: Option<String>,
    #[serde(default)]
    pub gltf_up_axis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    #[serde(default)]
    pub bounding_volume: Option<BoundingVolume>,
    #[serde(default)]
    pub geometric_error: f64,
    #[serde(default)]
    pub refine: Option<String>,
    #[serde(default)]
    pub transform: Option<Vec<f64>>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub children: Vec<Tile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub uri: Option<String>,
    /// Pre-1.0 tilesets name the field `url`.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BoundingVolume {
    #[serde(default, rename = "box")]
    pub oriented_box: Option<Vec<f64>>,
    #[serde(default)]
    pub region: Option<Vec<f64>>,
    #[serde(default)]
    pub sphere: Option<Vec<f64>>,
}

impl TilesetJson {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TilesetError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn root_transform(&self) -> Result<DMat4, TilesetError> {
        self.root.transform()
    }

    /// World-space bounds of the root tile.
    pub fn bounding_sphere(&self) -> Result<BoundingSphere, TilesetError> {
        let volume = self
            .root
            .bounding_volume
            .as_ref()
            .ok_or(TilesetError::MissingBoundingVolume)?;
        volume.to_bounding_sphere(&self.root_transform()?)
    }

    pub fn tile_count(&self) -> usize {
        self.root.count()
    }
}

impl Tile {
    /// Column-major, identity when absent.
    pub fn transform(&self) -> Result<DMat4, TilesetError> {
        match &self.transform {
            None => Ok(DMat4::IDENTITY),
            Some(values) => {
                let array: &[f64; 16] = values
                    .as_slice()
                    .try_into()
                    .map_err(|_| TilesetError::InvalidTransform(values.len()))?;
                Ok(DMat4::from_cols_array(array))
            }
        }
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Tile::count).sum::<usize>()
    }
}

impl BoundingVolume {
    /// Box takes precedence over region, region over sphere. Regions are
    /// already geographic so `transform` is ignored for them.
    pub fn to_bounding_sphere(&self, transform: &DMat4) -> Result<BoundingSphere, TilesetError> {
        if let Some(values) = &self.oriented_box {
            let [cx, cy, cz, ux, uy, uz, vx, vy, vz, wx, wy, wz] =
                numbers::<12>("box", values)?;
            let half_axes = DMat3::from_cols(
                DVec3::new(ux, uy, uz),
                DVec3::new(vx, vy, vz),
                DVec3::new(wx, wy, wz),
            );
            let local =
                BoundingSphere::from_oriented_bounding_box(DVec3::new(cx, cy, cz), &half_axes);
            return Ok(local.transform(transform));
        }
        if let Some(values) = &self.region {
            let [west, south, east, north, minimum_height, maximum_height] =
                numbers::<6>("region", values)?;
            let rectangle = Rectangle::new(west, south, east, north);
            return Ok(BoundingSphere::from_rectangle_3d(
                &rectangle,
                None,
                minimum_height,
                maximum_height,
            ));
        }
        if let Some(values) = &self.sphere {
            let [x, y, z, radius] = numbers::<4>("sphere", values)?;
            let local = BoundingSphere::new(DVec3::new(x, y, z), radius);
            return Ok(local.transform(transform));
        }
        Err(TilesetError::MissingBoundingVolume)
    }
}

fn numbers<const N: usize>(kind: &'static str, values: &[f64]) -> Result<[f64; N], TilesetError> {
    <[f64; N]>::try_from(values).map_err(|_| TilesetError::InvalidBoundingVolume {
        kind,
        expected: N,
        found: values.len(),
    })
}
