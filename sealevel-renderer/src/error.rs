use std::io;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("nothing stored at {0}")]
    NotFound(String),
}

#[derive(thiserror::Error, Debug)]
pub enum TilesetError {
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("invalid tileset.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("root tile has no bounding volume")]
    MissingBoundingVolume,
    #[error("{kind} bounding volume needs {expected} numbers, found {found}")]
    InvalidBoundingVolume {
        kind: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("root transform needs 16 numbers, found {0}")]
    InvalidTransform(usize),
    #[error("bounding volume center is too close to the center of the earth")]
    DegenerateCenter,
}

#[derive(thiserror::Error, Debug)]
pub enum TerrainError {
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("could not decode terrain tile: {0}")]
    Decode(#[from] io::Error),
    #[error("({longitude}, {latitude}) is outside the tiling scheme")]
    OutsideTilingScheme { longitude: f64, latitude: f64 },
    #[error("no triangle of tile {level}/{x}/{y} covers the position")]
    NoTriangle { level: u32, x: u32, y: u32 },
    #[error("bad tile url template: {0}")]
    UrlTemplate(String),
}

#[derive(thiserror::Error, Debug)]
pub enum SeaLevelError {
    #[error("failed to load tileset {url}: {source}")]
    DatasetLoad {
        url: String,
        #[source]
        source: TilesetError,
    },
    #[error("terrain sampling failed: {0}")]
    TerrainSample(#[from] TerrainError),
    #[error("ui element '{0}' is missing")]
    MissingUiElement(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
