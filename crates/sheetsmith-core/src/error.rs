use thiserror::Error;

use crate::model::LayerId;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid cell size: {width}x{height} (both sides must be > 0)")]
    InvalidCellSize { width: i64, height: i64 },
    #[error("Nothing to assemble")]
    Empty,
    #[error("Sheet has no transparent pixels; cannot tell cells apart")]
    NoTransparency,
    #[error("No occupied {axis} found in sheet")]
    NoRuns { axis: &'static str },
    #[error("Layer {0} does not exist")]
    LayerNotFound(LayerId),
    #[error("Cannot delete the last remaining layer")]
    LastLayer,
    #[error("{0} requires Grid layout mode")]
    NotGridMode(&'static str),
    #[error("Source image not found: {0}")]
    MissingSource(String),
}

pub type Result<T> = std::result::Result<T, SheetError>;
