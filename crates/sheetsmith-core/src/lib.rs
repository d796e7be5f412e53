//! Core library for assembling sprite sheets and tilemaps.
//!
//! - Canvas: frames placed on a column grid (or free-form), grouped in layers with
//!   per-layer anchors, selection, drag gestures and bounded position undo
//! - Assembly: `rasterize` composites the visible frames into one RGBA sheet plus
//!   placement / tilemap metadata
//! - Splitting: `detect` infers the grid of an existing sheet and `SheetSplitter`
//!   cuts it back into per-cell images
//! - Batch: `batch` builds one sheet per name-prefix group or one tilemap per folder
//!
//! Quick example:
//! ```ignore
//! use sheetsmith_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let img = image::open("hero_F1.png")?.to_rgba8();
//! let mut canvas = CanvasModel::new(GridLayoutConfig::builder().columns(8).build());
//! canvas.add_frames(vec![InputFrame::new("hero_F1.png", img)]);
//! let sheet = rasterize(&canvas, AssembleOptions::default())?;
//! sheet.rgba.save("hero_sheet.png")?;
//! # Ok(()) }
//! ```

pub mod anchor;
pub mod assembler;
pub mod batch;
pub mod canvas;
pub mod compositing;
pub mod config;
pub mod detect;
pub mod document;
pub mod error;
pub mod export;
pub mod geometry;
pub mod layers;
pub mod model;
pub mod source;
pub mod splitter;
pub mod viewport;

pub use assembler::*;
pub use canvas::*;
pub use config::*;
pub use detect::*;
pub use document::*;
pub use error::*;
pub use export::*;
pub use layers::*;
pub use model::*;
pub use source::*;
pub use splitter::*;

/// Convenience prelude for common types and functions.
/// Importing `sheetsmith_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::assembler::{
        AssembleOptions, AssembledSheet, TileRecord, canvas_size, export_metadata, rasterize,
        rasterize_reloading,
    };
    pub use crate::batch::{BatchSheetOptions, BatchTileOptions, build_sprite_sheet, build_tilemap};
    pub use crate::canvas::{AlignReport, Axis, CanvasModel, SelectMode};
    pub use crate::compositing::BlendMode;
    pub use crate::config::{
        AnchorMode, AnchorSource, AnchorType, Arrangement, GridLayoutConfig,
        GridLayoutConfigBuilder, LayoutMode, PaddingMode, SheetKind, SplitConfig, TileSizeMode,
    };
    pub use crate::detect::{DetectedGrid, detect};
    pub use crate::document::{LayoutDocument, LayoutMeta, LoadReport, load_layout, save_layout};
    pub use crate::error::{Result, SheetError};
    pub use crate::export::tile_records_to_csv;
    pub use crate::geometry::CellMetrics;
    pub use crate::layers::{Layer, LayerStack};
    pub use crate::model::{Anchor, Frame, FrameId, LayerId, Placement, Rect};
    pub use crate::source::{FolderSource, FrameSource, InputFrame, MemorySource};
    pub use crate::splitter::{CellRef, GridLine, SheetSplitter, SplitGrid, get_grid};
    pub use crate::viewport::Viewport;
}
