use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What is being assembled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SheetKind {
    /// Animation frames with configurable padding between cells.
    #[default]
    Spritesheet,
    /// Tiles on a fixed or per-tile cell size with no padding; exports CSV metadata.
    Tilemap,
}

impl FromStr for SheetKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spritesheet" | "sprite_sheet" | "sheet" => Ok(Self::Spritesheet),
            "tilemap" | "tiles" => Ok(Self::Tilemap),
            _ => Err(()),
        }
    }
}

/// Frame placement mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Cells on a column grid; snapping and cell operations are available.
    #[default]
    Grid,
    /// Frames are positioned freely; new frames get a small diagonal offset.
    #[serde(rename = "Free-form")]
    FreeForm,
}

impl FromStr for LayoutMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "free-form" | "freeform" | "free_form" | "free" => Ok(Self::FreeForm),
            _ => Err(()),
        }
    }
}

/// Sprite sheet padding between cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaddingMode {
    /// Use `GridLayoutConfig::padding` pixels.
    #[default]
    Fixed,
    /// Pad by one cell width.
    #[serde(rename = "Frame width")]
    FrameWidth,
    /// Pad by one cell height.
    #[serde(rename = "Frame height")]
    FrameHeight,
}

impl FromStr for PaddingMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "fixed" => Ok(Self::Fixed),
            "frame width" | "framewidth" | "frame_width" | "frame-width" => Ok(Self::FrameWidth),
            "frame height" | "frameheight" | "frame_height" | "frame-height" => Ok(Self::FrameHeight),
            _ => Err(()),
        }
    }
}

/// Tilemap cell sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TileSizeMode {
    /// Every cell is `tile_size` square regardless of frame sizes.
    #[default]
    Force,
    /// Cells grow to the largest tile on the canvas.
    #[serde(rename = "Per tile")]
    PerTile,
}

impl FromStr for TileSizeMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "force" | "forced" => Ok(Self::Force),
            "per tile" | "pertile" | "auto" => Ok(Self::PerTile),
            _ => Err(()),
        }
    }
}

/// How a layer derives the anchors of its frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AnchorMode {
    #[default]
    Off,
    /// One anchor shared by every frame of the layer.
    Global,
    /// Each frame carries its own anchor.
    #[serde(rename = "Per-frame")]
    PerFrame,
}

impl FromStr for AnchorMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "global" => Ok(Self::Global),
            "per-frame" | "per_frame" | "perframe" => Ok(Self::PerFrame),
            _ => Err(()),
        }
    }
}

/// Whether anchors are detected from pixels or entered by hand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AnchorSource {
    #[default]
    Auto,
    Manual,
}

impl FromStr for AnchorSource {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(()),
        }
    }
}

/// Vertical reference used by automatic anchor detection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AnchorType {
    Top,
    #[default]
    Bottom,
    Center,
}

impl FromStr for AnchorType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" | "feet" => Ok(Self::Bottom),
            "center" | "centre" | "middle" => Ok(Self::Center),
            _ => Err(()),
        }
    }
}

/// Batch arrangement of frames in a generated sheet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Arrangement {
    #[default]
    Grid,
    /// Single row.
    Horizontal,
    /// Single column.
    Vertical,
}

impl FromStr for Arrangement {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "horizontal" | "row" => Ok(Self::Horizontal),
            "vertical" | "column" => Ok(Self::Vertical),
            _ => Err(()),
        }
    }
}

/// Grid layout of an assembly canvas.
/// Key notes:
///   - `kind` decides how cells are sized (sprite sheet padding vs. tile size)
///   - `layout_mode` switches between grid placement and free-form dragging
///   - `rows == 0` means rows are derived from the frames on the canvas
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridLayoutConfig {
    #[serde(default)]
    pub kind: SheetKind,
    #[serde(default)]
    pub layout_mode: LayoutMode,
    /// Columns in Grid mode (>= 1).
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Rows in Grid mode; 0 derives rows from frame positions.
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub padding_mode: PaddingMode,
    /// Pixels between cells when `padding_mode` is `Fixed`.
    #[serde(default = "default_padding")]
    pub padding: u32,
    #[serde(default)]
    pub tile_size_mode: TileSizeMode,
    /// Forced tilemap cell size, and the fallback cell size of empty tilemaps.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Snap positions to the grid after moves (Grid mode only).
    #[serde(default = "default_true")]
    pub snap: bool,
    #[serde(default = "default_true")]
    pub show_grid: bool,
    #[serde(default)]
    pub show_guides: bool,
    /// Write the tilemap CSV next to the exported PNG.
    #[serde(default = "default_true")]
    pub export_tile_meta: bool,
}

impl Default for GridLayoutConfig {
    fn default() -> Self {
        Self {
            kind: SheetKind::default(),
            layout_mode: LayoutMode::default(),
            columns: default_columns(),
            rows: 0,
            padding_mode: PaddingMode::default(),
            padding: default_padding(),
            tile_size_mode: TileSizeMode::default(),
            tile_size: default_tile_size(),
            snap: true,
            show_grid: true,
            show_guides: false,
            export_tile_meta: true,
        }
    }
}

impl GridLayoutConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if the column count is zero or a forced tile size is zero.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SheetError;

        if self.columns == 0 {
            return Err(SheetError::InvalidConfig("columns must be >= 1".into()));
        }
        if self.kind == SheetKind::Tilemap
            && self.tile_size_mode == TileSizeMode::Force
            && self.tile_size == 0
        {
            return Err(SheetError::InvalidCellSize {
                width: 0,
                height: 0,
            });
        }
        Ok(())
    }

    pub fn is_grid(&self) -> bool {
        self.layout_mode == LayoutMode::Grid
    }

    /// Snapping applies only to grid layouts.
    pub fn snap_active(&self) -> bool {
        self.snap && self.is_grid()
    }

    /// Create a fluent builder for `GridLayoutConfig`.
    pub fn builder() -> GridLayoutConfigBuilder {
        GridLayoutConfigBuilder::new()
    }
}

fn default_columns() -> u32 {
    4
}
fn default_padding() -> u32 {
    1
}
fn default_tile_size() -> u32 {
    32
}
fn default_true() -> bool {
    true
}

/// Builder for `GridLayoutConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct GridLayoutConfigBuilder {
    cfg: GridLayoutConfig,
}

impl GridLayoutConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: GridLayoutConfig::default(),
        }
    }
    pub fn kind(mut self, v: SheetKind) -> Self {
        self.cfg.kind = v;
        self
    }
    pub fn layout_mode(mut self, v: LayoutMode) -> Self {
        self.cfg.layout_mode = v;
        self
    }
    pub fn columns(mut self, v: u32) -> Self {
        self.cfg.columns = v;
        self
    }
    pub fn rows(mut self, v: u32) -> Self {
        self.cfg.rows = v;
        self
    }
    pub fn padding_mode(mut self, v: PaddingMode) -> Self {
        self.cfg.padding_mode = v;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn tile_size_mode(mut self, v: TileSizeMode) -> Self {
        self.cfg.tile_size_mode = v;
        self
    }
    pub fn tile_size(mut self, v: u32) -> Self {
        self.cfg.tile_size = v;
        self
    }
    pub fn snap(mut self, v: bool) -> Self {
        self.cfg.snap = v;
        self
    }
    pub fn show_grid(mut self, v: bool) -> Self {
        self.cfg.show_grid = v;
        self
    }
    pub fn show_guides(mut self, v: bool) -> Self {
        self.cfg.show_guides = v;
        self
    }
    pub fn export_tile_meta(mut self, v: bool) -> Self {
        self.cfg.export_tile_meta = v;
        self
    }
    pub fn build(self) -> GridLayoutConfig {
        self.cfg
    }
}

/// Partitioning of an existing sheet. Zero `columns`/`rows` are derived from the sheet size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitConfig {
    pub cell_w: u32,
    pub cell_h: u32,
    #[serde(default)]
    pub columns: u32,
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub pad_x: u32,
    #[serde(default)]
    pub pad_y: u32,
    /// Pixels skipped at the left / top edge before the first cell.
    #[serde(default)]
    pub offset_x: u32,
    #[serde(default)]
    pub offset_y: u32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            cell_w: 32,
            cell_h: 32,
            columns: 0,
            rows: 0,
            pad_x: 0,
            pad_y: 0,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

impl SplitConfig {
    pub fn with_cell(cell_w: u32, cell_h: u32) -> Self {
        Self {
            cell_w,
            cell_h,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.cell_w == 0 || self.cell_h == 0 {
            return Err(crate::error::SheetError::InvalidCellSize {
                width: self.cell_w as i64,
                height: self.cell_h as i64,
            });
        }
        Ok(())
    }
}
