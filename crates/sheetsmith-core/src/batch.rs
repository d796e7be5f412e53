//! Folder-scale generation: group frames by name prefix and build one sheet
//! (or one tilemap) per group without going through a canvas.

use crate::assembler::check_canvas_size;
use crate::compositing::{BlendMode, blit_rgba};
use crate::config::{Arrangement, PaddingMode};
use crate::error::{Result, SheetError};
use crate::geometry::{CellMetrics, grid_footprint};
use crate::model::Placement;
use crate::source::InputFrame;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

fn stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

fn tokens(base: &str) -> Vec<&str> {
    base.split(['-', '_']).collect()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `F12` / `f12` style frame token.
fn frame_number(token: &str) -> Option<u64> {
    let rest = token.strip_prefix(['F', 'f'])?;
    if is_digits(rest) { rest.parse().ok() } else { None }
}

fn is_compass(token: &str) -> bool {
    matches!(token, "N" | "E" | "S" | "W" | "n" | "e" | "s" | "w")
}

/// Group name of a sprite file: its first `-`/`_` token, except that a
/// numeric first token followed by a named second token (`001_hero_F1`)
/// groups under the second token.
pub fn extract_group_prefix(name: &str) -> String {
    let base = stem(name);
    let parts = tokens(base);
    let first = parts[0].trim();
    if first.is_empty() {
        return base.to_string();
    }
    if is_digits(first) && parts.len() > 1 {
        let second = parts[1].trim();
        if !second.is_empty() {
            if frame_number(second).is_some() || is_compass(second) || is_digits(second) {
                return first.to_string();
            }
            if second.chars().any(|c| c.is_alphabetic()) {
                return second.to_string();
            }
        }
    }
    first.to_string()
}

/// Ordering key for animation frames within a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpriteSortKey {
    /// Names with an `F<n>` token, by compass direction (N, E, S, W, none) then frame.
    Frame {
        direction: u8,
        frame: u64,
        name: String,
    },
    /// Names ending in a numeric token.
    Numbered { number: u64, name: String },
    Plain { name: String },
}

pub fn sprite_sort_key(name: &str) -> SpriteSortKey {
    let upper = stem(name).to_uppercase();
    let parts = tokens(&upper);
    let direction = parts
        .iter()
        .find_map(|t| match *t {
            "N" => Some(0),
            "E" => Some(1),
            "S" => Some(2),
            "W" => Some(3),
            _ => None,
        })
        .unwrap_or(99);
    if let Some(frame) = parts.iter().find_map(|t| frame_number(t)) {
        return SpriteSortKey::Frame {
            direction,
            frame,
            name: upper,
        };
    }
    let trailing = parts
        .last()
        .filter(|t| is_digits(t))
        .and_then(|t| t.parse().ok());
    match trailing {
        Some(number) => SpriteSortKey::Numbered { number, name: upper },
        None => SpriteSortKey::Plain { name: upper },
    }
}

fn compare_sprites(a: &str, b: &str) -> Ordering {
    sprite_sort_key(a).cmp(&sprite_sort_key(b))
}

/// Groups file names by [`extract_group_prefix`]; each group is sorted by [`sprite_sort_key`].
pub fn group_by_prefix<I, S>(names: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in names {
        let name = name.into();
        groups
            .entry(extract_group_prefix(&name))
            .or_default()
            .push(name);
    }
    for files in groups.values_mut() {
        files.sort_by(|a, b| compare_sprites(a, b));
    }
    groups
}

/// Output file name of a batch sprite sheet.
pub fn sheet_file_name(prefix: &str) -> String {
    format!("{prefix}_Spritesheet.png")
}

/// Output file name of a batch tilemap (the CSV shares its stem).
pub fn tilemap_file_name(folder: &str) -> String {
    format!("{folder}_tilemap.png")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSheetOptions {
    pub arrangement: Arrangement,
    pub columns: u32,
    pub padding_mode: PaddingMode,
    pub padding: u32,
}

impl Default for BatchSheetOptions {
    fn default() -> Self {
        Self {
            arrangement: Arrangement::Grid,
            columns: 4,
            padding_mode: PaddingMode::Fixed,
            padding: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTileOptions {
    pub arrangement: Arrangement,
    pub columns: u32,
    /// Minimum cell side; larger tiles grow the cell.
    pub tile_size: u32,
}

impl Default for BatchTileOptions {
    fn default() -> Self {
        Self {
            arrangement: Arrangement::Grid,
            columns: 8,
            tile_size: 32,
        }
    }
}

/// A generated sheet and its frame placements.
#[derive(Debug, Clone)]
pub struct BuiltSheet {
    pub rgba: RgbaImage,
    pub placements: Vec<Placement>,
}

/// Column / row counts for `n` frames.
pub fn arrange(n: usize, arrangement: Arrangement, columns: u32) -> (u32, u32) {
    let n = n as u32;
    match arrangement {
        Arrangement::Horizontal => (n.max(1), 1),
        Arrangement::Vertical => (1, n.max(1)),
        Arrangement::Grid => {
            let cols = columns.max(1);
            (cols, n.div_ceil(cols).max(1))
        }
    }
}

fn lay_out(
    frames: &[InputFrame],
    cols: u32,
    rows: u32,
    cell: (u32, u32),
    pad: u32,
) -> Result<BuiltSheet> {
    let (cell_w, cell_h) = cell;
    let (width, height) = grid_footprint(cols, rows, CellMetrics::new(cell_w, cell_h, pad));
    let (width, height) = (width.max(1), height.max(1));
    check_canvas_size(width, height)?;
    let mut rgba = RgbaImage::new(width, height);
    let mut placements = Vec::with_capacity(frames.len());
    for (idx, frame) in frames.iter().enumerate() {
        let (row, col) = (idx as u32 / cols, idx as u32 % cols);
        let x = col as i64 * (cell_w as i64 + pad as i64);
        let y = row as i64 * (cell_h as i64 + pad as i64);
        blit_rgba(&frame.image, &mut rgba, x, y, BlendMode::Replace, false);
        placements.push(Placement {
            key: frame.key.clone(),
            x,
            y,
            width: frame.image.width(),
            height: frame.image.height(),
        });
    }
    Ok(BuiltSheet { rgba, placements })
}

fn max_size(frames: &[InputFrame]) -> (u32, u32) {
    frames.iter().fold((0, 0), |(w, h), f| {
        (w.max(f.image.width()), h.max(f.image.height()))
    })
}

#[instrument(skip_all, fields(frames = frames.len()))]
/// Packs frames in the given order into equal cells of the largest frame size.
pub fn build_sprite_sheet(frames: &[InputFrame], opts: BatchSheetOptions) -> Result<BuiltSheet> {
    if frames.is_empty() {
        return Err(SheetError::Empty);
    }
    let (cell_w, cell_h) = max_size(frames);
    let pad = match opts.padding_mode {
        PaddingMode::Fixed => opts.padding,
        PaddingMode::FrameWidth => cell_w,
        PaddingMode::FrameHeight => cell_h,
    };
    let (cols, rows) = arrange(frames.len(), opts.arrangement, opts.columns);
    debug!(cols, rows, cell_w, cell_h, pad, "sprite sheet layout");
    lay_out(frames, cols, rows, (cell_w, cell_h), pad)
}

#[instrument(skip_all, fields(frames = frames.len()))]
/// Packs tiles into unpadded cells of `max(tile_size, largest tile)`.
pub fn build_tilemap(frames: &[InputFrame], opts: BatchTileOptions) -> Result<BuiltSheet> {
    if frames.is_empty() {
        return Err(SheetError::Empty);
    }
    let (max_w, max_h) = max_size(frames);
    let cell = (opts.tile_size.max(max_w).max(1), opts.tile_size.max(max_h).max(1));
    let (cols, rows) = arrange(frames.len(), opts.arrangement, opts.columns);
    debug!(cols, rows, cell_w = cell.0, cell_h = cell.1, "tilemap layout");
    lay_out(frames, cols, rows, cell, 0)
}

/// What a [`BatchJob`] produces.
#[derive(Debug, Clone, Copy)]
pub enum BatchKind {
    Sheet(BatchSheetOptions),
    Tilemap(BatchTileOptions),
}

/// One independent unit of batch work.
pub struct BatchJob {
    pub name: String,
    pub frames: Vec<InputFrame>,
    pub kind: BatchKind,
}

impl BatchJob {
    fn run(&self) -> Result<BuiltSheet> {
        match self.kind {
            BatchKind::Sheet(opts) => build_sprite_sheet(&self.frames, opts),
            BatchKind::Tilemap(opts) => build_tilemap(&self.frames, opts),
        }
    }
}

/// Runs every job and returns `(name, result)` in job order. With the
/// `parallel` feature jobs run on the rayon pool.
pub fn build_many(jobs: &[BatchJob]) -> Vec<(String, Result<BuiltSheet>)> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        jobs.par_iter()
            .map(|job| (job.name.clone(), job.run()))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        jobs.iter()
            .map(|job| (job.name.clone(), job.run()))
            .collect()
    }
}
