//! Grid inference from a sheet's alpha channel.
//!
//! Rows and columns holding at least one non-transparent pixel form boolean
//! masks; maximal `true` spans ("runs") are cells, the spans between them are
//! padding. The most frequent run length wins (ties go to the longer run).
//! This is a heuristic: sprites with internal transparent gaps produce extra
//! runs, so callers should keep a manual override available.

use crate::config::SplitConfig;
use crate::error::{Result, SheetError};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Maximal contiguous span of `true` values in a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub start: u32,
    pub len: u32,
}

impl Run {
    /// One past the last index of the run.
    pub fn end(&self) -> u32 {
        self.start + self.len
    }
}

/// Grid inferred by [`detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedGrid {
    pub cell_w: u32,
    pub cell_h: u32,
    pub columns: u32,
    pub rows: u32,
    /// Most frequent gap between column runs (0 with a single column).
    pub pad_x: u32,
    /// Most frequent gap between row runs (0 with a single row).
    pub pad_y: u32,
    /// Start of the first column run.
    pub offset_x: u32,
    /// Start of the first row run.
    pub offset_y: u32,
}

impl DetectedGrid {
    /// Split configuration reproducing this grid.
    pub fn to_split_config(&self) -> SplitConfig {
        SplitConfig {
            cell_w: self.cell_w,
            cell_h: self.cell_h,
            columns: self.columns,
            rows: self.rows,
            pad_x: self.pad_x,
            pad_y: self.pad_y,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
        }
    }
}

/// Maximal runs of `true` in `mask`.
pub fn find_runs(mask: &[bool]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    for (i, &v) in mask.iter().enumerate() {
        match (v, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(Run {
                    start: s as u32,
                    len: (i - s) as u32,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(Run {
            start: s as u32,
            len: (mask.len() - s) as u32,
        });
    }
    runs
}

/// Most frequent value; ties resolve to the larger value.
fn most_frequent<I: IntoIterator<Item = u32>>(values: I) -> Option<u32> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(v, _)| v)
}

fn gaps(runs: &[Run]) -> impl Iterator<Item = u32> + '_ {
    runs.windows(2).map(|w| w[1].start - w[0].end())
}

/// Occupied-row and occupied-column masks (alpha > 0), plus whether any pixel is fully transparent.
pub fn occupancy_masks(sheet: &RgbaImage) -> (Vec<bool>, Vec<bool>, bool) {
    let (w, h) = sheet.dimensions();
    let mut rows = vec![false; h as usize];
    let mut cols = vec![false; w as usize];
    let mut any_transparent = false;
    for (x, y, px) in sheet.enumerate_pixels() {
        if px[3] > 0 {
            rows[y as usize] = true;
            cols[x as usize] = true;
        } else {
            any_transparent = true;
        }
    }
    (rows, cols, any_transparent)
}

#[instrument(skip_all)]
/// Infers cell size, counts, padding and offset of a sheet.
pub fn detect(sheet: &RgbaImage) -> Result<DetectedGrid> {
    let (row_mask, col_mask, any_transparent) = occupancy_masks(sheet);
    if !any_transparent {
        return Err(SheetError::NoTransparency);
    }
    let row_runs = find_runs(&row_mask);
    let col_runs = find_runs(&col_mask);
    if row_runs.is_empty() {
        return Err(SheetError::NoRuns { axis: "rows" });
    }
    if col_runs.is_empty() {
        return Err(SheetError::NoRuns { axis: "columns" });
    }

    let cell_h = most_frequent(row_runs.iter().map(|r| r.len)).unwrap_or(0);
    let cell_w = most_frequent(col_runs.iter().map(|r| r.len)).unwrap_or(0);
    if cell_w == 0 || cell_h == 0 {
        return Err(SheetError::InvalidCellSize {
            width: cell_w as i64,
            height: cell_h as i64,
        });
    }
    let grid = DetectedGrid {
        cell_w,
        cell_h,
        columns: col_runs.len() as u32,
        rows: row_runs.len() as u32,
        pad_x: most_frequent(gaps(&col_runs)).unwrap_or(0),
        pad_y: most_frequent(gaps(&row_runs)).unwrap_or(0),
        offset_x: col_runs[0].start,
        offset_y: row_runs[0].start,
    };
    debug!(?grid, "grid detected");
    Ok(grid)
}
