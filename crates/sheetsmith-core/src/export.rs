use crate::assembler::TileRecord;
use crate::model::Placement;
use crate::splitter::{CellRef, ExportedCell, SkippedCell, SplitGrid};
use serde_json::{Value, json};
use std::path::Path;

/// Header row of tilemap metadata CSV files.
pub const TILE_CSV_HEADER: &str = "tilemap,tile,x,y,width,height";

/// Tilemap metadata as CSV (`tilemap,tile,x,y,width,height`), one row per tile.
pub fn tile_records_to_csv(records: &[TileRecord]) -> String {
    let mut s = String::with_capacity(32 * (records.len() + 1));
    s.push_str(TILE_CSV_HEADER);
    s.push_str("\r\n");
    for r in records {
        s.push_str(&format!(
            "{},{},{},{},{},{}\r\n",
            csv_field(&r.tilemap),
            csv_field(&r.tile),
            r.x,
            r.y,
            r.width,
            r.height
        ));
    }
    s
}

/// Quotes a field when it holds a comma, quote or line break; quotes are doubled.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Placements of an assembled sheet as `{ image, size, frames: [...] }`.
pub fn placements_to_json(image: &str, size: (u32, u32), placements: &[Placement]) -> Value {
    json!({
        "image": image,
        "size": {"w": size.0, "h": size.1},
        "frames": placements
            .iter()
            .map(|p| json!({"key": p.key, "x": p.x, "y": p.y, "w": p.width, "h": p.height}))
            .collect::<Vec<_>>(),
    })
}

fn grid_json(grid: &SplitGrid) -> Value {
    json!({
        "cell_w": grid.cell_w,
        "cell_h": grid.cell_h,
        "columns": grid.columns,
        "rows": grid.rows,
        "pad_x": grid.pad_x,
        "pad_y": grid.pad_y,
        "offset_x": grid.offset_x,
        "offset_y": grid.offset_y,
    })
}

fn sheet_json(sheet: Option<&Path>) -> Value {
    sheet
        .map(|p| Value::String(p.display().to_string()))
        .unwrap_or(Value::Null)
}

/// Split manifest: source sheet, base name, resolved grid, written files and skipped cells.
pub fn split_manifest(
    sheet: Option<&Path>,
    base: &str,
    grid: &SplitGrid,
    exported: &[ExportedCell],
    skipped: &[SkippedCell],
) -> Value {
    json!({
        "sheet": sheet_json(sheet),
        "base": base,
        "grid": grid_json(grid),
        "exported": exported
            .iter()
            .map(|e| json!({"row": e.cell.row, "col": e.cell.col, "file": e.file}))
            .collect::<Vec<_>>(),
        "skipped": skipped
            .iter()
            .map(|s| json!({"row": s.cell.row, "col": s.cell.col, "reason": s.reason}))
            .collect::<Vec<_>>(),
    })
}

/// Like [`split_manifest`] but listing selected cells (no files written).
pub fn selection_manifest(sheet: Option<&Path>, base: &str, grid: &SplitGrid, selected: &[CellRef]) -> Value {
    json!({
        "sheet": sheet_json(sheet),
        "base": base,
        "grid": grid_json(grid),
        "selected": selected
            .iter()
            .map(|c| json!({"row": c.row, "col": c.col, "file": c.file_name(base)}))
            .collect::<Vec<_>>(),
    })
}
