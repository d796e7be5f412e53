//! JSON layout documents: save and restore a canvas by file name.
//!
//! Numbers are read as signed integers so that hand-edited documents with
//! out-of-range values can be normalized (and reported) instead of rejected.

use crate::canvas::CanvasModel;
use crate::config::{
    AnchorMode, AnchorSource, AnchorType, GridLayoutConfig, LayoutMode, PaddingMode, SheetKind,
    TileSizeMode,
};
use crate::error::Result;
use crate::layers::{Layer, LayerStack};
use crate::model::{Anchor, Frame, FrameId, LayerId};
use crate::source::FrameSource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Where a canvas' frames come from and what its export is called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutMeta {
    pub input_root: String,
    pub source_folder: String,
    pub output_name: String,
}

/// Serialized form of one layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerEntry {
    pub id: u32,
    pub name: String,
    pub visible: bool,
    pub anchor_mode: AnchorMode,
    pub anchor_source: AnchorSource,
    pub anchor_type: AnchorType,
    pub anchor_padding: i64,
    pub anchor_x: Option<i32>,
    pub anchor_y: Option<i32>,
}

impl Default for LayerEntry {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Layer 1".into(),
            visible: true,
            anchor_mode: AnchorMode::default(),
            anchor_source: AnchorSource::default(),
            anchor_type: AnchorType::default(),
            anchor_padding: 0,
            anchor_x: None,
            anchor_y: None,
        }
    }
}

/// Serialized form of one placed frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutItem {
    /// File name relative to the source folder.
    pub file: String,
    pub x: f64,
    pub y: f64,
    /// Informational; the decoded image decides the real size on load.
    pub width: u32,
    pub height: u32,
    pub layer_id: Option<u32>,
    pub visible: bool,
    pub anchor_inherit: bool,
    pub anchor: Option<Anchor>,
    pub order: Option<u64>,
}

impl Default for LayoutItem {
    fn default() -> Self {
        Self {
            file: String::new(),
            x: 0.0,
            y: 0.0,
            width: 0,
            height: 0,
            layer_id: None,
            visible: true,
            anchor_inherit: true,
            anchor: None,
            order: None,
        }
    }
}

/// A saved canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutDocument {
    #[serde(rename = "type")]
    pub kind: SheetKind,
    pub layout_mode: LayoutMode,
    pub columns: i64,
    pub rows: i64,
    pub snap: bool,
    pub show_grid: bool,
    pub show_guides: bool,
    pub sprite_padding_mode: PaddingMode,
    pub sprite_padding: i64,
    pub tile_size_mode: TileSizeMode,
    pub tile_size: i64,
    pub tile_export_meta: bool,
    pub input_root: String,
    pub source_folder: String,
    pub output_name: String,
    pub layers: Vec<LayerEntry>,
    pub active_layer_id: Option<u32>,
    pub reference_layer_id: Option<u32>,
    pub items: Vec<LayoutItem>,
}

impl Default for LayoutDocument {
    fn default() -> Self {
        let cfg = GridLayoutConfig::default();
        Self {
            kind: cfg.kind,
            layout_mode: cfg.layout_mode,
            columns: cfg.columns as i64,
            rows: cfg.rows as i64,
            snap: cfg.snap,
            show_grid: cfg.show_grid,
            show_guides: cfg.show_guides,
            sprite_padding_mode: cfg.padding_mode,
            sprite_padding: cfg.padding as i64,
            tile_size_mode: cfg.tile_size_mode,
            tile_size: cfg.tile_size as i64,
            tile_export_meta: cfg.export_tile_meta,
            input_root: String::new(),
            source_folder: String::new(),
            output_name: String::new(),
            layers: Vec::new(),
            active_layer_id: None,
            reference_layer_id: None,
            items: Vec::new(),
        }
    }
}

impl LayoutDocument {
    /// Sets where frames are loaded from and the export base name.
    pub fn with_source(mut self, source_folder: impl Into<String>, output_name: impl Into<String>) -> Self {
        self.source_folder = source_folder.into();
        self.output_name = output_name.into();
        self
    }

    pub fn meta(&self) -> LayoutMeta {
        LayoutMeta {
            input_root: self.input_root.clone(),
            source_folder: self.source_folder.clone(),
            output_name: self.output_name.clone(),
        }
    }

    /// Layout configuration with invalid numbers replaced. Each replacement
    /// is appended to `warnings`.
    pub fn layout_config(&self, warnings: &mut Vec<String>) -> GridLayoutConfig {
        let defaults = GridLayoutConfig::default();
        let columns = if self.columns < 1 {
            warnings.push(format!("columns {} < 1, using 1", self.columns));
            1
        } else {
            clamp_u32(self.columns)
        };
        let rows = if self.rows < 0 {
            warnings.push(format!("rows {} < 0, deriving rows", self.rows));
            0
        } else {
            clamp_u32(self.rows)
        };
        let padding = if self.sprite_padding < 0 {
            warnings.push(format!("sprite_padding {} < 0, using 0", self.sprite_padding));
            0
        } else {
            clamp_u32(self.sprite_padding)
        };
        let tile_size = if self.tile_size < 1 {
            warnings.push(format!(
                "tile_size {} < 1, using {}",
                self.tile_size, defaults.tile_size
            ));
            defaults.tile_size
        } else {
            clamp_u32(self.tile_size)
        };
        GridLayoutConfig {
            kind: self.kind,
            layout_mode: self.layout_mode,
            columns,
            rows,
            padding_mode: self.sprite_padding_mode,
            padding,
            tile_size_mode: self.tile_size_mode,
            tile_size,
            snap: self.snap,
            show_grid: self.show_grid,
            show_guides: self.show_guides,
            export_tile_meta: self.tile_export_meta,
        }
    }
}

fn clamp_u32(v: i64) -> u32 {
    v.clamp(0, u32::MAX as i64) as u32
}

/// What happened while restoring a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Items whose file was missing or could not be decoded.
    pub missing: Vec<String>,
    /// Items whose layer id was unknown and were put on the first layer.
    pub layer_fallbacks: usize,
    /// Human-readable notes about normalized values.
    pub warnings: Vec<String>,
}

impl CanvasModel {
    /// Captures the canvas as a document, items in insertion order.
    pub fn to_document(&self) -> LayoutDocument {
        let cfg = self.config();
        let meta = self.meta();
        let layers = self
            .layers()
            .iter()
            .map(|l| LayerEntry {
                id: l.id.0,
                name: l.name.clone(),
                visible: l.visible,
                anchor_mode: l.anchor_mode,
                anchor_source: l.anchor_source,
                anchor_type: l.anchor_type,
                anchor_padding: l.anchor_padding as i64,
                anchor_x: l.anchor.map(|a| a.x),
                anchor_y: l.anchor.map(|a| a.y),
            })
            .collect();
        let mut frames: Vec<&Frame> = self.frames().collect();
        frames.sort_by_key(|f| f.order);
        let items = frames
            .into_iter()
            .map(|f| LayoutItem {
                file: f.key.clone(),
                x: f.x,
                y: f.y,
                width: f.width,
                height: f.height,
                layer_id: Some(f.layer.0),
                visible: f.visible,
                anchor_inherit: f.anchor_inherit,
                anchor: f.anchor,
                order: Some(f.order),
            })
            .collect();
        LayoutDocument {
            kind: cfg.kind,
            layout_mode: cfg.layout_mode,
            columns: cfg.columns as i64,
            rows: cfg.rows as i64,
            snap: cfg.snap,
            show_grid: cfg.show_grid,
            show_guides: cfg.show_guides,
            sprite_padding_mode: cfg.padding_mode,
            sprite_padding: cfg.padding as i64,
            tile_size_mode: cfg.tile_size_mode,
            tile_size: cfg.tile_size as i64,
            tile_export_meta: cfg.export_tile_meta,
            input_root: meta.input_root.clone(),
            source_folder: meta.source_folder.clone(),
            output_name: meta.output_name.clone(),
            layers,
            active_layer_id: Some(self.layers().active().0),
            reference_layer_id: Some(self.layers().reference().0),
            items,
        }
    }

    #[instrument(skip_all)]
    /// Rebuilds a canvas from a document, resolving every item's pixels
    /// through `source`. Missing files are skipped, unknown layers fall back
    /// to the first layer and invalid numbers are normalized; all of it is
    /// counted in the returned report.
    pub fn from_document(doc: &LayoutDocument, source: &dyn FrameSource) -> Result<(CanvasModel, LoadReport)> {
        let mut report = LoadReport::default();
        let config = doc.layout_config(&mut report.warnings);

        let mut seen = HashSet::new();
        let mut layers = Vec::with_capacity(doc.layers.len());
        for entry in &doc.layers {
            if !seen.insert(entry.id) {
                report
                    .warnings
                    .push(format!("duplicate layer id {} ignored", entry.id));
                continue;
            }
            let mut layer = Layer::new(LayerId(entry.id), entry.name.clone());
            layer.visible = entry.visible;
            layer.anchor_mode = entry.anchor_mode;
            layer.anchor_source = entry.anchor_source;
            layer.anchor_type = entry.anchor_type;
            layer.anchor_padding = if entry.anchor_padding < 0 {
                report.warnings.push(format!(
                    "layer {} anchor_padding {} < 0, using 0",
                    entry.id, entry.anchor_padding
                ));
                0
            } else {
                entry.anchor_padding.min(i32::MAX as i64) as i32
            };
            layer.anchor = match (entry.anchor_x, entry.anchor_y) {
                (Some(x), Some(y)) => Some(Anchor::new(x, y)),
                _ => None,
            };
            layers.push(layer);
        }
        let stack = LayerStack::from_layers(
            layers,
            doc.active_layer_id.map(LayerId),
            doc.reference_layer_id.map(LayerId),
        );
        let mut canvas = CanvasModel::with_layers(config, stack);
        canvas.set_meta(doc.meta());

        for (index, item) in doc.items.iter().enumerate() {
            if item.file.is_empty() {
                report.warnings.push(format!("item {index} has no file name"));
                continue;
            }
            let image = match source.load(&item.file) {
                Ok(img) => img,
                Err(e) => {
                    warn!(file = %item.file, error = %e, "layout item skipped");
                    report.missing.push(item.file.clone());
                    continue;
                }
            };
            let requested = item.layer_id.map(LayerId);
            let layer = match requested {
                Some(id) if canvas.layers().contains(id) => id,
                _ => {
                    if requested.is_some() {
                        report.layer_fallbacks += 1;
                    }
                    canvas.layers().first_id()
                }
            };
            let (width, height) = image.dimensions();
            canvas.restore_frame(Frame {
                id: FrameId(0),
                key: item.file.clone(),
                image: Arc::new(image),
                width,
                height,
                x: item.x,
                y: item.y,
                visible: item.visible,
                layer,
                anchor: item.anchor,
                anchor_inherit: item.anchor_inherit,
                order: item.order.unwrap_or(index as u64),
            });
            report.loaded += 1;
        }

        for note in &report.warnings {
            warn!("{note}");
        }
        if report.layer_fallbacks > 0 {
            warn!(count = report.layer_fallbacks, "items moved to the first layer");
        }
        info!(
            loaded = report.loaded,
            missing = report.missing.len(),
            "layout restored"
        );
        Ok((canvas, report))
    }
}

/// Writes a document as pretty JSON.
pub fn save_layout(path: &Path, doc: &LayoutDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "layout saved");
    Ok(())
}

/// Reads a JSON document; absent fields take their defaults.
pub fn load_layout(path: &Path) -> Result<LayoutDocument> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
