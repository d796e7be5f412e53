//! The assembly canvas: placed frames, layers, selection, drag gestures and undo.
//!
//! Every operation here is a plain state transition so a UI layer only has to
//! forward pointer events (`begin_drag` / `update_drag` / `end_drag`) and
//! button presses. Position-changing operations push one undo snapshot before
//! their first actual change; no-op moves leave the undo stack untouched.

use crate::anchor;
use crate::config::GridLayoutConfig;
use crate::document::LayoutMeta;
use crate::error::{Result, SheetError};
use crate::geometry::{self, CellMetrics};
use crate::layers::LayerStack;
use crate::model::{Anchor, Frame, FrameId, LayerId};
use crate::source::InputFrame;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of undo snapshots kept.
pub const UNDO_DEPTH: usize = 10;

/// Offset applied to copies in free-form layouts.
pub const COPY_OFFSET: f64 = 10.0;

type PositionSnapshot = HashMap<FrameId, (f64, f64)>;

/// Alignment axis for [`CanvasModel::align`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Share the first frame's `y` (frames end up on one row).
    Horizontal,
    /// Share the first frame's `x` (frames end up in one column).
    Vertical,
}

/// How a click changes the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    #[default]
    Replace,
    Add,
    Toggle,
}

/// Selected frames in selection order (the first one is the alignment reference).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<FrameId>,
}

impl Selection {
    pub fn ids(&self) -> &[FrameId] {
        &self.ids
    }
    pub fn first(&self) -> Option<FrameId> {
        self.ids.first().copied()
    }
    pub fn contains(&self, id: FrameId) -> bool {
        self.ids.contains(&id)
    }
    pub fn len(&self) -> usize {
        self.ids.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
    fn insert(&mut self, id: FrameId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }
    fn remove(&mut self, id: FrameId) {
        self.ids.retain(|s| *s != id);
    }
    fn clear(&mut self) {
        self.ids.clear();
    }
}

#[derive(Debug, Clone)]
struct DragState {
    start: (f64, f64),
    origins: Vec<(FrameId, f64, f64)>,
    snapshot_pushed: bool,
}

/// Outcome of [`CanvasModel::align_layer_to_reference`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignReport {
    /// Frames translated onto their reference anchor.
    pub aligned: usize,
    /// Frames skipped because either side had no resolvable anchor.
    pub no_anchor: usize,
    /// Frames skipped because no reference frame shares their cell.
    pub no_counterpart: usize,
    /// Active-layer frames larger than the shared cell; their cell match may be off.
    pub oversized: Vec<FrameId>,
}

/// Authoritative state of an assembly canvas.
#[derive(Debug, Clone)]
pub struct CanvasModel {
    config: GridLayoutConfig,
    meta: LayoutMeta,
    layers: LayerStack,
    frames: BTreeMap<FrameId, Frame>,
    next_frame_id: u64,
    next_order: u64,
    selection: Selection,
    undo: VecDeque<PositionSnapshot>,
    drag: Option<DragState>,
}

impl Default for CanvasModel {
    fn default() -> Self {
        Self::new(GridLayoutConfig::default())
    }
}

impl CanvasModel {
    pub fn new(config: GridLayoutConfig) -> Self {
        Self::with_layers(config, LayerStack::new())
    }

    pub fn with_layers(config: GridLayoutConfig, layers: LayerStack) -> Self {
        Self {
            config,
            meta: LayoutMeta::default(),
            layers,
            frames: BTreeMap::new(),
            next_frame_id: 1,
            next_order: 0,
            selection: Selection::default(),
            undo: VecDeque::new(),
            drag: None,
        }
    }

    // ---------- accessors ----------

    pub fn config(&self) -> &GridLayoutConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GridLayoutConfig) {
        self.config = config;
    }

    /// Source folder, input root and output name carried through documents.
    pub fn meta(&self) -> &LayoutMeta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: LayoutMeta) {
        self.meta = meta;
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Mutable access for renaming, reordering and anchor configuration.
    /// Use [`CanvasModel::delete_layer`] to delete, so frames get reassigned.
    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(&id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Cell metrics for the frames currently on the canvas.
    pub fn metrics(&self) -> CellMetrics {
        geometry::compute_cell_and_padding(
            self.frames.values().map(|f| (f.width, f.height)),
            std::iter::empty(),
            &self.config,
        )
    }

    /// Drawn frames in z-order.
    pub fn visible_frames(&self) -> Vec<&Frame> {
        self.layers.visible_frames(self.frames.values())
    }

    /// Frames of one layer in insertion order.
    pub fn layer_frames(&self, layer: LayerId) -> Vec<&Frame> {
        let mut out: Vec<&Frame> = self.frames.values().filter(|f| f.layer == layer).collect();
        out.sort_by_key(|f| f.order);
        out
    }

    fn layer_head(&self, layer: LayerId) -> Option<&Frame> {
        self.frames
            .values()
            .filter(|f| f.layer == layer)
            .min_by_key(|f| f.order)
    }

    // ---------- frame lifecycle ----------

    /// Adds frames to the active layer at the next free grid positions.
    /// Keys already on the canvas are skipped. Returns the new ids.
    pub fn add_frames(&mut self, inputs: Vec<InputFrame>) -> Vec<FrameId> {
        let mut seen: HashSet<String> = self.frames.values().map(|f| f.key.clone()).collect();
        let mut pending: Vec<InputFrame> = Vec::with_capacity(inputs.len());
        for input in inputs {
            if !seen.insert(input.key.clone()) {
                debug!(key = %input.key, "frame already on canvas, skipped");
                continue;
            }
            pending.push(input);
        }
        if pending.is_empty() {
            return Vec::new();
        }
        let metrics = geometry::compute_cell_and_padding(
            self.frames.values().map(|f| (f.width, f.height)),
            pending.iter().map(|p| p.image.dimensions()),
            &self.config,
        );
        let start_index = self.frames.len();
        let layer = self.layers.active();
        let mut ids = Vec::with_capacity(pending.len());
        for (i, input) in pending.into_iter().enumerate() {
            let (x, y) = geometry::next_position(start_index + i, metrics, &self.config);
            let id = self.insert_frame(input.key, Arc::new(input.image), x, y, layer);
            ids.push(id);
        }
        self.layers.invalidate(layer);
        info!(count = ids.len(), layer = %layer, "frames added");
        ids
    }

    pub(crate) fn insert_frame(
        &mut self,
        key: String,
        image: Arc<image::RgbaImage>,
        x: f64,
        y: f64,
        layer: LayerId,
    ) -> FrameId {
        let id = FrameId(self.next_frame_id);
        self.next_frame_id += 1;
        let order = self.next_order;
        self.next_order += 1;
        let (width, height) = image.dimensions();
        self.frames.insert(
            id,
            Frame {
                id,
                key,
                image,
                width,
                height,
                x,
                y,
                visible: true,
                layer,
                anchor: None,
                anchor_inherit: true,
                order,
            },
        );
        id
    }

    /// Inserts a fully described frame (used by document loading); keeps its order.
    pub(crate) fn restore_frame(&mut self, mut frame: Frame) -> FrameId {
        let id = FrameId(self.next_frame_id);
        self.next_frame_id += 1;
        frame.id = id;
        self.next_order = self.next_order.max(frame.order + 1);
        self.frames.insert(id, frame);
        id
    }

    /// Removes frames; returns how many existed.
    pub fn remove(&mut self, ids: &[FrameId]) -> usize {
        let mut removed = 0;
        for id in ids {
            if let Some(frame) = self.frames.remove(id) {
                self.layers.invalidate(frame.layer);
                self.selection.remove(*id);
                removed += 1;
            }
        }
        if let Some(drag) = &mut self.drag {
            drag.origins.retain(|(id, _, _)| !ids.contains(id));
        }
        debug!(removed, "frames removed");
        removed
    }

    /// Removes every frame and resets selection, drag and undo state.
    pub fn clear(&mut self) {
        let layer_ids: Vec<LayerId> = self.layers.iter().map(|l| l.id).collect();
        for id in layer_ids {
            self.layers.invalidate(id);
        }
        self.frames.clear();
        self.selection.clear();
        self.undo.clear();
        self.drag = None;
        info!("canvas cleared");
    }

    /// Duplicates frames. Grid copies go to the next free cell after the
    /// original (row-major); free-form copies are offset slightly.
    pub fn copy(&mut self, ids: &[FrameId]) -> Vec<FrameId> {
        let metrics = self.metrics();
        let use_grid = self.config.is_grid() && !metrics.is_degenerate();
        let cols = self.config.columns.max(1) as i64;
        let mut occupied: HashSet<(i64, i64)> = if use_grid {
            self.frames
                .values()
                .filter_map(|f| geometry::cell_of(f.x, f.y, metrics))
                .collect()
        } else {
            HashSet::new()
        };

        let mut new_ids = Vec::new();
        for id in ids {
            let Some(original) = self.frames.get(id).cloned() else {
                continue;
            };
            let (x, y) = match geometry::cell_of(original.x, original.y, metrics).filter(|_| use_grid) {
                Some((row, col)) => {
                    let mut index = row.saturating_mul(cols).saturating_add(col).saturating_add(1).max(0);
                    let (row, col) = loop {
                        let cell = (index / cols, index % cols);
                        if !occupied.contains(&cell) {
                            break cell;
                        }
                        index = index.saturating_add(1);
                    };
                    occupied.insert((row, col));
                    geometry::cell_origin(row, col, metrics)
                }
                None => (original.x + COPY_OFFSET, original.y + COPY_OFFSET),
            };
            let new_id = self.insert_frame(original.key.clone(), original.image.clone(), x, y, original.layer);
            if let Some(copy) = self.frames.get_mut(&new_id) {
                copy.visible = original.visible;
                copy.anchor = original.anchor;
                copy.anchor_inherit = original.anchor_inherit;
            }
            new_ids.push(new_id);
        }
        for id in &new_ids {
            self.selection.insert(*id);
        }
        debug!(count = new_ids.len(), "frames copied");
        new_ids
    }

    // ---------- per-frame properties ----------

    pub fn set_frame_visible(&mut self, id: FrameId, visible: bool) -> bool {
        match self.frames.get_mut(&id) {
            Some(f) => {
                f.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Sets the frame's own anchor and whether it inherits from its layer.
    pub fn set_frame_anchor(&mut self, id: FrameId, anchor: Option<Anchor>, inherit: bool) -> bool {
        match self.frames.get_mut(&id) {
            Some(f) => {
                f.anchor = anchor;
                f.anchor_inherit = inherit;
                true
            }
            None => false,
        }
    }

    /// Moves frames to another layer.
    pub fn move_to_layer(&mut self, ids: &[FrameId], layer: LayerId) -> Result<()> {
        if !self.layers.contains(layer) {
            return Err(SheetError::LayerNotFound(layer));
        }
        for id in ids {
            if let Some(f) = self.frames.get_mut(id) {
                let old = f.layer;
                f.layer = layer;
                self.layers.invalidate(old);
            }
        }
        self.layers.invalidate(layer);
        Ok(())
    }

    /// Deletes a layer and reassigns its frames to the fallback (new first) layer.
    pub fn delete_layer(&mut self, id: LayerId) -> Result<LayerId> {
        let fallback = self.layers.delete(id)?;
        let mut moved = 0usize;
        for frame in self.frames.values_mut().filter(|f| f.layer == id) {
            frame.layer = fallback;
            moved += 1;
        }
        self.layers.invalidate(fallback);
        info!(layer = %id, fallback = %fallback, moved, "layer deleted");
        Ok(fallback)
    }

    /// Resolved anchor of a frame, per its layer configuration.
    pub fn resolve_anchor(&self, id: FrameId) -> Option<Anchor> {
        let frame = self.frames.get(&id)?;
        let layer = self.layers.get(frame.layer)?;
        anchor::resolve(frame, layer, self.layer_head(frame.layer))
    }

    // ---------- positioning ----------

    /// Applies new positions. Pushes one undo snapshot first when `record` is
    /// set and at least one frame actually moves. Returns true if anything moved.
    fn commit_positions(&mut self, updates: Vec<(FrameId, f64, f64)>, record: bool) -> bool {
        let changes: Vec<(FrameId, f64, f64)> = updates
            .into_iter()
            .filter(|(id, x, y)| {
                if !x.is_finite() || !y.is_finite() {
                    warn!(frame = %id, x, y, "non-finite position ignored");
                    return false;
                }
                self.frames
                    .get(id)
                    .is_some_and(|f| f.x != *x || f.y != *y)
            })
            .collect();
        if changes.is_empty() {
            return false;
        }
        if record {
            self.push_undo();
        }
        for (id, x, y) in changes {
            if let Some(f) = self.frames.get_mut(&id) {
                f.x = x;
                f.y = y;
            }
        }
        true
    }

    fn snapped(&self, x: f64, y: f64, metrics: CellMetrics) -> (f64, f64) {
        if self.config.snap_active() {
            geometry::snap(x, y, metrics)
        } else {
            (x, y)
        }
    }

    /// Moves frames by a delta, then snaps when enabled.
    pub fn move_frames(&mut self, ids: &[FrameId], dx: f64, dy: f64) -> bool {
        let metrics = self.metrics();
        let updates = ids
            .iter()
            .filter_map(|id| self.frames.get(id))
            .map(|f| {
                let (x, y) = self.snapped(f.x + dx, f.y + dy, metrics);
                (f.id, x, y)
            })
            .collect();
        self.commit_positions(updates, true)
    }

    /// Sets absolute coordinates; an unset axis keeps each frame's value.
    pub fn set_position(&mut self, ids: &[FrameId], x: Option<f64>, y: Option<f64>) -> bool {
        let metrics = self.metrics();
        let updates = ids
            .iter()
            .filter_map(|id| self.frames.get(id))
            .map(|f| {
                let (nx, ny) = self.snapped(x.unwrap_or(f.x), y.unwrap_or(f.y), metrics);
                (f.id, nx, ny)
            })
            .collect();
        self.commit_positions(updates, true)
    }

    /// Aligns frames to the first one on the given axis, then snaps.
    pub fn align(&mut self, ids: &[FrameId], axis: Axis) -> bool {
        if ids.len() < 2 {
            return false;
        }
        let Some(reference) = ids.iter().find_map(|id| self.frames.get(id)) else {
            return false;
        };
        let (ref_x, ref_y) = (reference.x, reference.y);
        let metrics = self.metrics();
        let updates = ids
            .iter()
            .filter_map(|id| self.frames.get(id))
            .map(|f| {
                let (x, y) = match axis {
                    Axis::Horizontal => (f.x, ref_y),
                    Axis::Vertical => (ref_x, f.y),
                };
                let (x, y) = self.snapped(x, y, metrics);
                (f.id, x, y)
            })
            .collect();
        self.commit_positions(updates, true)
    }

    /// Centres each frame inside the grid cell it currently occupies.
    pub fn center_in_cell(&mut self, ids: &[FrameId]) -> Result<bool> {
        if !self.config.is_grid() {
            return Err(SheetError::NotGridMode("Center in cell"));
        }
        let metrics = self.metrics();
        if metrics.is_degenerate() {
            return Ok(false);
        }
        let updates = ids
            .iter()
            .filter_map(|id| self.frames.get(id))
            .filter_map(|f| {
                let (row, col) = geometry::cell_of(f.x, f.y, metrics)?;
                let (ox, oy) = geometry::cell_origin(row, col, metrics);
                let x = ox + (metrics.cell_w as f64 - f.width as f64) / 2.0;
                let y = oy + (metrics.cell_h as f64 - f.height as f64) / 2.0;
                Some((f.id, x, y))
            })
            .collect();
        Ok(self.commit_positions(updates, true))
    }

    /// Snaps every frame to its nearest cell origin (Grid + snap only).
    pub fn snap_all(&mut self) -> bool {
        if !self.config.snap_active() {
            return false;
        }
        let metrics = self.metrics();
        let updates = self
            .frames
            .values()
            .map(|f| {
                let (x, y) = geometry::snap(f.x, f.y, metrics);
                (f.id, x, y)
            })
            .collect();
        self.commit_positions(updates, true)
    }

    /// Translates active-layer frames so their anchors coincide with the anchor
    /// of the reference-layer frame in the same grid cell.
    pub fn align_layer_to_reference(&mut self) -> Result<AlignReport> {
        if !self.config.is_grid() {
            return Err(SheetError::NotGridMode("Align to reference layer"));
        }
        let mut report = AlignReport::default();
        let active = self.layers.active();
        let reference = self.layers.reference();
        let metrics = self.metrics();
        if active == reference || metrics.is_degenerate() {
            return Ok(report);
        }
        let (Some(active_layer), Some(reference_layer)) =
            (self.layers.get(active), self.layers.get(reference))
        else {
            return Ok(report);
        };

        let mut reference_cells: HashMap<(i64, i64), &Frame> = HashMap::new();
        for frame in self.layer_frames(reference) {
            if let Some(cell) = geometry::cell_of(frame.x, frame.y, metrics) {
                reference_cells.entry(cell).or_insert(frame);
            }
        }
        let active_head = self.layer_head(active);
        let reference_head = self.layer_head(reference);

        let mut updates = Vec::new();
        for frame in self.layer_frames(active) {
            if frame.width > metrics.cell_w || frame.height > metrics.cell_h {
                report.oversized.push(frame.id);
            }
            let counterpart = geometry::cell_of(frame.x, frame.y, metrics)
                .and_then(|cell| reference_cells.get(&cell));
            let Some(target) = counterpart else {
                report.no_counterpart += 1;
                continue;
            };
            let own = anchor::resolve(frame, active_layer, active_head);
            let theirs = anchor::resolve(target, reference_layer, reference_head);
            match (own, theirs) {
                (Some(own), Some(theirs)) => {
                    let (tx, ty) = anchor::world_anchor(target, theirs);
                    updates.push((frame.id, tx - own.x as f64, ty - own.y as f64));
                    report.aligned += 1;
                }
                _ => report.no_anchor += 1,
            }
        }
        if !report.oversized.is_empty() {
            warn!(
                count = report.oversized.len(),
                "frames larger than the cell; alignment may pick the wrong counterpart"
            );
        }
        self.commit_positions(updates, true);
        info!(
            aligned = report.aligned,
            no_anchor = report.no_anchor,
            no_counterpart = report.no_counterpart,
            "layer aligned to reference"
        );
        Ok(report)
    }

    // ---------- undo ----------

    fn snapshot(&self) -> PositionSnapshot {
        self.frames.values().map(|f| (f.id, (f.x, f.y))).collect()
    }

    fn push_undo(&mut self) {
        let snap = self.snapshot();
        self.undo.push_back(snap);
        if self.undo.len() > UNDO_DEPTH {
            self.undo.pop_front();
        }
    }

    /// Restores the positions of the last snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snap) = self.undo.pop_back() else {
            return false;
        };
        for (id, (x, y)) in snap {
            if let Some(f) = self.frames.get_mut(&id) {
                f.x = x;
                f.y = y;
            }
        }
        debug!(remaining = self.undo.len(), "undo");
        true
    }

    // ---------- selection ----------

    /// Topmost visible frame under a canvas point.
    pub fn frame_at(&self, x: f64, y: f64) -> Option<FrameId> {
        self.visible_frames()
            .into_iter()
            .rev()
            .find(|f| f.hit(x, y))
            .map(|f| f.id)
    }

    pub fn select(&mut self, id: FrameId, mode: SelectMode) {
        if !self.frames.contains_key(&id) {
            return;
        }
        match mode {
            SelectMode::Replace => {
                self.selection.clear();
                self.selection.insert(id);
            }
            SelectMode::Add => self.selection.insert(id),
            SelectMode::Toggle => {
                if self.selection.contains(id) {
                    self.selection.remove(id);
                } else {
                    self.selection.insert(id);
                }
            }
        }
    }

    pub fn select_all(&mut self) {
        let ids: Vec<FrameId> = self.frames.keys().copied().collect();
        for id in ids {
            self.selection.insert(id);
        }
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    // ---------- drag gesture ----------

    /// Starts a drag at a canvas point. Clicking empty space clears the
    /// selection (unless adding/toggling) and starts nothing.
    pub fn begin_drag(&mut self, x: f64, y: f64, mode: SelectMode) -> Option<FrameId> {
        let Some(hit) = self.frame_at(x, y) else {
            if mode == SelectMode::Replace {
                self.selection.clear();
            }
            self.drag = None;
            return None;
        };
        let keep_selection = mode == SelectMode::Replace && self.selection.contains(hit);
        if !keep_selection {
            self.select(hit, mode);
        }
        let origins = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| self.frames.get(id))
            .map(|f| (f.id, f.x, f.y))
            .collect();
        self.drag = Some(DragState {
            start: (x, y),
            origins,
            snapshot_pushed: false,
        });
        Some(hit)
    }

    /// Moves the dragged frames to follow the pointer. The first update that
    /// changes a position records one undo snapshot for the whole gesture.
    pub fn update_drag(&mut self, x: f64, y: f64) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        let (dx, dy) = (x - drag.start.0, y - drag.start.1);
        let metrics = self.metrics();
        let updates = drag
            .origins
            .iter()
            .map(|(id, ox, oy)| {
                let (nx, ny) = self.snapped(ox + dx, oy + dy, metrics);
                (*id, nx, ny)
            })
            .collect();
        let moved = self.commit_positions(updates, !drag.snapshot_pushed);
        self.drag = Some(DragState {
            snapshot_pushed: drag.snapshot_pushed || moved,
            ..drag
        });
        moved
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}
