//! Ordered layer collection with active/reference tracking.

use crate::config::{AnchorMode, AnchorSource, AnchorType};
use crate::error::{Result, SheetError};
use crate::model::{Anchor, Frame, LayerId};
use std::cell::OnceCell;
use tracing::debug;

/// A named group of frames sharing visibility and anchor configuration.
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub(crate) anchor_mode: AnchorMode,
    pub(crate) anchor_source: AnchorSource,
    pub(crate) anchor_type: AnchorType,
    /// Inset applied to top/bottom auto anchors.
    pub(crate) anchor_padding: i32,
    /// Layer-wide manual anchor (Global + Manual).
    pub(crate) anchor: Option<Anchor>,
    /// Lazily detected layer-wide anchor (Global + Auto).
    pub(crate) global_auto_anchor: OnceCell<Option<Anchor>>,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            anchor_mode: AnchorMode::Off,
            anchor_source: AnchorSource::Auto,
            anchor_type: AnchorType::Bottom,
            anchor_padding: 0,
            anchor: None,
            global_auto_anchor: OnceCell::new(),
        }
    }

    pub fn anchor_mode(&self) -> AnchorMode {
        self.anchor_mode
    }

    pub fn anchor_source(&self) -> AnchorSource {
        self.anchor_source
    }

    pub fn anchor_type(&self) -> AnchorType {
        self.anchor_type
    }

    pub fn anchor_padding(&self) -> i32 {
        self.anchor_padding
    }

    /// Layer-wide manual anchor.
    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    /// Drops the cached automatic layer anchor.
    pub fn invalidate_anchor_cache(&mut self) {
        self.global_auto_anchor.take();
    }

    /// Cached automatic layer anchor, if it has been computed.
    pub fn cached_auto_anchor(&self) -> Option<Option<Anchor>> {
        self.global_auto_anchor.get().copied()
    }
}

/// Layers in z-order (index 0 is drawn first). Never empty.
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<Layer>,
    next_id: u32,
    active: LayerId,
    reference: LayerId,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    /// A stack holding a single `Layer 1`, which is both active and reference.
    pub fn new() -> Self {
        let first = Layer::new(LayerId(1), "Layer 1");
        Self {
            layers: vec![first],
            next_id: 2,
            active: LayerId(1),
            reference: LayerId(1),
        }
    }

    /// Rebuilds a stack from stored layers. Unknown active/reference ids fall
    /// back to the first layer; an empty list yields a default stack.
    pub fn from_layers(layers: Vec<Layer>, active: Option<LayerId>, reference: Option<LayerId>) -> Self {
        if layers.is_empty() {
            return Self::new();
        }
        let next_id = layers.iter().map(|l| l.id.0).max().unwrap_or(0) + 1;
        let mut stack = Self {
            active: layers[0].id,
            reference: layers[0].id,
            layers,
            next_id,
        };
        if let Some(id) = active.filter(|id| stack.contains(*id)) {
            stack.active = id;
        }
        if let Some(id) = reference.filter(|id| stack.contains(*id)) {
            stack.reference = id;
        }
        stack
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    fn get_mut_or_err(&mut self, id: LayerId) -> Result<&mut Layer> {
        self.get_mut(id).ok_or(SheetError::LayerNotFound(id))
    }

    pub fn first_id(&self) -> LayerId {
        self.layers[0].id
    }

    pub fn active(&self) -> LayerId {
        self.active
    }

    pub fn reference(&self) -> LayerId {
        self.reference
    }

    /// Position in draw order; lower is drawn first.
    pub fn z_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// Returns `id` when it exists, otherwise the first layer.
    pub fn resolve_or_first(&self, id: LayerId) -> LayerId {
        if self.contains(id) { id } else { self.first_id() }
    }

    /// Appends a new layer on top and returns its id.
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(Layer::new(id, name));
        debug!(layer = %id, "layer added");
        id
    }

    pub fn rename(&mut self, id: LayerId, name: impl Into<String>) -> Result<()> {
        self.get_mut_or_err(id)?.name = name.into();
        Ok(())
    }

    /// Deletes a layer and returns the fallback layer its frames should move to.
    pub fn delete(&mut self, id: LayerId) -> Result<LayerId> {
        let idx = self.z_index(id).ok_or(SheetError::LayerNotFound(id))?;
        if self.layers.len() == 1 {
            return Err(SheetError::LastLayer);
        }
        self.layers.remove(idx);
        let fallback = self.first_id();
        if self.active == id {
            self.active = fallback;
        }
        if self.reference == id {
            self.reference = fallback;
        }
        debug!(layer = %id, fallback = %fallback, "layer deleted");
        Ok(fallback)
    }

    /// Moves a layer to `new_index` in draw order (clamped).
    pub fn reorder(&mut self, id: LayerId, new_index: usize) -> Result<()> {
        let idx = self.z_index(id).ok_or(SheetError::LayerNotFound(id))?;
        let layer = self.layers.remove(idx);
        let target = new_index.min(self.layers.len());
        self.layers.insert(target, layer);
        Ok(())
    }

    /// Moves a layer one step towards the top. Returns false if already on top.
    pub fn move_up(&mut self, id: LayerId) -> Result<bool> {
        let idx = self.z_index(id).ok_or(SheetError::LayerNotFound(id))?;
        if idx + 1 >= self.layers.len() {
            return Ok(false);
        }
        self.layers.swap(idx, idx + 1);
        Ok(true)
    }

    /// Moves a layer one step towards the bottom. Returns false if already at the bottom.
    pub fn move_down(&mut self, id: LayerId) -> Result<bool> {
        let idx = self.z_index(id).ok_or(SheetError::LayerNotFound(id))?;
        if idx == 0 {
            return Ok(false);
        }
        self.layers.swap(idx, idx - 1);
        Ok(true)
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> Result<()> {
        self.get_mut_or_err(id)?.visible = visible;
        Ok(())
    }

    pub fn set_active(&mut self, id: LayerId) -> Result<()> {
        if !self.contains(id) {
            return Err(SheetError::LayerNotFound(id));
        }
        self.active = id;
        Ok(())
    }

    pub fn set_reference(&mut self, id: LayerId) -> Result<()> {
        if !self.contains(id) {
            return Err(SheetError::LayerNotFound(id));
        }
        self.reference = id;
        Ok(())
    }

    pub fn set_anchor_mode(&mut self, id: LayerId, mode: AnchorMode) -> Result<()> {
        let layer = self.get_mut_or_err(id)?;
        layer.anchor_mode = mode;
        layer.invalidate_anchor_cache();
        Ok(())
    }

    pub fn set_anchor_source(&mut self, id: LayerId, source: AnchorSource) -> Result<()> {
        let layer = self.get_mut_or_err(id)?;
        layer.anchor_source = source;
        layer.invalidate_anchor_cache();
        Ok(())
    }

    pub fn set_anchor_type(&mut self, id: LayerId, anchor_type: AnchorType) -> Result<()> {
        let layer = self.get_mut_or_err(id)?;
        layer.anchor_type = anchor_type;
        layer.invalidate_anchor_cache();
        Ok(())
    }

    pub fn set_anchor_padding(&mut self, id: LayerId, padding: i32) -> Result<()> {
        let layer = self.get_mut_or_err(id)?;
        layer.anchor_padding = padding;
        layer.invalidate_anchor_cache();
        Ok(())
    }

    /// Sets the layer-wide manual anchor (used in Global + Manual mode).
    pub fn set_global_anchor(&mut self, id: LayerId, anchor: Option<Anchor>) -> Result<()> {
        let layer = self.get_mut_or_err(id)?;
        layer.anchor = anchor;
        layer.invalidate_anchor_cache();
        Ok(())
    }

    pub(crate) fn invalidate(&mut self, id: LayerId) {
        if let Some(layer) = self.get_mut(id) {
            layer.invalidate_anchor_cache();
        }
    }

    /// Frames that are drawn: visible frames on visible layers, ordered by
    /// (layer z-index, insertion order).
    pub fn visible_frames<'a, I>(&self, frames: I) -> Vec<&'a Frame>
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        let mut out: Vec<(usize, &'a Frame)> = frames
            .into_iter()
            .filter(|f| f.visible)
            .filter_map(|f| {
                let z = self.z_index(f.layer)?;
                self.layers[z].visible.then_some((z, f))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.order.cmp(&b.1.order)));
        out.into_iter().map(|(_, f)| f).collect()
    }
}
