use image::{Rgba, RgbaImage};
use sheetsmith_core::anchor::{auto_detect, opaque_bounds};
use sheetsmith_core::prelude::*;

fn blank(w: u32, h: u32) -> RgbaImage {
    RgbaImage::new(w, h)
}

/// Transparent image with an opaque block covering columns x0..=x1, rows y0..=y1.
fn block(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> RgbaImage {
    let mut img = blank(w, h);
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        }
    }
    img
}

#[test]
fn auto_anchor_tracks_the_opaque_bounds() {
    let img = block(32, 32, 8, 4, 23, 27);
    assert_eq!(opaque_bounds(&img, 5), Some(Rect::new(8, 4, 16, 24)));
    assert_eq!(auto_detect(&img, AnchorType::Bottom, 0), Some(Anchor::new(15, 27)));
    assert_eq!(auto_detect(&img, AnchorType::Bottom, 3), Some(Anchor::new(15, 24)));
    assert_eq!(auto_detect(&img, AnchorType::Top, 2), Some(Anchor::new(15, 6)));
    assert_eq!(auto_detect(&img, AnchorType::Center, 0), Some(Anchor::new(15, 15)));
}

#[test]
fn faint_pixels_and_empty_images_have_no_anchor() {
    let mut img = blank(8, 8);
    img.put_pixel(3, 3, Rgba([0, 0, 0, 5]));
    assert_eq!(auto_detect(&img, AnchorType::Bottom, 0), None);
    assert_eq!(auto_detect(&blank(4, 4), AnchorType::Center, 0), None);
}

#[test]
fn padding_never_pushes_the_anchor_outside_the_frame() {
    let img = block(10, 10, 0, 0, 9, 9);
    assert_eq!(auto_detect(&img, AnchorType::Top, -5), Some(Anchor::new(4, 0)));
    assert_eq!(auto_detect(&img, AnchorType::Bottom, -5), Some(Anchor::new(4, 9)));
}

#[test]
fn global_auto_anchor_comes_from_the_first_frame_and_is_cached() {
    let mut canvas = CanvasModel::default();
    let layer = canvas.layers().active();
    canvas.layers_mut().set_anchor_mode(layer, AnchorMode::Global).unwrap();
    let ids = canvas.add_frames(vec![
        InputFrame::new("a.png", block(32, 32, 8, 4, 23, 27)),
        InputFrame::new("b.png", block(32, 32, 0, 0, 31, 31)),
    ]);
    assert_eq!(canvas.resolve_anchor(ids[1]), Some(Anchor::new(15, 27)));
    assert_eq!(
        canvas.layers().get(layer).unwrap().cached_auto_anchor(),
        Some(Some(Anchor::new(15, 27)))
    );

    canvas.layers_mut().set_anchor_type(layer, AnchorType::Top).unwrap();
    assert_eq!(canvas.resolve_anchor(ids[1]), Some(Anchor::new(15, 4)));

    canvas.remove(&[ids[0]]);
    assert_eq!(canvas.resolve_anchor(ids[1]), Some(Anchor::new(15, 0)));
}

#[test]
fn padding_changes_redetect_the_layer_anchor() {
    let mut canvas = CanvasModel::default();
    let layer = canvas.layers().active();
    canvas.layers_mut().set_anchor_mode(layer, AnchorMode::Global).unwrap();
    let ids = canvas.add_frames(vec![InputFrame::new("a.png", block(32, 32, 8, 4, 23, 27))]);
    assert_eq!(canvas.resolve_anchor(ids[0]), Some(Anchor::new(15, 27)));

    canvas.layers_mut().set_anchor_padding(layer, 3).unwrap();
    assert_eq!(canvas.layers().get(layer).unwrap().cached_auto_anchor(), None);
    assert_eq!(canvas.resolve_anchor(ids[0]), Some(Anchor::new(15, 24)));
}

#[test]
fn frame_overrides_win_over_the_layer() {
    let mut canvas = CanvasModel::default();
    let layer = canvas.layers().active();
    canvas.layers_mut().set_anchor_mode(layer, AnchorMode::Global).unwrap();
    canvas.layers_mut().set_anchor_source(layer, AnchorSource::Manual).unwrap();
    canvas.layers_mut().set_global_anchor(layer, Some(Anchor::new(1, 2))).unwrap();
    let ids = canvas.add_frames(vec![
        InputFrame::new("a.png", blank(16, 16)),
        InputFrame::new("b.png", blank(16, 16)),
    ]);
    assert_eq!(canvas.resolve_anchor(ids[0]), Some(Anchor::new(1, 2)));
    canvas.set_frame_anchor(ids[1], Some(Anchor::new(7, 7)), false);
    assert_eq!(canvas.resolve_anchor(ids[1]), Some(Anchor::new(7, 7)));

    canvas.layers_mut().set_anchor_mode(layer, AnchorMode::Off).unwrap();
    assert_eq!(canvas.resolve_anchor(ids[0]), None);
}

/// Reference layer 1 and active layer 2, each with per-frame manual anchors.
fn two_layer_canvas(cfg: GridLayoutConfig, size: u32) -> (CanvasModel, FrameId, FrameId) {
    let mut canvas = CanvasModel::new(cfg);
    let reference = canvas.layers().active();
    let refs = canvas.add_frames(vec![InputFrame::new("body.png", blank(size, size))]);
    let active = canvas.layers_mut().add_layer("Armor");
    canvas.layers_mut().set_active(active).unwrap();
    let acts = canvas.add_frames(vec![InputFrame::new("armor.png", blank(size, size))]);
    canvas.set_position(&acts, Some(0.0), Some(0.0));
    for id in [reference, active] {
        canvas.layers_mut().set_anchor_mode(id, AnchorMode::PerFrame).unwrap();
        canvas.layers_mut().set_anchor_source(id, AnchorSource::Manual).unwrap();
    }
    canvas.set_frame_anchor(refs[0], Some(Anchor::new(8, 16)), true);
    canvas.set_frame_anchor(acts[0], Some(Anchor::new(8, 10)), true);
    (canvas, refs[0], acts[0])
}

#[test]
fn active_layer_frames_move_onto_reference_anchors() {
    let cfg = GridLayoutConfig::builder().columns(4).padding(2).build();
    let (mut canvas, reference, active) = two_layer_canvas(cfg, 32);
    assert_eq!(canvas.layers().reference(), LayerId(1));

    let report = canvas.align_layer_to_reference().unwrap();
    assert_eq!(report.aligned, 1);
    assert_eq!(report.no_anchor + report.no_counterpart, 0);
    assert!(report.oversized.is_empty());

    let moved = canvas.frame(active).unwrap();
    assert_eq!((moved.x, moved.y), (0.0, 6.0));
    let still = canvas.frame(reference).unwrap();
    assert_eq!((still.x, still.y), (0.0, 0.0));

    assert!(canvas.undo());
    assert_eq!(canvas.frame(active).unwrap().y, 0.0);
}

#[test]
fn frames_without_counterpart_or_anchor_are_counted() {
    let cfg = GridLayoutConfig::builder().columns(4).padding(2).build();
    let (mut canvas, _, active) = two_layer_canvas(cfg, 32);
    canvas.set_frame_anchor(active, None, true);
    let report = canvas.align_layer_to_reference().unwrap();
    assert_eq!((report.aligned, report.no_anchor), (0, 1));

    canvas.set_frame_anchor(active, Some(Anchor::new(8, 10)), true);
    canvas.set_position(&[active], Some(68.0), Some(0.0));
    let report = canvas.align_layer_to_reference().unwrap();
    assert_eq!((report.aligned, report.no_counterpart), (0, 1));
    assert_eq!(canvas.frame(active).unwrap().x, 68.0);
}

#[test]
fn frames_larger_than_a_forced_tile_are_reported() {
    let cfg = GridLayoutConfig::builder()
        .kind(SheetKind::Tilemap)
        .tile_size_mode(TileSizeMode::Force)
        .tile_size(16)
        .build();
    let (mut canvas, _, active) = two_layer_canvas(cfg, 32);
    let report = canvas.align_layer_to_reference().unwrap();
    assert_eq!(report.oversized, vec![active]);
    assert_eq!(report.aligned, 1);
}

#[test]
fn aligning_a_layer_to_itself_or_in_free_form_does_nothing() {
    let cfg = GridLayoutConfig::builder().columns(4).padding(2).build();
    let (mut canvas, _, _) = two_layer_canvas(cfg, 32);
    canvas.layers_mut().set_reference(LayerId(2)).unwrap();
    assert_eq!(canvas.align_layer_to_reference().unwrap(), AlignReport::default());
    assert_eq!(canvas.undo_depth(), 1);

    let mut cfg = canvas.config().clone();
    cfg.layout_mode = LayoutMode::FreeForm;
    canvas.set_config(cfg);
    assert!(matches!(
        canvas.align_layer_to_reference(),
        Err(SheetError::NotGridMode(_))
    ));
}

#[test]
fn auto_bottom_anchors_align_feet_to_feet() {
    let cfg = GridLayoutConfig::builder().columns(4).padding(2).build();
    let mut canvas = CanvasModel::new(cfg);
    let body_layer = canvas.layers().active();
    // Opaque bottom rows at y = 16 (body) and y = 10 (armor), both centred on x = 8.
    let body = canvas.add_frames(vec![InputFrame::new("body.png", block(32, 32, 0, 0, 16, 16))]);
    let armor_layer = canvas.layers_mut().add_layer("Armor");
    canvas.layers_mut().set_active(armor_layer).unwrap();
    let armor = canvas.add_frames(vec![InputFrame::new("armor.png", block(32, 32, 0, 4, 16, 10))]);
    canvas.set_position(&armor, Some(0.0), Some(0.0));

    let layers = canvas.layers_mut();
    layers.set_anchor_mode(body_layer, AnchorMode::PerFrame).unwrap();
    layers.set_anchor_mode(armor_layer, AnchorMode::Global).unwrap();
    for id in [body_layer, armor_layer] {
        layers.set_anchor_source(id, AnchorSource::Auto).unwrap();
        layers.set_anchor_type(id, AnchorType::Bottom).unwrap();
    }
    assert_eq!(canvas.resolve_anchor(body[0]), Some(Anchor::new(8, 16)));
    assert_eq!(canvas.resolve_anchor(armor[0]), Some(Anchor::new(8, 10)));

    let report = canvas.align_layer_to_reference().unwrap();
    assert_eq!(report.aligned, 1);
    let moved = canvas.frame(armor[0]).unwrap();
    assert_eq!((moved.x, moved.y), (0.0, 6.0));
    assert_eq!(canvas.frame(body[0]).unwrap().y, 0.0);
}
