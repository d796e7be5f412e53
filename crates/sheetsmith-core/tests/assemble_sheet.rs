use image::{Rgba, RgbaImage};
use sheetsmith_core::prelude::*;

fn solid(w: u32, h: u32, c: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba(c))
}

fn free_form() -> GridLayoutConfig {
    GridLayoutConfig::builder()
        .layout_mode(LayoutMode::FreeForm)
        .build()
}

#[test]
fn empty_canvases_cannot_be_assembled() {
    let canvas = CanvasModel::default();
    assert!(matches!(
        rasterize(&canvas, AssembleOptions::default()),
        Err(SheetError::Empty)
    ));
    // Default grid: four 32px columns with 1px padding.
    assert_eq!(canvas_size(&canvas), (131, 32));
}

#[test]
fn grid_canvases_cover_the_whole_footprint() {
    let cfg = GridLayoutConfig::builder().columns(4).padding(2).build();
    let mut canvas = CanvasModel::new(cfg);
    canvas.add_frames(vec![InputFrame::new("a.png", solid(32, 32, [1, 1, 1, 255]))]);
    // One frame still spans all four configured columns.
    assert_eq!(canvas_size(&canvas), (134, 32));

    let mut cfg = canvas.config().clone();
    cfg.rows = 3;
    canvas.set_config(cfg);
    assert_eq!(canvas_size(&canvas), (134, 100));
}

#[test]
fn free_form_canvases_fit_the_frame_extents() {
    let mut canvas = CanvasModel::new(free_form());
    let ids = canvas.add_frames(vec![
        InputFrame::new("a.png", solid(8, 8, [1, 1, 1, 255])),
        InputFrame::new("b.png", solid(8, 4, [1, 1, 1, 255])),
    ]);
    canvas.set_position(&ids[1..], Some(30.4), Some(2.6));
    assert_eq!(canvas_size(&canvas), (38, 8));
}

#[test]
fn far_away_frames_saturate_instead_of_overflowing() {
    let cfg = GridLayoutConfig::builder().columns(2).snap(false).build();
    let mut canvas = CanvasModel::new(cfg);
    let ids = canvas.add_frames(vec![InputFrame::new("a.png", solid(8, 8, [1, 1, 1, 255]))]);
    canvas.set_position(&ids, None, Some(1.0e12));
    assert_eq!(canvas_size(&canvas).1, u32::MAX);
    assert!(matches!(
        rasterize(&canvas, AssembleOptions::default()),
        Err(SheetError::InvalidConfig(_))
    ));

    canvas.set_position(&ids, Some(-1.0e12), Some(-1.0e12));
    // Frames entirely above and left of the origin still leave the grid footprint.
    assert_eq!(canvas_size(&canvas), (17, 8));
}

#[test]
fn hidden_frames_and_layers_are_left_out() {
    let mut canvas = CanvasModel::new(free_form());
    let ids = canvas.add_frames(vec![
        InputFrame::new("a.png", solid(4, 4, [255, 0, 0, 255])),
        InputFrame::new("b.png", solid(4, 4, [0, 255, 0, 255])),
    ]);
    canvas.set_frame_visible(ids[1], false);
    let sheet = rasterize(&canvas, AssembleOptions::default()).unwrap();
    assert_eq!(sheet.placements.len(), 1);
    assert_eq!(sheet.rgba.dimensions(), (4, 4));

    let layer = canvas.layers().active();
    canvas.layers_mut().set_visible(layer, false).unwrap();
    assert!(matches!(
        rasterize(&canvas, AssembleOptions::default()),
        Err(SheetError::Empty)
    ));
}

#[test]
fn upper_layers_draw_over_lower_ones() {
    let mut canvas = CanvasModel::new(free_form());
    let under = canvas.add_frames(vec![InputFrame::new("under.png", solid(4, 4, [255, 0, 0, 255]))]);
    let top = canvas.layers_mut().add_layer("Top");
    canvas.layers_mut().set_active(top).unwrap();
    let mut overlay = solid(4, 4, [0, 0, 255, 255]);
    overlay.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
    overlay.put_pixel(1, 0, Rgba([0, 0, 255, 128]));
    let over = canvas.add_frames(vec![InputFrame::new("over.png", overlay)]);
    canvas.set_position(&over, Some(0.0), Some(0.0));

    let sheet = rasterize(&canvas, AssembleOptions::default()).unwrap();
    assert_eq!(*sheet.rgba.get_pixel(3, 3), Rgba([0, 0, 255, 255]));
    assert_eq!(*sheet.rgba.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    let mixed = sheet.rgba.get_pixel(1, 0);
    assert_eq!(mixed[3], 255);
    assert!(mixed[0] > 100 && mixed[2] > 100);

    // Moving the red layer above the blue one flips the result.
    canvas.layers_mut().move_down(top).unwrap();
    let sheet = rasterize(&canvas, AssembleOptions::default()).unwrap();
    assert_eq!(*sheet.rgba.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
    assert_eq!(sheet.placements[1].key, canvas.frame(under[0]).unwrap().key);
}

#[test]
fn replace_blending_copies_transparent_pixels() {
    let mut canvas = CanvasModel::new(free_form());
    canvas.add_frames(vec![InputFrame::new("a.png", solid(4, 4, [255, 0, 0, 255]))]);
    let ids = canvas.add_frames(vec![InputFrame::new("b.png", RgbaImage::new(4, 4))]);
    canvas.set_position(&ids, Some(0.0), Some(0.0));
    let opts = AssembleOptions {
        blend: BlendMode::Replace,
        ..Default::default()
    };
    let sheet = rasterize(&canvas, opts).unwrap();
    assert_eq!(*sheet.rgba.get_pixel(2, 2), Rgba([0, 0, 0, 0]));
}

#[test]
fn negative_positions_are_clipped() {
    let mut canvas = CanvasModel::new(free_form());
    let ids = canvas.add_frames(vec![
        InputFrame::new("a.png", solid(8, 8, [9, 9, 9, 255])),
        InputFrame::new("b.png", solid(8, 8, [7, 7, 7, 255])),
    ]);
    canvas.set_position(&ids[..1], Some(-4.0), Some(-4.0));
    let sheet = rasterize(&canvas, AssembleOptions::default()).unwrap();
    assert_eq!(sheet.rgba.dimensions(), (18, 18));
    assert_eq!(*sheet.rgba.get_pixel(0, 0), Rgba([9, 9, 9, 255]));
    assert_eq!(sheet.placements[0].x, -4);
}

#[test]
fn reloading_picks_up_new_pixels_and_skips_missing_files() {
    let mut canvas = CanvasModel::new(free_form());
    canvas.add_frames(vec![
        InputFrame::new("a.png", solid(4, 4, [1, 1, 1, 255])),
        InputFrame::new("gone.png", solid(4, 4, [2, 2, 2, 255])),
    ]);
    let source = MemorySource::new().with("a.png", solid(4, 4, [200, 100, 50, 255]));
    let sheet = rasterize_reloading(&canvas, &source, AssembleOptions::default()).unwrap();
    assert_eq!(sheet.skipped, 1);
    assert_eq!(sheet.placements.len(), 1);
    assert_eq!(*sheet.rgba.get_pixel(0, 0), Rgba([200, 100, 50, 255]));
}

#[test]
fn outlines_mark_frame_edges() {
    let mut canvas = CanvasModel::new(free_form());
    canvas.add_frames(vec![InputFrame::new("a.png", solid(6, 6, [0, 0, 0, 255]))]);
    let opts = AssembleOptions {
        outlines: true,
        ..Default::default()
    };
    let sheet = rasterize(&canvas, opts).unwrap();
    assert_eq!(*sheet.rgba.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(*sheet.rgba.get_pixel(5, 3), Rgba([255, 0, 0, 255]));
    assert_eq!(*sheet.rgba.get_pixel(2, 2), Rgba([0, 0, 0, 255]));
}

#[test]
fn tilemap_metadata_lists_every_placed_tile() {
    let cfg = GridLayoutConfig::builder()
        .kind(SheetKind::Tilemap)
        .tile_size(16)
        .columns(2)
        .build();
    let mut canvas = CanvasModel::new(cfg);
    canvas.add_frames(vec![
        InputFrame::new("grass.png", solid(16, 16, [0, 200, 0, 255])),
        InputFrame::new("rock.png", solid(8, 8, [90, 90, 90, 255])),
    ]);
    let sheet = rasterize(&canvas, AssembleOptions::default()).unwrap();
    assert_eq!(sheet.rgba.dimensions(), (32, 16));
    let records = export_metadata(&sheet.placements, "level1.png");
    assert_eq!(
        records[1],
        TileRecord {
            tilemap: "level1.png".into(),
            tile: "rock.png".into(),
            x: 16,
            y: 0,
            width: 8,
            height: 8,
        }
    );
}
