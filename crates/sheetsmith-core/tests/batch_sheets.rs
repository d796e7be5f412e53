use image::{Rgba, RgbaImage};
use sheetsmith_core::batch::{
    BatchJob, BatchKind, arrange, build_many, extract_group_prefix, group_by_prefix,
    sheet_file_name, sprite_sort_key, tilemap_file_name,
};
use sheetsmith_core::prelude::*;

fn frame(key: &str, w: u32, h: u32) -> InputFrame {
    InputFrame::new(key, RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255])))
}

#[test]
fn group_prefix_is_the_first_token() {
    assert_eq!(extract_group_prefix("hero_F1.png"), "hero");
    assert_eq!(extract_group_prefix("slime-walk-3.png"), "slime");
    assert_eq!(extract_group_prefix("tree.png"), "tree");
}

#[test]
fn numeric_prefixes_defer_to_a_named_second_token() {
    assert_eq!(extract_group_prefix("001_hero_F1.png"), "hero");
    assert_eq!(extract_group_prefix("001_F1.png"), "001");
    assert_eq!(extract_group_prefix("001_n.png"), "001");
    assert_eq!(extract_group_prefix("001_002.png"), "001");
    assert_eq!(extract_group_prefix("_odd.png"), "_odd");
}

#[test]
fn frames_sort_by_direction_then_frame_number() {
    let mut names = vec!["hero_S_F2.png", "hero_N_F2.png", "hero_E_F1.png", "hero_N_F1.png", "hero_F3.png"];
    names.sort_by_key(|n| sprite_sort_key(n));
    assert_eq!(
        names,
        vec!["hero_N_F1.png", "hero_N_F2.png", "hero_E_F1.png", "hero_S_F2.png", "hero_F3.png"]
    );
}

#[test]
fn numbered_names_sort_numerically_after_frame_names() {
    let mut names = vec!["walk_10.png", "walk.png", "walk_2.png", "walk_F1.png"];
    names.sort_by_key(|n| sprite_sort_key(n));
    assert_eq!(names, vec!["walk_F1.png", "walk_2.png", "walk_10.png", "walk.png"]);
}

#[test]
fn grouping_sorts_each_group() {
    let groups = group_by_prefix(["b_2.png", "a_F2.png", "b_1.png", "a_F1.png", "c.png"]);
    assert_eq!(groups.len(), 3);
    assert_eq!(groups["a"], vec!["a_F1.png", "a_F2.png"]);
    assert_eq!(groups["b"], vec!["b_1.png", "b_2.png"]);
    assert_eq!(groups["c"], vec!["c.png"]);
}

#[test]
fn arrangements_choose_rows_and_columns() {
    assert_eq!(arrange(5, Arrangement::Grid, 2), (2, 3));
    assert_eq!(arrange(5, Arrangement::Grid, 0), (1, 5));
    assert_eq!(arrange(5, Arrangement::Horizontal, 2), (5, 1));
    assert_eq!(arrange(5, Arrangement::Vertical, 2), (1, 5));
}

#[test]
fn sprite_sheets_use_the_largest_frame_as_cell() {
    let frames = vec![
        frame("a.png", 8, 8),
        frame("b.png", 10, 6),
        frame("c.png", 8, 8),
    ];
    let opts = BatchSheetOptions {
        arrangement: Arrangement::Grid,
        columns: 2,
        padding_mode: PaddingMode::Fixed,
        padding: 1,
    };
    let sheet = build_sprite_sheet(&frames, opts).unwrap();
    assert_eq!(sheet.rgba.dimensions(), (21, 17));
    assert_eq!((sheet.placements[1].x, sheet.placements[1].y), (11, 0));
    assert_eq!((sheet.placements[2].x, sheet.placements[2].y), (0, 9));
    assert_eq!(sheet.placements[1].width, 10);

    let wide = BatchSheetOptions {
        arrangement: Arrangement::Horizontal,
        padding_mode: PaddingMode::FrameWidth,
        ..opts
    };
    let sheet = build_sprite_sheet(&frames, wide).unwrap();
    assert_eq!(sheet.rgba.dimensions(), (50, 8));
}

#[test]
fn tilemaps_grow_cells_past_the_tile_size_without_padding() {
    let frames = vec![
        frame("a.png", 8, 8),
        frame("b.png", 20, 12),
        frame("c.png", 8, 8),
    ];
    let opts = BatchTileOptions {
        arrangement: Arrangement::Grid,
        columns: 2,
        tile_size: 16,
    };
    let map = build_tilemap(&frames, opts).unwrap();
    assert_eq!(map.rgba.dimensions(), (40, 32));
    assert_eq!((map.placements[1].x, map.placements[2].y), (20, 16));
    assert_eq!((map.placements[1].width, map.placements[1].height), (20, 12));
}

#[test]
fn empty_batches_are_errors() {
    assert!(matches!(
        build_sprite_sheet(&[], BatchSheetOptions::default()),
        Err(SheetError::Empty)
    ));
    assert!(matches!(
        build_tilemap(&[], BatchTileOptions::default()),
        Err(SheetError::Empty)
    ));
}

#[test]
fn build_many_keeps_job_order() {
    let jobs = vec![
        BatchJob {
            name: "hero".into(),
            frames: vec![frame("hero_F1.png", 4, 4), frame("hero_F2.png", 4, 4)],
            kind: BatchKind::Sheet(BatchSheetOptions::default()),
        },
        BatchJob {
            name: "empty".into(),
            frames: Vec::new(),
            kind: BatchKind::Sheet(BatchSheetOptions::default()),
        },
        BatchJob {
            name: "ground".into(),
            frames: vec![frame("dirt.png", 16, 16)],
            kind: BatchKind::Tilemap(BatchTileOptions::default()),
        },
    ];
    let results = build_many(&jobs);
    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["hero", "empty", "ground"]);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    let ground = results[2].1.as_ref().unwrap();
    assert_eq!(ground.rgba.dimensions(), (8 * 32, 32));
}

#[test]
fn output_names() {
    assert_eq!(sheet_file_name("hero"), "hero_Spritesheet.png");
    assert_eq!(tilemap_file_name("forest"), "forest_tilemap.png");
}
