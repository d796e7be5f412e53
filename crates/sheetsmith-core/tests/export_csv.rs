use sheetsmith_core::export::{TILE_CSV_HEADER, placements_to_json};
use sheetsmith_core::prelude::*;

fn record(tile: &str, x: i64) -> TileRecord {
    TileRecord {
        tilemap: "map.png".into(),
        tile: tile.into(),
        x,
        y: 0,
        width: 16,
        height: 16,
    }
}

#[test]
fn csv_has_header_and_crlf_rows() {
    let csv = tile_records_to_csv(&[record("a.png", 0), record("b.png", 16)]);
    let lines: Vec<&str> = csv.split("\r\n").collect();
    assert_eq!(lines[0], TILE_CSV_HEADER);
    assert_eq!(lines[1], "map.png,a.png,0,0,16,16");
    assert_eq!(lines[2], "map.png,b.png,16,0,16,16");
    assert_eq!(lines[3], "");
    assert_eq!(lines.len(), 4);
}

#[test]
fn awkward_names_are_quoted() {
    let csv = tile_records_to_csv(&[record("grass, tall.png", 0), record("say \"hi\".png", 16)]);
    assert!(csv.contains("map.png,\"grass, tall.png\",0,0,16,16\r\n"));
    assert!(csv.contains("map.png,\"say \"\"hi\"\".png\",16,0,16,16\r\n"));
}

#[test]
fn empty_metadata_is_just_the_header() {
    assert_eq!(tile_records_to_csv(&[]), format!("{TILE_CSV_HEADER}\r\n"));
}

#[test]
fn placements_json_lists_frames() {
    let placements = vec![Placement {
        key: "hero.png".into(),
        x: 3,
        y: 4,
        width: 8,
        height: 9,
    }];
    let v = placements_to_json("sheet.png", (20, 10), &placements);
    assert_eq!(v["image"], "sheet.png");
    assert_eq!(v["size"]["w"], 20);
    assert_eq!(v["frames"][0]["key"], "hero.png");
    assert_eq!(v["frames"][0]["h"], 9);
}
