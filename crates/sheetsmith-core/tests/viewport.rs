use sheetsmith_core::prelude::*;
use sheetsmith_core::viewport::{MAX_ZOOM, MIN_ZOOM};

#[test]
fn zoom_is_clamped() {
    let mut view = Viewport::default();
    assert!(view.set_zoom(10.0));
    assert_eq!(view.zoom(), MAX_ZOOM);
    assert!(!view.set_zoom(8.0));
    assert!(view.set_zoom(0.01));
    assert_eq!(view.zoom(), MIN_ZOOM);
    assert!(!view.set_zoom(f64::NAN));
}

#[test]
fn wheel_steps_by_ten_percent() {
    let mut view = Viewport::default();
    assert!(view.zoom_wheel(120.0));
    assert!((view.zoom() - 1.1).abs() < 1e-9);
    assert!(view.zoom_wheel(-120.0));
    assert!((view.zoom() - 0.99).abs() < 1e-9);
    assert!(!view.zoom_wheel(0.0));
}

#[test]
fn screen_and_world_coordinates_are_inverse() {
    let mut view = Viewport::default();
    view.set_zoom(2.0);
    view.pan_by(10.0, -5.0);
    assert_eq!(view.to_screen(3.0, 4.0), (16.0, 3.0));
    assert_eq!(view.to_world(16.0, 3.0), (3.0, 4.0));
}

#[test]
fn scaled_sizes_never_collapse() {
    let mut view = Viewport::default();
    view.set_zoom(0.2);
    assert_eq!(view.scaled_size(64, 2), (13, 1));
}
