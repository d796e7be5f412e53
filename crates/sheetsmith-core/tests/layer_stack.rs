use sheetsmith_core::prelude::*;

#[test]
fn new_stack_has_one_active_reference_layer() {
    let stack = LayerStack::new();
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.active(), LayerId(1));
    assert_eq!(stack.reference(), LayerId(1));
    assert_eq!(stack.get(LayerId(1)).map(|l| l.name.as_str()), Some("Layer 1"));
}

#[test]
fn ids_keep_increasing_after_deletes() {
    let mut stack = LayerStack::new();
    let two = stack.add_layer("Shadows");
    let three = stack.add_layer("Weapons");
    assert_eq!((two, three), (LayerId(2), LayerId(3)));
    stack.delete(three).unwrap();
    assert_eq!(stack.add_layer("FX"), LayerId(4));
}

#[test]
fn deleting_the_active_layer_falls_back_to_the_first() {
    let mut stack = LayerStack::new();
    let two = stack.add_layer("Top");
    stack.set_active(two).unwrap();
    stack.set_reference(two).unwrap();
    let fallback = stack.delete(two).unwrap();
    assert_eq!(fallback, LayerId(1));
    assert_eq!(stack.active(), LayerId(1));
    assert_eq!(stack.reference(), LayerId(1));

    let two = stack.add_layer("Top");
    let fallback = stack.delete(LayerId(1)).unwrap();
    assert_eq!(fallback, two);
    assert_eq!(stack.first_id(), two);
}

#[test]
fn last_layer_cannot_be_deleted() {
    let mut stack = LayerStack::new();
    assert!(matches!(stack.delete(LayerId(1)), Err(SheetError::LastLayer)));
    assert!(matches!(
        stack.delete(LayerId(9)),
        Err(SheetError::LayerNotFound(LayerId(9)))
    ));
    assert_eq!(stack.len(), 1);
}

#[test]
fn reorder_and_step_moves_change_z_index() {
    let mut stack = LayerStack::new();
    let two = stack.add_layer("B");
    let three = stack.add_layer("C");
    assert_eq!(stack.z_index(three), Some(2));

    assert!(!stack.move_up(three).unwrap());
    assert!(stack.move_down(three).unwrap());
    assert_eq!(stack.z_index(three), Some(1));
    assert_eq!(stack.z_index(two), Some(2));

    stack.reorder(two, 0).unwrap();
    let order: Vec<LayerId> = stack.iter().map(|l| l.id).collect();
    assert_eq!(order, vec![two, LayerId(1), three]);
    assert!(!stack.move_down(two).unwrap());

    stack.reorder(two, 99).unwrap();
    assert_eq!(stack.z_index(two), Some(2));
}

#[test]
fn unknown_ids_are_rejected_or_resolved_to_first() {
    let mut stack = LayerStack::new();
    assert!(stack.set_active(LayerId(7)).is_err());
    assert!(stack.rename(LayerId(7), "x").is_err());
    assert_eq!(stack.resolve_or_first(LayerId(7)), LayerId(1));
    stack.rename(LayerId(1), "Body").unwrap();
    assert_eq!(stack.get(LayerId(1)).unwrap().name, "Body");
}

#[test]
fn from_layers_validates_active_and_reference() {
    let layers = vec![Layer::new(LayerId(5), "A"), Layer::new(LayerId(8), "B")];
    let stack = LayerStack::from_layers(layers, Some(LayerId(8)), Some(LayerId(42)));
    assert_eq!(stack.active(), LayerId(8));
    assert_eq!(stack.reference(), LayerId(5));

    let mut stack = stack;
    assert_eq!(stack.add_layer("C"), LayerId(9));

    let empty = LayerStack::from_layers(Vec::new(), None, None);
    assert_eq!(empty.len(), 1);
}

#[test]
fn anchor_settings_drop_the_cached_layer_anchor() {
    let mut stack = LayerStack::new();
    let id = stack.active();
    stack.set_anchor_mode(id, AnchorMode::Global).unwrap();
    stack.set_anchor_source(id, AnchorSource::Manual).unwrap();
    stack.set_global_anchor(id, Some(Anchor::new(4, 9))).unwrap();
    stack.set_anchor_padding(id, 2).unwrap();
    stack.set_anchor_type(id, AnchorType::Top).unwrap();
    let layer = stack.get(id).unwrap();
    assert_eq!(layer.anchor(), Some(Anchor::new(4, 9)));
    assert_eq!(layer.anchor_type(), AnchorType::Top);
    assert_eq!(layer.anchor_padding(), 2);
    assert_eq!(layer.cached_auto_anchor(), None);
}
