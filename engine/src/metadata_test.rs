#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

// =============================================================
// MapProperties
// =============================================================

#[test]
fn map_properties_from_full_record() {
    let props = MapProperties::try_from(json!({
        "gridType": "HEX_VERT",
        "gridSize": 64,
        "gridOffsetX": 10,
        "gridOffsetY": 20,
        "width": 12.5,
        "height": 8,
        "fogWidth": 13,
        "fogHeight": 8,
        "showGrid": true,
        "gridColour": "red"
    }))
    .unwrap();
    assert_eq!(props.grid_type, GridType::HexVert);
    assert_eq!(props.grid_size, 64.0);
    assert_eq!(props.grid_offset_x, 10.0);
    assert_eq!(props.width, 12.5);
    assert_eq!(props.fog_width, 13);
    assert!(props.show_grid);
    assert_eq!(props.grid_colour_hex(), Some(0xff_0000));
}

#[test]
fn map_properties_accept_numeric_strings() {
    let props = MapProperties::try_from(json!({"gridSize": "50", "width": " 20 ", "height": "10"})).unwrap();
    assert_eq!(props.grid_size, 50.0);
    assert_eq!(props.width, 20.0);
    assert_eq!(props.height, 10.0);
}

#[test]
fn map_properties_defaults_fill_gaps() {
    let props = MapProperties::try_from(json!({"width": 7.2, "height": 3})).unwrap();
    assert_eq!(props.grid_type, GridType::Square);
    assert_eq!(props.grid_size, 32.0);
    assert_eq!(props.fog_width, 8);
    assert_eq!(props.fog_height, 3);
    assert_eq!(props.grid_colour, "black");
}

#[test]
fn map_properties_reject_zero_grid_size() {
    let err = MapProperties::try_from(json!({"gridSize": 0})).unwrap_err();
    assert!(matches!(err, MetadataError::Malformed { kind: "map", .. }));
}

#[test]
fn map_properties_reject_non_numeric_width() {
    let err = MapProperties::try_from(json!({"width": "wide"})).unwrap_err();
    assert!(err.to_string().contains("width"));
}

#[test]
fn map_properties_reject_unknown_grid_type() {
    assert!(MapProperties::try_from(json!({"gridType": "TRIANGLE"})).is_err());
}

#[test]
fn map_properties_reject_non_object() {
    assert!(MapProperties::try_from(json!([1, 2, 3])).is_err());
}

#[test]
fn map_properties_serde_goes_through_validation() {
    let result = serde_json::from_value::<MapProperties>(json!({"gridSize": -4}));
    assert!(result.is_err());
    let props = MapProperties::default();
    let back: MapProperties = serde_json::from_value(serde_json::to_value(&props).unwrap()).unwrap();
    assert_eq!(back, props);
}

// =============================================================
// PieceProperties
// =============================================================

#[test]
fn piece_without_template_shape_is_mini() {
    let props = PieceProperties::try_from(json!({"width": 2, "height": 3})).unwrap();
    assert_eq!(props, PieceProperties::Mini(MiniProperties { width: 2.0, height: 3.0, scale: 1.0 }));
    assert!(!props.is_template());
}

#[test]
fn piece_with_template_shape_is_template() {
    let props = PieceProperties::try_from(json!({"templateShape": "CIRCLE", "colour": 255, "width": 3})).unwrap();
    let PieceProperties::Template(template) = &props else {
        panic!("expected template, got {props:?}");
    };
    assert_eq!(template.template_shape, TemplateShape::Circle);
    assert_eq!(template.colour, 255);
    assert!(props.is_template());
}

#[test]
fn piece_rejects_unknown_template_shape() {
    let err = PieceProperties::try_from(json!({"templateShape": "HEXAGON"})).unwrap_err();
    assert!(matches!(err, MetadataError::Malformed { kind: "template", .. }));
}

#[test]
fn piece_rejects_non_positive_scale() {
    assert!(PieceProperties::try_from(json!({"scale": 0})).is_err());
}

#[test]
fn piece_properties_serialize_untagged() {
    let props = PieceProperties::Mini(MiniProperties::default());
    let value = serde_json::to_value(&props).unwrap();
    assert_eq!(value, json!({"width": 1.0, "height": 1.0, "scale": 1.0}));
    let back: PieceProperties = serde_json::from_value(value).unwrap();
    assert_eq!(back, props);
}

// =============================================================
// Metadata
// =============================================================

#[test]
fn reduced_metadata_keeps_only_id() {
    let metadata = Metadata {
        id: "file-1".to_owned(),
        name: Some("Cave".to_owned()),
        properties: Some(MapProperties::default()),
    };
    let reduced = metadata.reduced();
    assert_eq!(reduced, Metadata::id_only("file-1"));
    assert_eq!(serde_json::to_value(&reduced).unwrap(), json!({"id": "file-1"}));
}

#[test]
fn raw_metadata_casts_to_typed() {
    let raw = RawMetadata {
        id: "file-2".to_owned(),
        name: Some("Goblin".to_owned()),
        properties: json!({"width": 1, "height": 1.5}),
    };
    let typed: Metadata<PieceProperties> = raw.cast().unwrap();
    assert_eq!(typed.id, "file-2");
    assert_eq!(typed.name.as_deref(), Some("Goblin"));
    assert!(matches!(typed.properties, Some(PieceProperties::Mini(_))));
}

#[test]
fn raw_metadata_without_properties_casts_to_unloaded() {
    let raw = RawMetadata { id: "file-3".to_owned(), name: None, properties: Value::Null };
    let typed: Metadata<MapProperties> = raw.cast().unwrap();
    assert!(typed.properties.is_none());
}

#[test]
fn raw_metadata_cast_surfaces_validation_error() {
    let raw = RawMetadata { id: "file-4".to_owned(), name: None, properties: json!({"gridSize": "zero"}) };
    assert!(raw.cast::<MapProperties>().is_err());
}

#[test]
fn merge_overlays_present_fields() {
    let mut metadata: Metadata<MapProperties> =
        Metadata { id: "file-5".to_owned(), name: Some("Old".to_owned()), properties: None };
    let raw = RawMetadata { id: "file-5".to_owned(), name: None, properties: json!({"width": 20, "height": 12}) };
    metadata.merge(&raw).unwrap();
    assert_eq!(metadata.name.as_deref(), Some("Old"));
    assert_eq!(metadata.properties.as_ref().map(|p| p.width), Some(20.0));
}

#[test]
fn failed_merge_leaves_metadata_alone() {
    let mut metadata: Metadata<MapProperties> = Metadata::id_only("file-6");
    let raw = RawMetadata { id: "file-6".to_owned(), name: Some("New".to_owned()), properties: json!({"gridSize": 0}) };
    assert!(metadata.merge(&raw).is_err());
    assert_eq!(metadata, Metadata::id_only("file-6"));
}

// =============================================================
// Colours
// =============================================================

#[test]
fn colour_hex_resolves_names_and_hex_strings() {
    assert_eq!(colour_hex("grey"), Some(0x9b_9b9b));
    assert_eq!(colour_hex("#00ff7f"), Some(0x00_ff7f));
    assert_eq!(colour_hex("123456"), Some(0x12_3456));
    assert_eq!(colour_hex(""), Some(0));
    assert_eq!(colour_hex("not-a-colour"), None);
}
