#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, serde_json::to_vec_pretty(value).expect("serialize json"))
        .expect("write json file");
}

pub fn read_json(path: &Path) -> Value {
    let bytes = fs::read(path).expect("read json file");
    serde_json::from_slice(&bytes).expect("parse json file")
}

fn box_object(class_name: &str, sub_type: Option<&str>, coord: [f64; 4]) -> Value {
    let properties = match sub_type {
        Some(option) => json!([{
            "type": "checkbox",
            "property_id": "prop-car",
            "property_name": format!("{class_name}_Type"),
            "option_names": [option]
        }]),
        None => json!([]),
    };
    json!({
        "id": format!("obj-{class_name}-{}", coord[0]),
        "class_id": format!("class-{class_name}"),
        "class_name": class_name,
        "annotation_type": "box",
        "annotation": {
            "coord": {"x": coord[0], "y": coord[1], "width": coord[2], "height": coord[3]}
        },
        "properties": properties
    })
}

/// A Superb AI image export in the shape the platform produces.
///
/// Classes: `person` (plain) and `car` with a `car_Type` property
/// (`sedan`, `suv`). Images live in a separate `images/` tree:
///
/// - `train/0001.bmp` 64x48, dimensions given in `image_info`:
///   a person and an suv.
/// - `train/0002.bmp` 32x16, no `image_info`: a sedan.
///
/// Returns `(image_dir, label_dir)`.
pub fn write_superb_image_export(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let image_dir = root.join("images");
    let label_dir = root.join("export");

    write_json(
        &label_dir.join("project.json"),
        &json!({
            "type": "image-siesta",
            "version": "0.6.5",
            "data_type": "image",
            "categorization": {"properties": []},
            "object_detection": {
                "keypoints": [],
                "object_groups": [],
                "annotation_types": ["box"],
                "object_classes": [
                    {"id": "class-person", "name": "person", "color": "#FF0000",
                     "properties": [], "constraints": {}, "ai_class_map": [],
                     "annotation_type": "box"},
                    {"id": "class-car", "name": "car", "color": "#00FF00",
                     "properties": [{
                        "id": "prop-car", "name": "car_Type", "type": "checkbox",
                        "options": [{"id": "opt-sedan", "name": "sedan"},
                                    {"id": "opt-suv", "name": "suv"}],
                        "required": true, "description": "",
                        "render_value": false, "default_value": []
                     }],
                     "constraints": {}, "ai_class_map": [], "annotation_type": "box"}
                ]
            }
        }),
    );

    write_json(
        &label_dir.join("meta/train/0001.bmp.json"),
        &json!({
            "data_key": "train/0001.bmp",
            "dataset": "vendor-set",
            "image_info": {"width": 64, "height": 48},
            "label_id": "label-1",
            "label_path": ["labels/label-1.json"],
            "tags": [],
            "status": "Submitted"
        }),
    );
    write_json(
        &label_dir.join("meta/train/0002.bmp.json"),
        &json!({
            "data_key": "/train/0002.bmp",
            "dataset": "vendor-set",
            "label_id": "label-2",
            "label_path": ["labels/label-2.json"]
        }),
    );

    write_json(
        &label_dir.join("labels/label-1.json"),
        &json!({"objects": [
            box_object("person", None, [1.0, 2.0, 10.0, 20.0]),
            box_object("car", Some("suv"), [30.0, 10.0, 25.5, 12.0]),
        ]}),
    );
    write_json(
        &label_dir.join("labels/label-2.json"),
        &json!({"objects": [box_object("car", Some("sedan"), [0.0, 0.0, 32.0, 16.0])]}),
    );

    write_bmp(&image_dir.join("train/0001.bmp"), 64, 48);
    write_bmp(&image_dir.join("train/0002.bmp"), 32, 16);

    (image_dir, label_dir)
}
