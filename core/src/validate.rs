//! Task-data validator (C4).
//!
//! Pure, side-effect-free validation of an untyped `task_data` payload
//! against the schema implied by its `task_type`. Returns every offending
//! field's message joined into one [`ValidationError`], matching the
//! spec's "ok or a failure carrying every offending field's message".

use serde_json::Value as JsonValue;

use crate::domain::TaskType;
use crate::error::ValidationError;

const FACINGS: &[&str] = &["north", "south", "east", "west", "n", "s", "e", "w"];
const HINGES: &[&str] = &["left", "right"];

pub fn validate(task_type: TaskType, data: &JsonValue) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    match task_type {
        TaskType::BlockSet => validate_block_set(data, &mut errors),
        TaskType::BlockFill => validate_block_fill(data, &mut errors),
        TaskType::PrefabDoor => validate_prefab_door(data, &mut errors),
        TaskType::PrefabStairs => validate_prefab_stairs(data, &mut errors),
        TaskType::PrefabWindow => validate_prefab_window(data, &mut errors),
        TaskType::PrefabTorch => validate_prefab_torch(data, &mut errors),
        TaskType::PrefabSign => validate_prefab_sign(data, &mut errors),
        TaskType::PrefabLadder => validate_prefab_ladder(data, &mut errors),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(errors))
    }
}

fn require_i64(data: &JsonValue, key: &str, errors: &mut Vec<String>) -> Option<i64> {
    match data.get(key) {
        None => {
            errors.push(format!("missing required field '{key}'"));
            None
        }
        Some(v) => match v.as_i64() {
            Some(n) => Some(n),
            None => {
                errors.push(format!("field '{key}' must be an integer"));
                None
            }
        },
    }
}

fn require_bool(data: &JsonValue, key: &str, default: Option<bool>, errors: &mut Vec<String>) -> bool {
    match data.get(key) {
        None => default.unwrap_or(false),
        Some(v) => match v.as_bool() {
            Some(b) => b,
            None => {
                errors.push(format!("field '{key}' must be a boolean"));
                false
            }
        },
    }
}

fn require_str<'a>(data: &'a JsonValue, key: &str, errors: &mut Vec<String>) -> Option<&'a str> {
    match data.get(key) {
        None => {
            errors.push(format!("missing required field '{key}'"));
            None
        }
        Some(v) => match v.as_str() {
            Some(s) => Some(s),
            None => {
                errors.push(format!("field '{key}' must be a string"));
                None
            }
        },
    }
}

fn optional_str<'a>(data: &'a JsonValue, key: &str, errors: &mut Vec<String>) -> Option<&'a str> {
    match data.get(key) {
        None | Some(JsonValue::Null) => None,
        Some(v) => match v.as_str() {
            Some(s) => Some(s),
            None => {
                errors.push(format!("field '{key}' must be a string"));
                None
            }
        },
    }
}

fn check_enum(value: Option<&str>, key: &str, allowed: &[&str], errors: &mut Vec<String>) {
    if let Some(v) = value {
        if !allowed.contains(&v) {
            errors.push(format!(
                "field '{key}' has invalid value '{v}', expected one of {allowed:?}"
            ));
        }
    }
}

/// A namespaced block id is `namespace:path`, both non-empty.
fn check_namespaced_id(value: Option<&str>, key: &str, errors: &mut Vec<String>) {
    if let Some(v) = value {
        match v.split_once(':') {
            Some((ns, path)) if !ns.is_empty() && !path.is_empty() => {}
            _ => errors.push(format!(
                "field '{key}' must be a namespaced id of the form 'namespace:path', got '{v}'"
            )),
        }
    }
}

fn require_positive(value: Option<i64>, key: &str, errors: &mut Vec<String>) {
    if let Some(n) = value {
        if n < 1 {
            errors.push(format!("field '{key}' must be >= 1, got {n}"));
        }
    }
}

fn validate_block_set(data: &JsonValue, errors: &mut Vec<String>) {
    require_i64(data, "start_x", errors);
    require_i64(data, "start_y", errors);
    require_i64(data, "start_z", errors);

    match data.get("blocks").and_then(JsonValue::as_array) {
        None => errors.push("missing required field 'blocks'".to_string()),
        Some(plane) => {
            if plane.is_empty() {
                errors.push("field 'blocks' must be a non-empty 3-D array".to_string());
            }
            for (i, row) in plane.iter().enumerate() {
                let Some(row) = row.as_array() else {
                    errors.push(format!("field 'blocks[{i}]' must be an array"));
                    continue;
                };
                for (j, col) in row.iter().enumerate() {
                    let Some(col) = col.as_array() else {
                        errors.push(format!("field 'blocks[{i}][{j}]' must be an array"));
                        continue;
                    };
                    for cell in col {
                        if cell.is_null() {
                            continue;
                        }
                        if cell.get("block_name").and_then(JsonValue::as_str).is_none() {
                            errors.push(format!(
                                "field 'blocks[{i}][{j}]' cells must be null or have a string 'block_name'"
                            ));
                        }
                    }
                }
            }
        }
    }
}

fn validate_block_fill(data: &JsonValue, errors: &mut Vec<String>) {
    require_i64(data, "x1", errors);
    require_i64(data, "y1", errors);
    require_i64(data, "z1", errors);
    require_i64(data, "x2", errors);
    require_i64(data, "y2", errors);
    require_i64(data, "z2", errors);
    let block_type = require_str(data, "block_type", errors);
    check_namespaced_id(block_type, "block_type", errors);
    require_bool(data, "notify_neighbors", Some(true), errors);
    optional_str(data, "world", errors);
}

fn validate_prefab_door(data: &JsonValue, errors: &mut Vec<String>) {
    require_i64(data, "start_x", errors);
    require_i64(data, "start_y", errors);
    require_i64(data, "start_z", errors);
    let facing = require_str(data, "facing", errors);
    check_enum(facing, "facing", FACINGS, errors);
    let block_type = require_str(data, "block_type", errors);
    check_namespaced_id(block_type, "block_type", errors);
    if let Some(bt) = block_type {
        if !bt.contains("door") {
            errors.push(format!("field 'block_type' must name a door block, got '{bt}'"));
        }
    }
    let width = require_i64(data, "width", errors);
    require_positive(width, "width", errors);
    let hinge = require_str(data, "hinge", errors);
    check_enum(hinge, "hinge", HINGES, errors);
    require_bool(data, "open", Some(false), errors);
    require_bool(data, "double_doors", Some(false), errors);
}

fn validate_prefab_stairs(data: &JsonValue, errors: &mut Vec<String>) {
    require_i64(data, "start_x", errors);
    require_i64(data, "start_y", errors);
    require_i64(data, "start_z", errors);
    require_i64(data, "end_x", errors);
    require_i64(data, "end_y", errors);
    require_i64(data, "end_z", errors);
    let block_type = require_str(data, "block_type", errors);
    check_namespaced_id(block_type, "block_type", errors);
    let stair_type = require_str(data, "stair_type", errors);
    check_namespaced_id(stair_type, "stair_type", errors);
    if let Some(st) = stair_type {
        if !st.contains("stair") {
            errors.push(format!("field 'stair_type' must name a stair block, got '{st}'"));
        }
    }
    let direction = require_str(data, "staircase_direction", errors);
    check_enum(direction, "staircase_direction", FACINGS, errors);
    require_bool(data, "fill_support", Some(false), errors);
}

fn validate_prefab_window(data: &JsonValue, errors: &mut Vec<String>) {
    let start_x = require_i64(data, "start_x", errors);
    require_i64(data, "start_y", errors);
    let start_z = require_i64(data, "start_z", errors);
    let end_x = require_i64(data, "end_x", errors);
    let end_z = require_i64(data, "end_z", errors);

    if let (Some(sx), Some(sz), Some(ex), Some(ez)) = (start_x, start_z, end_x, end_z) {
        let x_aligned = sx == ex;
        let z_aligned = sz == ez;
        if x_aligned == z_aligned {
            errors.push(
                "window must be wall-axis-aligned: exactly one of start_x==end_x or start_z==end_z"
                    .to_string(),
            );
        }
    }

    let height = require_i64(data, "height", errors);
    require_positive(height, "height", errors);
    let block_type = require_str(data, "block_type", errors);
    check_namespaced_id(block_type, "block_type", errors);
    if let Some(bt) = block_type {
        if !bt.contains("pane") && !bt.contains("glass") {
            errors.push(format!("field 'block_type' must name a pane block, got '{bt}'"));
        }
    }
    require_bool(data, "waterlogged", Some(false), errors);
}

fn validate_prefab_torch(data: &JsonValue, errors: &mut Vec<String>) {
    require_i64(data, "x", errors);
    require_i64(data, "y", errors);
    require_i64(data, "z", errors);
    let block_type = require_str(data, "block_type", errors);
    check_namespaced_id(block_type, "block_type", errors);
    let facing = optional_str(data, "facing", errors);
    if let Some(bt) = block_type {
        if bt.contains("wall_torch") {
            check_enum(facing, "facing", FACINGS, errors);
        }
    }
}

fn validate_prefab_sign(data: &JsonValue, errors: &mut Vec<String>) {
    require_i64(data, "x", errors);
    require_i64(data, "y", errors);
    require_i64(data, "z", errors);
    let block_type = require_str(data, "block_type", errors);
    check_namespaced_id(block_type, "block_type", errors);

    for key in ["front_lines", "back_lines"] {
        match data.get(key) {
            None | Some(JsonValue::Null) => {}
            Some(v) => match v.as_array() {
                None => errors.push(format!("field '{key}' must be an array")),
                Some(lines) => {
                    if lines.len() > 4 {
                        errors.push(format!("field '{key}' may have at most 4 lines, got {}", lines.len()));
                    }
                    for line in lines {
                        if line.as_str().is_none() {
                            errors.push(format!("field '{key}' entries must be strings"));
                        }
                    }
                }
            },
        }
    }

    if let Some(rotation) = data.get("rotation") {
        match rotation.as_i64() {
            Some(r) if !(0..=15).contains(&r) => {
                errors.push(format!("field 'rotation' must be in [0,15], got {r}"))
            }
            None => errors.push("field 'rotation' must be an integer".to_string()),
            _ => {}
        }
    }

    let facing = optional_str(data, "facing", errors);
    check_enum(facing, "facing", FACINGS, errors);
    require_bool(data, "glowing", Some(false), errors);
}

fn validate_prefab_ladder(data: &JsonValue, errors: &mut Vec<String>) {
    require_i64(data, "x", errors);
    require_i64(data, "y", errors);
    require_i64(data, "z", errors);
    let height = require_i64(data, "height", errors);
    require_positive(height, "height", errors);
    let block_type = require_str(data, "block_type", errors);
    check_namespaced_id(block_type, "block_type", errors);
    if let Some(bt) = block_type {
        if !bt.contains("ladder") {
            errors.push(format!("field 'block_type' must name a ladder block, got '{bt}'"));
        }
    }
    let facing = optional_str(data, "facing", errors);
    check_enum(facing, "facing", FACINGS, errors);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn block_fill_requires_namespaced_block_type() {
        let data = json!({
            "x1": 0, "y1": 0, "z1": 0, "x2": 1, "y2": 1, "z2": 1,
            "block_type": "stone",
        });
        let err = validate(TaskType::BlockFill, &data).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("namespaced id")));
    }

    #[test]
    fn block_fill_accepts_valid_payload() {
        let data = json!({
            "x1": 0, "y1": 0, "z1": 0, "x2": 1, "y2": 1, "z2": 1,
            "block_type": "minecraft:stone",
        });
        assert!(validate(TaskType::BlockFill, &data).is_ok());
    }

    #[test]
    fn sign_rejects_more_than_four_lines() {
        let data = json!({
            "x": 0, "y": 0, "z": 0, "block_type": "minecraft:oak_sign",
            "front_lines": ["a", "b", "c", "d", "e"],
        });
        let err = validate(TaskType::PrefabSign, &data).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("at most 4 lines")));
    }

    #[test]
    fn sign_rejects_rotation_out_of_range() {
        let data = json!({
            "x": 0, "y": 0, "z": 0, "block_type": "minecraft:oak_sign", "rotation": 16,
        });
        let err = validate(TaskType::PrefabSign, &data).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("rotation")));
    }

    #[test]
    fn window_requires_exactly_one_axis_aligned() {
        let both = json!({
            "start_x": 0, "start_y": 64, "start_z": 0,
            "end_x": 0, "end_z": 0, "height": 2, "block_type": "minecraft:glass_pane",
        });
        let err = validate(TaskType::PrefabWindow, &both).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("wall-axis-aligned")));

        let neither = json!({
            "start_x": 0, "start_y": 64, "start_z": 0,
            "end_x": 5, "end_z": 5, "height": 2, "block_type": "minecraft:glass_pane",
        });
        let err = validate(TaskType::PrefabWindow, &neither).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("wall-axis-aligned")));

        let ok = json!({
            "start_x": 0, "start_y": 64, "start_z": 0,
            "end_x": 0, "end_z": 5, "height": 2, "block_type": "minecraft:glass_pane",
        });
        assert!(validate(TaskType::PrefabWindow, &ok).is_ok());
    }

    #[test]
    fn door_requires_door_block_and_positive_width() {
        let data = json!({
            "start_x": 0, "start_y": 64, "start_z": 0,
            "facing": "north", "block_type": "minecraft:oak_planks",
            "width": 0, "hinge": "left", "open": false, "double_doors": false,
        });
        let err = validate(TaskType::PrefabDoor, &data).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("door block")));
        assert!(err.0.iter().any(|m| m.contains("width")));
    }

    #[test]
    fn missing_fields_are_all_reported_together() {
        let data = json!({});
        let err = validate(TaskType::PrefabLadder, &data).unwrap_err();
        assert!(err.0.len() >= 4);
    }
}
