//! Coordinate model (C1): bounding boxes and per-task-kind bbox derivation.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::TaskType;

/// Inclusive axis-aligned integer bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: i64,
    pub min_y: i64,
    pub min_z: i64,
    pub max_x: i64,
    pub max_y: i64,
    pub max_z: i64,
}

impl BoundingBox {
    /// Builds a box from two opposite corners, normalizing min/max per axis.
    pub fn from_corners(x1: i64, y1: i64, z1: i64, x2: i64, y2: i64, z2: i64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            min_z: z1.min(z2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
            max_z: z1.max(z2),
        }
    }

    /// A single-cell box at `(x, y, z)`.
    pub fn point(x: i64, y: i64, z: i64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            min_z: z,
            max_x: x,
            max_y: y,
            max_z: z,
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
            && self.min_z <= other.max_z
            && self.max_z >= other.min_z
    }

    pub fn expand_x(&self, delta: i64) -> Self {
        Self {
            max_x: self.max_x + delta,
            ..*self
        }
    }

    pub fn expand_z(&self, delta: i64) -> Self {
        Self {
            max_z: self.max_z + delta,
            ..*self
        }
    }

    pub fn x_span(&self) -> i64 {
        self.max_x - self.min_x
    }

    pub fn y_span(&self) -> i64 {
        self.max_y - self.min_y
    }

    pub fn z_span(&self) -> i64 {
        self.max_z - self.min_z
    }
}

fn field_i64(data: &JsonValue, key: &str) -> Option<i64> {
    data.get(key).and_then(JsonValue::as_i64)
}

fn field_str<'a>(data: &'a JsonValue, key: &str) -> Option<&'a str> {
    data.get(key).and_then(JsonValue::as_str)
}

/// Derives the bounding box a task's effects will occupy, or `None` if the
/// payload is missing a field the derivation needs. A task without bounds is
/// still queueable; it is simply invisible to spatial queries.
pub fn bbox_of(task_type: TaskType, data: &JsonValue) -> Option<BoundingBox> {
    match task_type {
        TaskType::BlockSet => bbox_block_set(data),
        TaskType::BlockFill => bbox_block_fill(data),
        TaskType::PrefabDoor => bbox_prefab_door(data),
        TaskType::PrefabStairs => bbox_prefab_stairs(data),
        TaskType::PrefabWindow => bbox_prefab_window(data),
        TaskType::PrefabTorch | TaskType::PrefabSign => bbox_point(data),
        TaskType::PrefabLadder => bbox_prefab_ladder(data),
    }
}

fn bbox_block_set(data: &JsonValue) -> Option<BoundingBox> {
    let start_x = field_i64(data, "start_x")?;
    let start_y = field_i64(data, "start_y")?;
    let start_z = field_i64(data, "start_z")?;
    let blocks = data.get("blocks")?.as_array()?;

    let dim_x = blocks.len() as i64;
    let dim_y = blocks.first()?.as_array()?.len() as i64;
    let dim_z = blocks
        .first()?
        .as_array()?
        .first()?
        .as_array()?
        .len() as i64;

    if dim_x == 0 || dim_y == 0 || dim_z == 0 {
        return None;
    }

    Some(BoundingBox {
        min_x: start_x,
        min_y: start_y,
        min_z: start_z,
        max_x: start_x + dim_x - 1,
        max_y: start_y + dim_y - 1,
        max_z: start_z + dim_z - 1,
    })
}

fn bbox_block_fill(data: &JsonValue) -> Option<BoundingBox> {
    Some(BoundingBox::from_corners(
        field_i64(data, "x1")?,
        field_i64(data, "y1")?,
        field_i64(data, "z1")?,
        field_i64(data, "x2")?,
        field_i64(data, "y2")?,
        field_i64(data, "z2")?,
    ))
}

/// A door's footprint is a row of `width` slots along the rightward lateral
/// of `facing`, two blocks tall.
fn bbox_prefab_door(data: &JsonValue) -> Option<BoundingBox> {
    let x = field_i64(data, "start_x")?;
    let y = field_i64(data, "start_y")?;
    let z = field_i64(data, "start_z")?;
    let facing = field_str(data, "facing")?;
    let width = field_i64(data, "width")?.max(1);

    let base = BoundingBox {
        min_x: x,
        min_y: y,
        min_z: z,
        max_x: x,
        max_y: y + 1,
        max_z: z,
    };

    // Rightward lateral: facing north -> +x, south -> -x, east -> +z, west -> -z.
    let extra = width - 1;
    Some(match facing {
        "n" | "north" => base.expand_x(extra),
        "s" | "south" => BoundingBox {
            min_x: x - extra,
            ..base
        },
        "e" | "east" => base.expand_z(extra),
        "w" | "west" => BoundingBox {
            min_z: z - extra,
            ..base
        },
        _ => return None,
    })
}

/// A staircase run's box is the axis-wise min/max of the two endpoints,
/// expanded perpendicular to `staircase_direction` by the run's own width.
fn bbox_prefab_stairs(data: &JsonValue) -> Option<BoundingBox> {
    let start_x = field_i64(data, "start_x")?;
    let start_y = field_i64(data, "start_y")?;
    let start_z = field_i64(data, "start_z")?;
    let end_x = field_i64(data, "end_x")?;
    let end_y = field_i64(data, "end_y")?;
    let end_z = field_i64(data, "end_z")?;
    let direction = field_str(data, "staircase_direction")?;

    let base = BoundingBox::from_corners(start_x, start_y, start_z, end_x, end_y, end_z);

    Some(match direction {
        "n" | "s" | "north" | "south" => {
            // Travels along Z; expand perpendicular X by the run's width.
            let width = base.x_span().max(base.z_span());
            base.expand_x(width)
        }
        "e" | "w" | "east" | "west" => {
            let width = base.z_span().max(base.x_span());
            base.expand_z(width)
        }
        _ => return None,
    })
}

/// A window wall is a 1-block-thick plane spanning `height` vertically and
/// the horizontal span in the perpendicular plane.
fn bbox_prefab_window(data: &JsonValue) -> Option<BoundingBox> {
    let start_x = field_i64(data, "start_x")?;
    let start_y = field_i64(data, "start_y")?;
    let start_z = field_i64(data, "start_z")?;
    let end_x = field_i64(data, "end_x")?;
    let end_z = field_i64(data, "end_z")?;
    let height = field_i64(data, "height")?.max(1);

    Some(BoundingBox {
        min_x: start_x.min(end_x),
        min_y: start_y,
        min_z: start_z.min(end_z),
        max_x: start_x.max(end_x),
        max_y: start_y + height - 1,
        max_z: start_z.max(end_z),
    })
}

fn bbox_point(data: &JsonValue) -> Option<BoundingBox> {
    Some(BoundingBox::point(
        field_i64(data, "x")?,
        field_i64(data, "y")?,
        field_i64(data, "z")?,
    ))
}

fn bbox_prefab_ladder(data: &JsonValue) -> Option<BoundingBox> {
    let x = field_i64(data, "x")?;
    let y = field_i64(data, "y")?;
    let z = field_i64(data, "z")?;
    let height = field_i64(data, "height")?.max(1);

    Some(BoundingBox {
        min_x: x,
        min_y: y,
        min_z: z,
        max_x: x,
        max_y: y + height - 1,
        max_z: z,
    })
}
