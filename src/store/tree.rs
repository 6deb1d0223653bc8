use serde_json::{Map, Value};

use super::path;

/// Null and `{}` both mean "nothing stored here".
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

pub fn get_at<'a>(node: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    let mut current = node;
    for seg in segs {
        current = current.as_object()?.get(*seg)?;
    }
    if is_empty(current) {
        None
    } else {
        Some(current)
    }
}

/// Replaces the value at `segs`, creating intermediate objects and pruning
/// branches left empty.
pub fn set_at(node: &mut Value, segs: &[&str], value: Value) {
    let Some((first, rest)) = segs.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry((*first).to_string()).or_insert(Value::Null);
        set_at(child, rest, value);
        if is_empty(child) {
            map.remove(*first);
        }
    }
}

/// Rebuilds the value at `target` from stored records, each keyed by its full
/// path. A record at the target or above it holds the whole answer; otherwise
/// the records below the target are stitched together.
pub fn assemble(target: &[&str], rows: Vec<(String, Value)>) -> Option<Value> {
    let mut assembled = Value::Null;
    for (row_path, value) in rows {
        let row_segs = path::segments(&row_path);
        if row_segs.len() <= target.len() {
            return get_at(&value, &target[row_segs.len()..]).cloned();
        }
        set_at(&mut assembled, &row_segs[target.len()..], value);
    }
    get_at(&assembled, &[]).cloned()
}

/// Applies a write at `rel` inside an existing record. `None` means nothing is
/// left and the record should be removed.
pub fn merge_into(mut record: Value, rel: &[&str], value: Value) -> Option<Value> {
    set_at(&mut record, rel, value);
    if is_empty(&record) {
        None
    } else {
        Some(record)
    }
}
