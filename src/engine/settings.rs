//! Walking settings against a settings schema.
//!
//! The walk runs in two phases. [`collect_slots`] copies the settings tree while
//! recording every value sitting under a `format: "diversity"` schema node. The engine
//! then renders those slots in [`SettingsPath`] order and [`splice`]s each result back
//! in as `{"componentHTML": markup}`.

use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

use crate::constants::{COMPONENT_HTML_KEY, DIVERSITY_FORMAT};

/// One step into a settings document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key
    Key(String),
    /// Array index
    Index(usize),
}

impl PartialOrd for PathSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Index(a), Self::Index(b)) => a.cmp(b),
            (Self::Key(a), Self::Key(b)) => a.cmp(b),
            (Self::Index(_), Self::Key(_)) => Ordering::Less,
            (Self::Key(_), Self::Index(_)) => Ordering::Greater,
        }
    }
}

/// A location in a settings document. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SettingsPath(Vec<PathSegment>);

impl SettingsPath {
    /// The root path.
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Whether this is the root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments from the root.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// This path extended by an object key.
    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    /// This path extended by an array index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// The part of this path below `prefix`, when it starts with it.
    pub fn strip_prefix(&self, prefix: &Self) -> Option<&[PathSegment]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }
}

/// Longest path first, then segment by segment.
impl Ord for SettingsPath {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.len().cmp(&self.0.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for SettingsPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SettingsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, "/{key}")?,
                PathSegment::Index(index) => write!(f, "/{index}")?,
            }
        }
        Ok(())
    }
}

/// A nested component reference found during the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Absolute path of the reference in the render's settings
    pub path: SettingsPath,
    /// The `{component, version, settings}` value
    pub reference: Value,
}

/// Whether `schema` marks its value as a nested component.
pub fn is_diversity(schema: &Value) -> bool {
    schema.get("format").and_then(Value::as_str) == Some(DIVERSITY_FORMAT)
}

/// Copy `settings`, collecting nested component slots into `slots`.
///
/// `path` is the absolute path of `settings`; `owner` names the component whose schema
/// is being walked and only appears in warnings. On a schema/settings mismatch inside
/// an object the object is returned unexpanded and no slot below it is kept.
pub fn collect_slots(
    schema: &Value,
    settings: &Value,
    path: &SettingsPath,
    owner: &str,
    slots: &mut Vec<Slot>,
) -> Value {
    match settings {
        Value::Object(map) => collect_object(schema, map, path, owner, slots),
        Value::Array(items) => collect_array(schema, items, path, owner, slots),
        scalar => scalar.clone(),
    }
}

fn collect_object(
    schema: &Value,
    settings: &Map<String, Value>,
    path: &SettingsPath,
    owner: &str,
    slots: &mut Vec<Slot>,
) -> Value {
    let properties = schema.get("properties").and_then(Value::as_object);
    let additional = schema.get("additionalProperties").filter(|s| s.is_object());

    let mut found = Vec::new();
    let mut copy = Map::with_capacity(settings.len());
    for (key, value) in settings {
        let sub_path = path.key(key);
        let Some(sub_schema) = properties.and_then(|p| p.get(key)).or(additional) else {
            warn!("Could not add setting '{}' to {} at {}: no schema for it", key, owner, path);
            return Value::Object(settings.clone());
        };

        if is_diversity(sub_schema) {
            found.push(Slot {
                path: sub_path,
                reference: value.clone(),
            });
            copy.insert(key.clone(), value.clone());
        } else {
            copy.insert(key.clone(), collect_slots(sub_schema, value, &sub_path, owner, &mut found));
        }
    }

    slots.extend(found);
    Value::Object(copy)
}

fn collect_array(
    schema: &Value,
    items: &[Value],
    path: &SettingsPath,
    owner: &str,
    slots: &mut Vec<Slot>,
) -> Value {
    let Some(item_schema) = schema.get("items").filter(|s| s.is_object()) else {
        return Value::Array(items.to_vec());
    };

    let nested = is_diversity(item_schema);
    let mut copy = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let sub_path = path.index(index);
        if nested {
            if item.is_object() {
                slots.push(Slot {
                    path: sub_path,
                    reference: item.clone(),
                });
            } else {
                warn!("Keeping non-object entry at {} of {} unexpanded", sub_path, owner);
            }
            copy.push(item.clone());
        } else {
            copy.push(collect_slots(item_schema, item, &sub_path, owner, slots));
        }
    }
    Value::Array(copy)
}

/// Replace the value at `relative` (a path below `settings`) with a `componentHTML`
/// marker. Returns `false` when the path does not exist.
pub fn splice(settings: &mut Value, relative: &[PathSegment], markup: String) -> bool {
    let mut current = settings;
    for segment in relative {
        let next = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return false,
        }
    }
    *current = json!({ COMPONENT_HTML_KEY: markup });
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "sub": { "type": "object", "format": "diversity" },
                "list": { "type": "array", "items": { "type": "object", "format": "diversity" } },
                "nested": {
                    "type": "object",
                    "additionalProperties": { "type": "object", "format": "diversity" }
                }
            }
        })
    }

    #[test]
    fn test_collects_slots_at_every_depth() {
        let settings = json!({
            "title": "Hello",
            "sub": { "component": "child", "settings": { "title": "X" } },
            "list": [{ "component": "a" }, { "component": "b" }],
            "nested": { "left": { "component": "c" } }
        });
        let mut slots = Vec::new();
        let copy = collect_slots(&parent_schema(), &settings, &SettingsPath::root(), "parent", &mut slots);

        assert_eq!(copy, settings);
        let paths: Vec<String> = slots.iter().map(|s| s.path.to_string()).collect();
        assert_eq!(paths, vec!["/sub", "/list/0", "/list/1", "/nested/left"]);
        assert_eq!(slots[0].reference["component"], "child");
    }

    #[test]
    fn test_mismatch_returns_unexpanded_object() {
        let settings = json!({
            "sub": { "component": "child" },
            "unknown": 1
        });
        let mut slots = Vec::new();
        let copy = collect_slots(&parent_schema(), &settings, &SettingsPath::root(), "parent", &mut slots);

        assert_eq!(copy, settings);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_mismatch_only_discards_its_own_object() {
        let schema = json!({
            "properties": {
                "sub": { "format": "diversity" },
                "box": { "properties": { "inner": { "format": "diversity" } } }
            }
        });
        let settings = json!({
            "sub": { "component": "child" },
            "box": { "inner": { "component": "x" }, "stray": true }
        });
        let mut slots = Vec::new();
        collect_slots(&schema, &settings, &SettingsPath::root(), "parent", &mut slots);
        let paths: Vec<String> = slots.iter().map(|s| s.path.to_string()).collect();
        assert_eq!(paths, vec!["/sub"]);
    }

    #[test]
    fn test_array_edge_cases() {
        let settings = json!({ "list": ["not an object", { "component": "a" }] });
        let mut slots = Vec::new();
        let copy = collect_slots(&parent_schema(), &settings, &SettingsPath::root(), "parent", &mut slots);
        assert_eq!(copy, settings);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].path.to_string(), "/list/1");

        let no_items = json!({ "properties": { "list": { "type": "array" } } });
        let mut slots = Vec::new();
        let settings = json!({ "list": [{ "component": "a" }] });
        assert_eq!(collect_slots(&no_items, &settings, &SettingsPath::root(), "p", &mut slots), settings);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_scalars_pass_through() {
        let mut slots = Vec::new();
        assert_eq!(collect_slots(&json!({}), &json!(5), &SettingsPath::root(), "p", &mut slots), json!(5));
        assert_eq!(collect_slots(&json!({}), &Value::Null, &SettingsPath::root(), "p", &mut slots), Value::Null);
    }

    #[test]
    fn test_path_order_longest_first_then_segments() {
        let root = SettingsPath::root();
        let mut paths = vec![
            root.key("b"),
            root.key("list").index(10),
            root.key("a"),
            root.key("list").index(2),
            root.key("x").key("y").key("z"),
        ];
        paths.sort();
        let shown: Vec<String> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["/x/y/z", "/list/2", "/list/10", "/a", "/b"]);
    }

    #[test]
    fn test_splice() {
        let mut settings = json!({ "list": [{ "component": "a" }], "sub": { "component": "b" } });
        assert!(splice(&mut settings, &[PathSegment::Key("list".into()), PathSegment::Index(0)], "<a/>".into()));
        assert!(splice(&mut settings, &[PathSegment::Key("sub".into())], "<b/>".into()));
        assert!(!splice(&mut settings, &[PathSegment::Key("missing".into())], "x".into()));
        assert_eq!(
            settings,
            json!({ "list": [{ "componentHTML": "<a/>" }], "sub": { "componentHTML": "<b/>" } })
        );
    }
}
