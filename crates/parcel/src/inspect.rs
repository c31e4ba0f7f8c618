//! Untyped document inspection.
//!
//! These helpers work on raw documents without knowing the Rust types that
//! wrote them, which is what command-line tooling needs: show a document,
//! list the documents it references, find references that lead nowhere.

use std::collections::{BTreeSet, VecDeque};

use parcel_fs::Layers;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{ParcelError, Result};
use crate::path::{has_extension, normalize_path};

/// A parsed document envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub type_name: String,
    pub parent: String,
    pub obj: Value,
}

impl Document {
    /// Parse `bytes` as a document, checking the envelope shape.
    pub fn parse(path: &str, bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: String| ParcelError::MalformedDocument {
            path: path.to_string(),
            reason,
        };
        let value: Value = serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(malformed("document is not an object".into()));
        };
        let type_name = text_field(&mut fields, "Type").map_err(&malformed)?;
        let parent = text_field(&mut fields, "Parent").map_err(&malformed)?;
        let obj = fields
            .remove("Obj")
            .ok_or_else(|| malformed("missing field `Obj`".into()))?;
        Ok(Self {
            type_name,
            parent,
            obj,
        })
    }

    /// Every document path referenced from `Obj`, sorted and deduplicated.
    pub fn references(&self) -> Vec<String> {
        let mut found = BTreeSet::new();
        collect_references(&self.obj, &mut found);
        found.into_iter().collect()
    }
}

// A missing Type or Parent reads as empty text.
fn text_field(fields: &mut Map<String, Value>, key: &str) -> std::result::Result<String, String> {
    match fields.remove(key) {
        None => Ok(String::new()),
        Some(Value::String(text)) => Ok(text),
        Some(other) => Err(format!("field `{key}` must be text, found {other}")),
    }
}

fn collect_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::String(text) if has_extension(text) => {
            found.insert(text.clone());
        }
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_references(v, found)),
        _ => {}
    }
}

/// References found while walking from one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceReport {
    /// The root document's path, normalized.
    pub root: String,
    /// Every document reached, the root included, sorted.
    pub reachable: Vec<String>,
    /// Referenced paths no layer holds, sorted.
    pub dangling: Vec<String>,
}

impl ReferenceReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
    }
}

/// Follow references from `root` through `layers`, breadth first.
///
/// Fails if the root itself is missing or any reached document is
/// malformed. Missing referenced documents are reported, not raised.
pub fn walk_references(layers: &Layers, root: &str) -> Result<ReferenceReport> {
    let root = normalize_path(root);
    let mut reachable = BTreeSet::new();
    let mut dangling = BTreeSet::new();
    let mut queue = VecDeque::from([root.clone()]);

    while let Some(path) = queue.pop_front() {
        if reachable.contains(&path) || dangling.contains(&path) {
            continue;
        }
        let Some(bytes) = layers.read(&path)? else {
            if path == root {
                return Err(ParcelError::NotFound { path });
            }
            trace!(path = %path, "dangling reference");
            dangling.insert(path);
            continue;
        };
        let doc = Document::parse(&path, &bytes)?;
        queue.extend(doc.references());
        reachable.insert(path);
    }

    Ok(ReferenceReport {
        root,
        reachable: reachable.into_iter().collect(),
        dangling: dangling.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use parcel_fs::MemoryStore;
    use serde_json::json;

    use super::*;

    fn doc(obj: Value) -> String {
        json!({ "Type": "t", "Parent": "", "Obj": obj }).to_string()
    }

    #[test]
    fn parse_reads_envelope() {
        let parsed = Document::parse("a.parcel", doc(json!({"x": 1})).as_bytes()).unwrap();
        assert_eq!(parsed.type_name, "t");
        assert_eq!(parsed.parent, "");
        assert_eq!(parsed.obj, json!({"x": 1}));
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        for bad in [
            "[]",
            "nope",
            r#"{"Type":"t","Parent":""}"#,
            r#"{"Type":3,"Parent":"","Obj":{}}"#,
        ] {
            assert!(
                matches!(
                    Document::parse("bad.parcel", bad.as_bytes()),
                    Err(ParcelError::MalformedDocument { .. })
                ),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn references_are_nested_path_strings() {
        let parsed = Document::parse(
            "a.parcel",
            doc(json!({
                "name": "plain text",
                "other": "b.parcel",
                "list": ["c.parcel", {"deep": "d.parcel"}, "b.parcel"],
            }))
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(parsed.references(), vec!["b.parcel", "c.parcel", "d.parcel"]);
    }

    #[test]
    fn walk_reports_dangling() {
        let store = MemoryStore::new();
        store.insert("a.parcel", doc(json!({"next": "b.parcel"}))).unwrap();
        store
            .insert("b.parcel", doc(json!({"next": "a.parcel", "gone": "x.parcel"})))
            .unwrap();
        let mut layers = Layers::new();
        layers.push(store, 0);

        let report = walk_references(&layers, "a").unwrap();
        assert_eq!(report.root, "a.parcel");
        assert_eq!(report.reachable, vec!["a.parcel", "b.parcel"]);
        assert_eq!(report.dangling, vec!["x.parcel"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn walk_missing_root_is_not_found() {
        let layers = Layers::new();
        assert!(matches!(
            walk_references(&layers, "nothing"),
            Err(ParcelError::NotFound { .. })
        ));
    }
}
