//! View-hierarchy documents: `{"activity": {"root": <node>}}`.

use crate::error::{AnnotateError, AnnotateResult};
use crate::geometry::BoundingBox;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Document {
    activity: Option<Activity>,
}

#[derive(Debug, Deserialize)]
struct Activity {
    root: Option<UiNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UiNode {
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
    #[serde(default, rename = "visible-to-user")]
    pub visible_to_user: Option<bool>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<UiNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeClass {
    Drawable(BoundingBox),
    /// Has bounds, but is not shown to the user (or the flags are absent).
    Hidden,
    Unbounded,
}

impl UiNode {
    pub fn classify(&self) -> NodeClass {
        let Some(bounds) = self.bounds else {
            return NodeClass::Unbounded;
        };
        let shown = self.visible_to_user == Some(true)
            && self.visibility.as_deref() == Some("visible");
        if shown {
            NodeClass::Drawable(bounds)
        } else {
            NodeClass::Hidden
        }
    }

    pub fn children(&self) -> &[UiNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Pre-order traversal (parent first, children in document order).
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }
}

// Deep hierarchies would overflow the stack with the derived recursive drop.
impl Drop for UiNode {
    fn drop(&mut self) {
        let mut pending = self.children.take().unwrap_or_default();
        while let Some(mut node) = pending.pop() {
            if let Some(children) = node.children.take() {
                pending.extend(children);
            }
        }
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a UiNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a UiNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Reads a hierarchy file and returns its `activity.root` node.
pub fn load_root(path: &Path) -> AnnotateResult<UiNode> {
    let raw = fs::read_to_string(path).map_err(|source| AnnotateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_root(&raw, path)
}

fn parse_root(raw: &str, path: &Path) -> AnnotateResult<UiNode> {
    let doc = parse_document(raw).map_err(|source| AnnotateError::MalformedDocument {
        path: path.to_path_buf(),
        source,
    })?;
    let activity = doc.activity.ok_or_else(|| AnnotateError::MissingKey {
        path: path.to_path_buf(),
        key: "activity",
    })?;
    activity.root.ok_or_else(|| AnnotateError::MissingKey {
        path: path.to_path_buf(),
        key: "root",
    })
}

/// Parses without serde_json's nesting limit; `serde_stacker` grows the
/// stack on demand while descending into `children`.
fn parse_document(raw: &str) -> serde_json::Result<Document> {
    let mut json = serde_json::Deserializer::from_str(raw);
    json.disable_recursion_limit();
    let doc = Document::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(doc)
}
