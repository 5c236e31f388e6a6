#![forbid(unsafe_code)]

//! Issue description documents.
//!
//! The editor emits a ProseMirror-style JSON tree. Only the node and mark
//! kinds the editor is configured with are accepted; anything else is
//! rejected at the boundary instead of being stored as an opaque blob.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Doc {
        #[serde(default)]
        content: Vec<Node>,
    },
    Paragraph {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
    },
    Heading {
        attrs: HeadingAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
    },
    Blockquote {
        #[serde(default)]
        content: Vec<Node>,
    },
    BulletList {
        #[serde(default)]
        content: Vec<Node>,
    },
    OrderedList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<OrderedListAttrs>,
        #[serde(default)]
        content: Vec<Node>,
    },
    ListItem {
        #[serde(default)]
        content: Vec<Node>,
    },
    TaskList {
        #[serde(default)]
        content: Vec<Node>,
    },
    TaskItem {
        #[serde(default)]
        attrs: TaskItemAttrs,
        #[serde(default)]
        content: Vec<Node>,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<CodeBlockAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
    },
    HorizontalRule,
    HardBreak,
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    pub level: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    #[serde(default = "first_item")]
    pub start: u32,
}

fn first_item() -> u32 {
    1
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskItemAttrs {
    #[serde(default)]
    pub checked: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeBlockAttrs {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    Link { attrs: LinkAttrs },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RichTextError {
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("document root must be a doc node")]
    RootNotDoc,
    #[error("doc nodes cannot be nested")]
    NestedDoc,
    #[error("text nodes must not be empty")]
    EmptyText,
    #[error("heading level must be 1..=3 (got {0})")]
    HeadingLevel(u8),
    #[error("document nests too deeply")]
    TooDeep,
}

/// A validated description document. The root is always a `doc` node.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RichDoc(Node);

impl RichDoc {
    pub fn from_value(value: Value) -> Result<Self, RichTextError> {
        let root: Node =
            serde_json::from_value(value).map_err(|err| RichTextError::Malformed(err.to_string()))?;
        let Node::Doc { content } = &root else {
            return Err(RichTextError::RootNotDoc);
        };
        for child in content {
            validate(child, 1)?;
        }
        Ok(Self(root))
    }

    /// Form payloads use `{}` (or `null`) for "no description".
    pub fn from_payload(value: &Value) -> Result<Option<Self>, RichTextError> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            other => Self::from_value(other.clone()).map(Some),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RichTextError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| RichTextError::Malformed(err.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json_string(&self) -> Result<String, RichTextError> {
        serde_json::to_string(&self.0).map_err(|err| RichTextError::Malformed(err.to_string()))
    }

    /// Single-paragraph document.
    pub fn paragraph(text: &str) -> Self {
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::Text {
                text: text.to_string(),
                marks: Vec::new(),
            }]
        };
        Self(Node::Doc {
            content: vec![Node::Paragraph { content }],
        })
    }

    pub fn root(&self) -> &Node {
        &self.0
    }

    /// Text content with one line per block, used for search.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.0, &mut out);
        out.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn children(node: &Node) -> &[Node] {
    match node {
        Node::Doc { content }
        | Node::Paragraph { content }
        | Node::Heading { content, .. }
        | Node::Blockquote { content }
        | Node::BulletList { content }
        | Node::OrderedList { content, .. }
        | Node::ListItem { content }
        | Node::TaskList { content }
        | Node::TaskItem { content, .. }
        | Node::CodeBlock { content, .. } => content,
        Node::HorizontalRule | Node::HardBreak | Node::Text { .. } => &[],
    }
}

fn validate(node: &Node, depth: usize) -> Result<(), RichTextError> {
    if depth > MAX_DEPTH {
        return Err(RichTextError::TooDeep);
    }
    match node {
        Node::Doc { .. } => return Err(RichTextError::NestedDoc),
        Node::Heading { attrs, .. } if !(1..=3).contains(&attrs.level) => {
            return Err(RichTextError::HeadingLevel(attrs.level));
        }
        Node::Text { text, .. } if text.is_empty() => return Err(RichTextError::EmptyText),
        _ => {}
    }
    for child in children(node) {
        validate(child, depth + 1)?;
    }
    Ok(())
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text { text, .. } => out.push_str(text),
        Node::HardBreak => out.push('\n'),
        Node::HorizontalRule => {}
        Node::Paragraph { content }
        | Node::Heading { content, .. }
        | Node::CodeBlock { content, .. } => {
            for child in content {
                collect_text(child, out);
            }
            out.push('\n');
        }
        other => {
            for child in children(other) {
                collect_text(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn editor_doc() -> Value {
        json!({
            "type": "doc",
            "content": [
                { "type": "heading", "attrs": { "level": 2 }, "content": [{ "type": "text", "text": "Steps" }] },
                { "type": "taskList", "content": [
                    { "type": "taskItem", "attrs": { "checked": true }, "content": [
                        { "type": "paragraph", "content": [{ "type": "text", "text": "Open login page" }] }
                    ]}
                ]},
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "See " },
                    { "type": "text", "text": "docs", "marks": [{ "type": "link", "attrs": { "href": "https://example.com", "target": "_blank", "rel": null } }] },
                    { "type": "hardBreak" },
                    { "type": "text", "text": "then retry", "marks": [{ "type": "bold" }] }
                ]},
                { "type": "horizontalRule" },
                { "type": "codeBlock", "attrs": { "language": null }, "content": [{ "type": "text", "text": "cargo run" }] }
            ]
        })
    }

    #[test]
    fn accepts_editor_output_and_extracts_text() {
        let doc = RichDoc::from_value(editor_doc()).unwrap();
        assert_eq!(
            doc.plain_text(),
            "Steps\nOpen login page\nSee docs\nthen retry\ncargo run"
        );
    }

    #[test]
    fn stored_json_reparses_to_the_same_document() {
        let doc = RichDoc::from_value(editor_doc()).unwrap();
        let raw = doc.to_json_string().unwrap();
        assert_eq!(RichDoc::from_json_str(&raw).unwrap(), doc);
    }

    #[test]
    fn empty_payloads_mean_no_description() {
        assert_eq!(RichDoc::from_payload(&json!({})).unwrap(), None);
        assert_eq!(RichDoc::from_payload(&Value::Null).unwrap(), None);
        assert!(RichDoc::from_payload(&json!({ "type": "doc" })).unwrap().is_some());
    }

    #[test]
    fn rejects_shapes_outside_the_editor_schema() {
        assert!(matches!(
            RichDoc::from_value(json!({ "type": "paragraph" })),
            Err(RichTextError::RootNotDoc)
        ));
        assert!(matches!(
            RichDoc::from_value(json!({ "type": "doc", "content": [{ "type": "table" }] })),
            Err(RichTextError::Malformed(_))
        ));
        assert_eq!(
            RichDoc::from_value(json!({ "type": "doc", "content": [{ "type": "doc" }] })),
            Err(RichTextError::NestedDoc)
        );
        assert_eq!(
            RichDoc::from_value(json!({
                "type": "doc",
                "content": [{ "type": "heading", "attrs": { "level": 5 } }]
            })),
            Err(RichTextError::HeadingLevel(5))
        );
        assert_eq!(
            RichDoc::from_value(json!({
                "type": "doc",
                "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "" }] }]
            })),
            Err(RichTextError::EmptyText)
        );
    }

    #[test]
    fn paragraph_helper_builds_a_valid_doc() {
        let doc = RichDoc::paragraph("login fails on Safari");
        assert_eq!(doc.plain_text(), "login fails on Safari");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], "doc");
        assert_eq!(RichDoc::from_value(value).unwrap(), doc);
    }
}
