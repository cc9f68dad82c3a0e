//! Tabulation: flattening a report's field tree into ordered key-value rows.

use serde::{Deserialize, Serialize};

/// A node of a tabulated report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldNode {
    /// A named value. `None` means the field was not populated.
    Leaf { name: String, value: Option<String> },
    /// A named group of child fields.
    Group { name: String, children: Vec<Self> },
}

impl FieldNode {
    #[must_use]
    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Leaf {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self::Leaf {
            name: name.into(),
            value: None,
        }
    }

    #[must_use]
    pub fn group(name: impl Into<String>, children: Vec<Self>) -> Self {
        Self::Group {
            name: name.into(),
            children,
        }
    }
}

/// One flattened row of the key-value projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub name: String,
    pub value: String,
}

/// Path separator between group and field names.
pub const PATH_SEPARATOR: &str = " -> ";

/// Flatten field nodes in traversal order, dropping null and empty values.
#[must_use]
pub fn flatten(nodes: &[FieldNode]) -> Vec<KeyValue> {
    let mut rows = Vec::new();
    for node in nodes {
        flatten_into(node, "", &mut rows);
    }
    rows
}

fn flatten_into(node: &FieldNode, prefix: &str, rows: &mut Vec<KeyValue>) {
    match node {
        FieldNode::Leaf { name, value } => match value.as_deref() {
            None | Some("") => {}
            Some(value) => rows.push(KeyValue {
                name: join_path(prefix, name),
                value: value.to_string(),
            }),
        },
        FieldNode::Group { name, children } => {
            let path = join_path(prefix, name);
            for child in children {
                flatten_into(child, &path, rows);
            }
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{name}")
    }
}

/// Render rows as the pretty JSON stored in key-value baseline files.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_key_values(rows: &[KeyValue]) -> serde_json::Result<String> {
    let mut rendered = serde_json::to_string_pretty(rows)?;
    rendered.push('\n');
    Ok(rendered)
}
