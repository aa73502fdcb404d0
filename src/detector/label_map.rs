//! Label map reading
//!
//! Label maps are protobuf text files with one `item` per class:
//!
//! ```text
//! item {
//!   id: 1
//!   name: 'cat'
//! }
//! ```

use crate::error::{TpodError, TpodResult};
use crate::pbtxt;
use std::collections::BTreeSet;
use std::path::Path;

/// Read the distinct label names from a label map file, in first-seen order
pub fn read_label_names(path: &Path) -> TpodResult<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TpodError::label_map(path, format!("cannot read file: {}", e)))?;

    let doc = pbtxt::parse(&content).map_err(|e| TpodError::label_map(path, e.to_string()))?;

    let mut seen = BTreeSet::new();
    let mut names = vec![];
    for item in doc.all("item") {
        let item = item
            .as_message()
            .ok_or_else(|| TpodError::label_map(path, "item is not a message"))?;
        let name = item
            .scalar("name")
            .ok_or_else(|| TpodError::label_map(path, "item has no name"))?;
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }

    if names.is_empty() {
        return Err(TpodError::label_map(path, "no labels found"));
    }

    Ok(names)
}

/// Number of distinct classes declared in a label map
pub fn count_labels(path: &Path) -> TpodResult<usize> {
    read_label_names(path).map(|names| names.len())
}

/// Render a label map for the given class names (ids start at 1)
pub fn render_label_map(names: &[&str]) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            format!(
                "item {{\n  id: {}\n  name: '{}'\n}}\n",
                i + 1,
                name.replace('\\', "\\\\").replace('\'', "\\'")
            )
        })
        .collect()
}
