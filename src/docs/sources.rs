//! Auxiliary documentation sources.
//!
//! Patterns in [`DocsConfig::sources`](super::DocsConfig) are expanded with `glob`.
//! YAML and JSON files are read as OpenAPI fragments; any other file is scanned for
//! comment blocks that start with an `@openapi` line, and the block body is parsed as
//! YAML. Both forms may contribute `paths` and `components`. Generated operations
//! take precedence over fragment operations at the same path and method.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

const OPENAPI_TAG: &str = "@openapi";
const MERGED_SECTIONS: [&str; 2] = ["paths", "components"];

/// Expand every pattern and merge each matching file into `doc`.
pub fn merge_sources(doc: &mut Value, patterns: &[String]) {
    for path in expand(patterns) {
        match load_fragments(&path) {
            Ok(fragments) => {
                debug!(source = %path.display(), fragments = fragments.len(), "Doc source loaded");
                for fragment in fragments {
                    merge_fragment(doc, fragment);
                }
            }
            Err(e) => warn!(source = %path.display(), error = %e, "Skipping doc source"),
        }
    }
}

fn expand(patterns: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = match glob::glob(pattern) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid doc source pattern");
                continue;
            }
        };
        for entry in matches {
            match entry {
                Ok(path) if path.is_file() => {
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(pattern = %pattern, error = %e, "Unreadable doc source"),
            }
        }
    }
    paths
}

fn is_fragment_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

/// Fragments contributed by one file.
pub fn load_fragments(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = fs::read_to_string(path)?;
    if is_fragment_file(path) {
        // serde_yaml accepts JSON as well
        let fragment: Value = serde_yaml::from_str(&text)?;
        return Ok(vec![fragment]);
    }

    let mut fragments = Vec::new();
    for block in comment_blocks(&text) {
        match serde_yaml::from_str::<Value>(&block) {
            Ok(fragment) => fragments.push(fragment),
            Err(e) => warn!(source = %path.display(), error = %e, "Invalid @openapi block"),
        }
    }
    Ok(fragments)
}

fn strip_comment_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    ["///", "//!", "//", "*", "#"]
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
}

/// Bodies of the `@openapi` blocks in `text`.
///
/// A block runs from the tag line to the first line that is no longer a comment,
/// with the comment markers removed.
fn comment_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines() {
        let body = strip_comment_marker(line);
        if let Some(lines) = current.as_mut() {
            match body {
                Some(body) => lines.push(body),
                None => {
                    blocks.push(lines.join("\n"));
                    current = None;
                }
            }
        } else if body.is_some_and(|b| b.trim() == OPENAPI_TAG) {
            current = Some(Vec::new());
        }
    }
    if let Some(lines) = current {
        blocks.push(lines.join("\n"));
    }
    blocks.retain(|b| !b.trim().is_empty());
    blocks
}

fn merge_fragment(doc: &mut Value, fragment: Value) {
    let Value::Object(fragment) = fragment else {
        return;
    };
    let Some(root) = doc.as_object_mut() else {
        return;
    };
    for (section, value) in fragment {
        if !MERGED_SECTIONS.contains(&section.as_str()) {
            continue;
        }
        let Value::Object(incoming) = value else {
            continue;
        };
        let target = root
            .entry(section)
            .or_insert_with(|| Value::Object(Map::new()));
        merge_missing(target, incoming, 1);
    }
}

/// Insert keys of `incoming` absent from `target`, recursing `depth` levels into
/// objects present on both sides.
fn merge_missing(target: &mut Value, incoming: Map<String, Value>, depth: usize) {
    let Value::Object(target) = target else {
        return;
    };
    for (key, value) in incoming {
        match target.get_mut(&key) {
            None => {
                target.insert(key, value);
            }
            Some(existing) if depth > 0 => {
                if let Value::Object(inner) = value {
                    merge_missing(existing, inner, depth - 1);
                }
            }
            Some(_) => {}
        }
    }
}
