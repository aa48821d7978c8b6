//! Metadata blocks and the index-file marker predicate.
//!
//! A document's metadata block is the frontmatter fenced by `---` lines at the very top of
//! the text. Content is read as YAML first and TOML second; anything that does not parse into
//! a key-value table is treated as "no metadata".
use serde_json::Value;

use crate::{config::MocConfig, tree::Metadata};

const FENCE: &str = "---";

/// Byte range of the frontmatter body (between the fences) and the byte offset just past the
/// closing fence line.
pub fn frontmatter_bounds(text: &str) -> Option<(std::ops::Range<usize>, usize)> {
    let text_start = text.strip_prefix('\u{feff}').map_or(0, |_| '\u{feff}'.len_utf8());
    let mut lines = text[text_start..].split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != FENCE {
        return None;
    }
    let body_start = text_start + first.len();
    let mut offset = body_start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Some((body_start..offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

/// Parse the frontmatter of `text`. Never fails: a missing or malformed block yields `None`.
pub fn parse_frontmatter(text: &str) -> Option<Metadata> {
    let (body, _) = frontmatter_bounds(text)?;
    let body = &text[body];
    if body.trim().is_empty() {
        return Some(Metadata::new());
    }
    match serde_yaml::from_str::<Value>(body) {
        Ok(Value::Object(map)) => return Some(map),
        Ok(_) => {}
        Err(e) => tracing::trace!("Frontmatter is not YAML ({e}), trying TOML"),
    }
    match toml::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => {
            tracing::debug!("Ignoring malformed frontmatter block");
            None
        }
    }
}

/// Render a fresh frontmatter block carrying the marker pair.
pub fn marker_frontmatter(key: &str, value: &str) -> String {
    let mut map = Metadata::new();
    map.insert(key.to_string(), Value::String(value.to_string()));
    let yaml = serde_yaml::to_string(&Value::Object(map))
        .unwrap_or_else(|_| format!("{key}: {value}\n"));
    format!("{FENCE}\n{yaml}{FENCE}\n")
}

/// Decides whether a document is an index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPredicate {
    pub key: String,
    pub value: String,
}

impl MarkerPredicate {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        MarkerPredicate {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn from_config(config: &MocConfig) -> Self {
        MarkerPredicate::new(config.marker_key.clone(), config.marker_value.clone())
    }

    /// True iff the block exists, holds the key, and the key's value equals the configured
    /// value. Scalars are compared through their plain rendering so that `true` or `1`
    /// written unquoted still match; lists and tables never match.
    pub fn is_marked(&self, metadata: Option<&Metadata>) -> bool {
        let Some(value) = metadata.and_then(|map| map.get(&self.key)) else {
            return false;
        };
        match value {
            Value::String(s) => s == &self.value,
            Value::Bool(b) => b.to_string() == self.value,
            Value::Number(n) => n.to_string() == self.value,
            Value::Null | Value::Array(_) | Value::Object(_) => false,
        }
    }
}
