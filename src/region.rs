//! The region block: the machine-written part of an index file.
//!
//! ```markdown
//! ---
//! <span class="moc-plugin-start">MOC Links:</span>
//! #### Parent:
//! - [[Projects/Projects]]
//! #### Children:
//! - [[Projects/A/A]]
//! #### Files:
//! - *None*
//! <span class="moc-plugin-end"> </span>
//! ---
//! ```
//!
//! The two span tokens are the compatibility contract for blocks already written to disk; the
//! horizontal rules around them are optional when locating a block. A document holds at most
//! one block: [`update`] removes the previous block (and the blank lines around it) before
//! appending a fresh one, which makes it idempotent.
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::{
    config::LinkFormat,
    paths::{self, parent_path, relative_path},
    resolver::LinkGraph,
    tree::Document,
};

pub const START_TOKEN: &str = "<span class=\"moc-plugin-start\">";
pub const END_TOKEN: &str = "<span class=\"moc-plugin-end\">";
pub const NONE_MARKER: &str = "*None*";
pub const PARENT_HEADING: &str = "#### Parent:";
pub const CHILDREN_HEADING: &str = "#### Children:";
pub const FILES_HEADING: &str = "#### Files:";
/// Blank lines left above a manually inserted block.
pub const DEFAULT_LEADING_BLANK_LINES: usize = 10;

static REGION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)(?:^---[ \t]*\r?\n(?:[ \t]*\r?\n)*)?",
        r#"<span class="moc-plugin-start">[\s\S]*?<span class="moc-plugin-end">[^<]*</span>"#,
        r"(?:[ \t]*\r?\n(?:[ \t]*\r?\n)*---[ \t]*(?:\r?\n|\z))?",
    ))
    .expect("region pattern is valid")
});

/// Renders references to documents from the point of view of `source`.
#[derive(Debug, Clone, Copy)]
pub struct LinkRenderer<'s> {
    pub format: LinkFormat,
    pub source: &'s str,
}

impl<'s> LinkRenderer<'s> {
    pub fn new(format: LinkFormat, source: &'s str) -> Self {
        LinkRenderer { format, source }
    }

    pub fn render(&self, target: &Document) -> String {
        match self.format {
            LinkFormat::Wiki => {
                let path = match paths::extension(&target.path) {
                    Some("md") => target.path.strip_suffix(".md").unwrap_or(&target.path),
                    _ => target.path.as_str(),
                };
                format!("[[{path}]]")
            }
            LinkFormat::Markdown => {
                let from = parent_path(self.source).unwrap_or("");
                let href = relative_path(&target.path, from).replace(' ', "%20");
                format!("[{}]({})", target.stem(), href)
            }
        }
    }
}

fn render_list(docs: Option<&Vec<&Document>>, links: &LinkRenderer<'_>) -> String {
    match docs {
        Some(docs) if !docs.is_empty() => docs
            .iter()
            .map(|doc| format!("- {}", links.render(doc)))
            .collect::<Vec<String>>()
            .join("\n"),
        _ => format!("- {NONE_MARKER}"),
    }
}

/// Render `graph` as a complete region block, ending with a newline.
pub fn encode(graph: &LinkGraph<'_>, header: &str, links: &LinkRenderer<'_>) -> String {
    let parent = graph
        .parent
        .map(|doc| links.render(doc))
        .unwrap_or_else(|| NONE_MARKER.to_string());
    format!(
        "---\n{START_TOKEN}{header}</span>\n{PARENT_HEADING}\n- {parent}\n{CHILDREN_HEADING}\n{}\n{FILES_HEADING}\n{}\n{END_TOKEN} </span>\n---\n",
        render_list(graph.children.as_ref(), links),
        render_list(graph.files.as_ref(), links),
    )
}

/// Byte span of the first region block in `text`, framing rules included.
pub fn locate(text: &str) -> Option<Range<usize>> {
    REGION_REGEX.find(text).map(|m| m.range())
}

/// Drop whole blank lines from the end of `s`, keeping the newline that terminates the last
/// non-blank line.
fn trim_trailing_blank_lines(s: &str) -> &str {
    let mut end = s.len();
    while let Some(without_nl) = s[..end].strip_suffix('\n') {
        let line_start = without_nl.rfind('\n').map_or(0, |idx| idx + 1);
        if without_nl[line_start..].trim().is_empty() {
            end = line_start;
        } else {
            break;
        }
    }
    if s[..end].trim().is_empty() {
        ""
    } else {
        &s[..end]
    }
}

fn trim_leading_blank_lines(s: &str) -> &str {
    let mut rest = s;
    loop {
        match rest.find('\n') {
            Some(idx) if rest[..idx].trim().is_empty() => rest = &rest[idx + 1..],
            Some(_) => return rest,
            None if rest.trim().is_empty() => return "",
            None => return rest,
        }
    }
}

/// Remove the first region block. With `collapse_blank_lines` the blank lines directly above
/// and below it go too.
pub fn strip(text: &str, collapse_blank_lines: bool) -> String {
    let Some(span) = locate(text) else {
        return text.to_string();
    };
    let before = &text[..span.start];
    let after = &text[span.end..];
    if !collapse_blank_lines {
        return format!("{before}{after}");
    }
    let before = trim_trailing_blank_lines(before);
    let after = trim_leading_blank_lines(after);
    if !before.is_empty() && !before.ends_with('\n') && !after.is_empty() {
        format!("{before}\n{after}")
    } else {
        format!("{before}{after}")
    }
}

/// Append a fresh block after `leading_blank_lines` blank lines. Existing text is first made
/// to end with exactly one newline.
pub fn inject(
    text: &str,
    graph: &LinkGraph<'_>,
    header: &str,
    links: &LinkRenderer<'_>,
    leading_blank_lines: usize,
) -> String {
    let body = trim_trailing_blank_lines(text);
    let mut out = String::with_capacity(body.len() + 256);
    out.push_str(body);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&"\n".repeat(leading_blank_lines));
    out.push_str(&encode(graph, header, links));
    out
}

/// Replace any existing block with a freshly encoded one at the end of the document.
pub fn update(
    text: &str,
    graph: &LinkGraph<'_>,
    header: &str,
    links: &LinkRenderer<'_>,
) -> String {
    inject(&strip(text, true), graph, header, links, 0)
}

/// References read back out of a written block, as rendered text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedRegion {
    pub header: String,
    pub parent: Option<String>,
    pub children: Option<Vec<String>>,
    pub files: Option<Vec<String>>,
}

#[derive(Clone, Copy)]
enum Section {
    Preamble,
    Parent,
    Children,
    Files,
}

/// Read the first block of `text` back into its references.
pub fn decode(text: &str) -> Option<DecodedRegion> {
    let block = &text[locate(text)?];
    let start = block.find(START_TOKEN)? + START_TOKEN.len();
    let header_end = block[start..].find("</span>")? + start;
    let mut decoded = DecodedRegion {
        header: block[start..header_end].to_string(),
        ..Default::default()
    };
    let mut section = Section::Preamble;
    for line in block[header_end..].lines().map(str::trim) {
        match line {
            PARENT_HEADING => section = Section::Parent,
            CHILDREN_HEADING => section = Section::Children,
            FILES_HEADING => section = Section::Files,
            _ => {
                let Some(item) = line.strip_prefix("- ") else {
                    continue;
                };
                if item == NONE_MARKER {
                    continue;
                }
                let item = item.to_string();
                match section {
                    Section::Preamble => {}
                    Section::Parent => decoded.parent = Some(item),
                    Section::Children => decoded.children.get_or_insert_with(Vec::new).push(item),
                    Section::Files => decoded.files.get_or_insert_with(Vec::new).push(item),
                }
            }
        }
    }
    Some(decoded)
}
