//! HTML to Markdown conversion
//!
//! Conversion is a two-step tree transformation: the preprocessor strips
//! non-content nodes and rewrites images, then the renderer walks the DOM
//! emitting Markdown. Conversion always returns a string; when the walk
//! cannot complete, the caller receives a fallback containing the original
//! HTML fenced as a code block.

mod preprocess;
mod render;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Heading output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    /// `#`-prefixed headings
    Atx,
    /// Underlined headings for levels 1 and 2, ATX below that
    Setext,
}

/// Code block output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CodeBlockStyle {
    /// Fence-delimited blocks with a language tag
    Fenced,
    /// Four-space indented blocks
    Indented,
}

/// Options controlling Markdown emission
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConvertOptions {
    /// Heading style
    pub heading_style: HeadingStyle,
    /// Horizontal rule marker
    pub hr: String,
    /// Unordered list marker
    pub bullet_list_marker: String,
    /// Code block style
    pub code_block_style: CodeBlockStyle,
    /// Fence marker for fenced code blocks
    pub fence: String,
    /// Emphasis delimiter
    pub em_delimiter: String,
    /// Strong-emphasis delimiter
    pub strong_delimiter: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            hr: "---".to_string(),
            bullet_list_marker: "-".to_string(),
            code_block_style: CodeBlockStyle::Fenced,
            fence: "```".to_string(),
            em_delimiter: "_".to_string(),
            strong_delimiter: "**".to_string(),
        }
    }
}

/// Convert an HTML document to Markdown
///
/// Never raises: malformed markup is absorbed by the HTML parser, and a tree
/// walk that cannot complete produces the fallback string instead.
pub fn convert_to_markdown(html: &str, options: &ConvertOptions) -> String {
    let dom = preprocess::preprocess(html);
    match render::render_document(&dom, options) {
        Ok(markdown) => tidy_markdown(&markdown),
        Err(err) => {
            warn!(%err, "markdown conversion failed, returning fallback");
            conversion_fallback(html)
        }
    }
}

/// Error marker plus the original HTML fenced as a code block
fn conversion_fallback(html: &str) -> String {
    format!("[Conversion Error] Unable to convert content\n\nOriginal HTML:\n```html\n{html}\n```")
}

/// Strip trailing spaces per line and cap blank runs at one line
fn tidy_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;
    for line in markdown.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run >= 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_matches('\n').to_string()
}
