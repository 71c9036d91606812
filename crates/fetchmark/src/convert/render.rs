//! DOM tree walk emitting Markdown
//!
//! Dispatch is keyed by element tag. A small set of tags (`pre`, `table`)
//! has override rules consulted before the generic per-tag rules, mirroring
//! how those structures need whole-subtree treatment rather than child
//! concatenation.

use super::{CodeBlockStyle, ConvertOptions, HeadingStyle};
use ego_tree::NodeRef;
use scraper::{Html, Node};
use thiserror::Error;

/// Nesting bound for the recursive walk
const MAX_DEPTH: usize = 512;

/// Reasons the tree walk cannot complete
///
/// Recovered by the caller with a fallback string; never propagated.
#[derive(Debug, Error)]
pub(crate) enum ConvertError {
    #[error("markup nesting exceeds supported depth")]
    NestingTooDeep,
}

/// Render a preprocessed document to Markdown
pub(crate) fn render_document(dom: &Html, options: &ConvertOptions) -> Result<String, ConvertError> {
    Renderer { options }.render_children(dom.tree.root(), 0)
}

struct Renderer<'a> {
    options: &'a ConvertOptions,
}

impl Renderer<'_> {
    fn render_children(
        &self,
        node: NodeRef<'_, Node>,
        depth: usize,
    ) -> Result<String, ConvertError> {
        let mut out = String::new();
        for child in node.children() {
            out.push_str(&self.render_node(child, depth)?);
        }
        Ok(out)
    }

    fn render_node(&self, node: NodeRef<'_, Node>, depth: usize) -> Result<String, ConvertError> {
        if depth > MAX_DEPTH {
            return Err(ConvertError::NestingTooDeep);
        }
        match node.value() {
            Node::Text(text) => Ok(collapse_whitespace(text)),
            Node::Element(el) => {
                let tag = el.name().to_string();
                self.render_element(node, &tag, depth)
            }
            // Comments, doctypes, processing instructions
            _ => Ok(String::new()),
        }
    }

    fn render_element(
        &self,
        node: NodeRef<'_, Node>,
        tag: &str,
        depth: usize,
    ) -> Result<String, ConvertError> {
        // Override rules come before the generic dispatch
        match tag {
            "pre" => return Ok(self.render_code_block(node)),
            "table" => return self.render_table(node, depth),
            _ => {}
        }

        let next = depth + 1;
        match tag {
            "head" | "script" | "style" | "noscript" | "iframe" | "template" => {
                Ok(String::new())
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = (tag.as_bytes()[1] - b'0') as usize;
                let text = self.render_children(node, next)?.trim().to_string();
                Ok(self.render_heading(level, &text))
            }
            "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "aside"
            | "nav" | "figure" | "figcaption" | "details" | "summary" => {
                let body = self.render_children(node, next)?;
                let body = body.trim();
                if body.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("\n\n{body}\n\n"))
                }
            }
            "br" => Ok("\n".to_string()),
            "hr" => Ok(format!("\n\n{}\n\n", self.options.hr)),
            "ul" => self.render_list(node, next, false),
            "ol" => self.render_list(node, next, true),
            "li" => {
                // Stray item outside a list container
                let body = self.render_children(node, next)?;
                Ok(format!(
                    "\n{} {}\n",
                    self.options.bullet_list_marker,
                    body.trim()
                ))
            }
            "strong" | "b" => self.render_delimited(node, next, &self.options.strong_delimiter),
            "em" | "i" => self.render_delimited(node, next, &self.options.em_delimiter),
            "code" => {
                let body = self.render_children(node, next)?;
                let body = body.trim();
                if body.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("`{body}`"))
                }
            }
            "a" => {
                let body = self.render_children(node, next)?;
                let text = body.trim();
                match element_attr(node, "href") {
                    Some(href) if !href.is_empty() => Ok(format!("[{text}]({href})")),
                    _ => Ok(text.to_string()),
                }
            }
            "blockquote" => {
                let body = self.render_children(node, next)?;
                let quoted = body
                    .trim()
                    .lines()
                    .map(|line| format!("> {line}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                if quoted.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("\n\n{quoted}\n\n"))
                }
            }
            // Unknown and purely-inline elements are transparent
            _ => self.render_children(node, next),
        }
    }

    fn render_heading(&self, level: usize, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        match self.options.heading_style {
            HeadingStyle::Setext if level == 1 => {
                format!("\n\n{text}\n{}\n\n", "=".repeat(underline_width(text)))
            }
            HeadingStyle::Setext if level == 2 => {
                format!("\n\n{text}\n{}\n\n", "-".repeat(underline_width(text)))
            }
            _ => format!("\n\n{} {text}\n\n", "#".repeat(level)),
        }
    }

    fn render_delimited(
        &self,
        node: NodeRef<'_, Node>,
        depth: usize,
        delimiter: &str,
    ) -> Result<String, ConvertError> {
        let body = self.render_children(node, depth)?;
        let body = body.trim();
        if body.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("{delimiter}{body}{delimiter}"))
        }
    }

    fn render_list(
        &self,
        node: NodeRef<'_, Node>,
        depth: usize,
        ordered: bool,
    ) -> Result<String, ConvertError> {
        let mut items = Vec::new();
        for child in node.children() {
            if element_name(child) == Some("li") {
                items.push(self.render_children(child, depth)?);
            }
        }

        let mut out = String::from("\n\n");
        for (index, item) in items.iter().enumerate() {
            let marker = if ordered {
                format!("{}.", index + 1)
            } else {
                self.options.bullet_list_marker.clone()
            };
            let item = item.trim();
            let mut lines = item.lines();
            match lines.next() {
                Some(first) => {
                    out.push_str(&format!("{marker} {first}\n"));
                    // Continuation lines (nested lists) are indented under the marker
                    for rest in lines {
                        if rest.is_empty() {
                            out.push('\n');
                        } else {
                            out.push_str(&format!("  {rest}\n"));
                        }
                    }
                }
                None => out.push_str(&format!("{marker}\n")),
            }
        }
        out.push('\n');
        Ok(out)
    }

    /// Override rule: code blocks
    ///
    /// Language comes from a `language-xxx` class token on the code element;
    /// content is the raw subtree text, exempt from whitespace collapsing.
    fn render_code_block(&self, node: NodeRef<'_, Node>) -> String {
        let code_el = find_descendant_element(node, "code");
        let language = code_el
            .and_then(|code| element_attr(code, "class"))
            .and_then(|class| extract_language(&class))
            .unwrap_or_default();

        let content = raw_text(code_el.unwrap_or(node));
        let content = content.trim();

        match self.options.code_block_style {
            CodeBlockStyle::Fenced => {
                let fence = &self.options.fence;
                format!("\n\n{fence}{language}\n{content}\n{fence}\n\n")
            }
            CodeBlockStyle::Indented => {
                let indented = content
                    .lines()
                    .map(|line| format!("    {line}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("\n\n{indented}\n\n")
            }
        }
    }

    /// Override rule: tables
    ///
    /// Header texts from `thead tr th`, one `:---:` alignment token per
    /// header, body rows from `tbody tr td` in document order. Cell text is
    /// trimmed; embedded pipe characters are left unescaped.
    fn render_table(
        &self,
        node: NodeRef<'_, Node>,
        depth: usize,
    ) -> Result<String, ConvertError> {
        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();

        for section in node.children() {
            match element_name(section) {
                Some("thead") => {
                    for row in section.children() {
                        if element_name(row) == Some("tr") && headers.is_empty() {
                            headers = self.render_cells(row, depth, "th")?;
                            if headers.is_empty() {
                                headers = self.render_cells(row, depth, "td")?;
                            }
                        }
                    }
                }
                Some("tbody") | Some("tfoot") => {
                    for row in section.children() {
                        if element_name(row) != Some("tr") {
                            continue;
                        }
                        // A leading th-only row stands in for a missing thead
                        if headers.is_empty() && rows.is_empty() {
                            let th_cells = self.render_cells(row, depth, "th")?;
                            if !th_cells.is_empty() {
                                headers = th_cells;
                                continue;
                            }
                        }
                        rows.push(self.render_cells(row, depth, "td")?);
                    }
                }
                Some("tr") => rows.push(self.render_cells(section, depth, "td")?),
                _ => {}
            }
        }

        if headers.is_empty() && rows.is_empty() {
            return Ok(String::new());
        }
        if headers.is_empty() {
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            headers = vec![String::new(); width];
        }

        let alignments = vec![":---:".to_string(); headers.len()];
        let mut lines = vec![pipe_row(&headers), pipe_row(&alignments)];
        for row in &rows {
            lines.push(pipe_row(row));
        }
        Ok(format!("\n\n{}\n\n", lines.join("\n")))
    }

    fn render_cells(
        &self,
        row: NodeRef<'_, Node>,
        depth: usize,
        cell_tag: &str,
    ) -> Result<Vec<String>, ConvertError> {
        let mut cells = Vec::new();
        for cell in row.children() {
            if element_name(cell) == Some(cell_tag) {
                let body = self.render_children(cell, depth + 1)?;
                cells.push(body.replace('\n', " ").trim().to_string());
            }
        }
        Ok(cells)
    }
}

fn pipe_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

fn underline_width(text: &str) -> usize {
    text.chars().count().max(3)
}

fn element_name<'a>(node: NodeRef<'a, Node>) -> Option<&'a str> {
    match node.value() {
        Node::Element(el) => Some(el.name()),
        _ => None,
    }
}

fn element_attr(node: NodeRef<'_, Node>, attr: &str) -> Option<String> {
    match node.value() {
        Node::Element(el) => el.attr(attr).map(str::to_string),
        _ => None,
    }
}

fn find_descendant_element<'a>(
    node: NodeRef<'a, Node>,
    tag: &str,
) -> Option<NodeRef<'a, Node>> {
    node.descendants()
        .find(|descendant| element_name(*descendant) == Some(tag))
}

/// Concatenated text of a subtree, verbatim
fn raw_text(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    for descendant in node.descendants() {
        if let Node::Text(text) = descendant.value() {
            out.push_str(text);
        }
    }
    out
}

/// Language from a `language-xxx` class token, if any
fn extract_language(class: &str) -> Option<String> {
    class
        .split_whitespace()
        .find_map(|token| token.strip_prefix("language-"))
        .map(str::to_string)
}

/// Collapse whitespace runs in flow text to a single space
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}
