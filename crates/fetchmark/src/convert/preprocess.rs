//! HTML preprocessing ahead of the Markdown walk
//!
//! Applied once, in order: drop `<script>`/`<style>` subtrees, strip
//! presentational `class`/`id` attributes, and rewrite `<img>` elements into
//! inline Markdown image tokens so the renderer only ever sees text.

use ego_tree::NodeId;
use scraper::node::Text;
use scraper::{Html, Node};

/// Parse and clean an HTML document
pub(crate) fn preprocess(html: &str) -> Html {
    let mut dom = Html::parse_document(html);
    remove_noise_subtrees(&mut dom);
    strip_presentation_attrs(&mut dom);
    rewrite_images(&mut dom);
    dom
}

/// Remove every script and style subtree
fn remove_noise_subtrees(dom: &mut Html) {
    let doomed: Vec<NodeId> = dom
        .tree
        .root()
        .descendants()
        .filter(|node| {
            matches!(node.value(), Node::Element(el) if el.name() == "script" || el.name() == "style")
        })
        .map(|node| node.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = dom.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Strip class and id attributes
///
/// `class` survives on `<pre>`/`<code>` because the code-block rule reads
/// the `language-xxx` token from it.
fn strip_presentation_attrs(dom: &mut Html) {
    let ids: Vec<NodeId> = dom.tree.root().descendants().map(|node| node.id()).collect();
    for id in ids {
        if let Some(mut node) = dom.tree.get_mut(id) {
            if let Node::Element(el) = node.value() {
                let keep_class = matches!(el.name(), "pre" | "code");
                el.attrs.retain(|name, _| {
                    let local = name.local.as_ref();
                    local != "id" && (local != "class" || keep_class)
                });
            }
        }
    }
}

/// Replace every image element with an inline `![alt](src)` text node
fn rewrite_images(dom: &mut Html) {
    let images: Vec<(NodeId, String)> = dom
        .tree
        .root()
        .descendants()
        .filter_map(|node| {
            let Node::Element(el) = node.value() else {
                return None;
            };
            if el.name() != "img" {
                return None;
            }
            let alt = el.attr("alt").filter(|alt| !alt.is_empty()).unwrap_or("Image");
            let src = el.attr("src").unwrap_or("");
            Some((node.id(), format!("![{alt}]({src})")))
        })
        .collect();

    for (id, token) in images {
        if let Some(mut node) = dom.tree.get_mut(id) {
            node.insert_before(Node::Text(Text {
                text: token.as_str().into(),
            }));
            node.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_and_style_subtrees_removed() {
        let dom = preprocess("<body><script>var x;</script><style>p{}</style><p>keep</p></body>");
        let html = dom.html();
        assert!(!html.contains("script"));
        assert!(!html.contains("style"));
        assert!(html.contains("keep"));
    }

    #[test]
    fn test_class_and_id_stripped() {
        let dom = preprocess(r#"<div class="hero" id="top"><span class="x">text</span></div>"#);
        let html = dom.html();
        assert!(!html.contains("class="));
        assert!(!html.contains("id="));
        assert!(html.contains("text"));
    }

    #[test]
    fn test_language_class_survives_on_code() {
        let dom = preprocess(r#"<pre><code class="language-rust">fn main() {}</code></pre>"#);
        let html = dom.html();
        assert!(html.contains("language-rust"));
    }

    #[test]
    fn test_images_become_markdown_tokens() {
        let dom = preprocess(r#"<p><img src="logo.png" alt="Logo"></p>"#);
        let html = dom.html();
        assert!(!html.contains("<img"));
        assert!(html.contains("![Logo](logo.png)"));
    }

    #[test]
    fn test_image_alt_defaults() {
        let dom = preprocess(r#"<p><img src="a.png"><img src="b.png" alt=""></p>"#);
        let html = dom.html();
        assert!(html.contains("![Image](a.png)"));
        assert!(html.contains("![Image](b.png)"));
    }
}
