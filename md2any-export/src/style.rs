//! Presentational wrapper for pasted content
//!
//! Rendered documents carry their typography on an outer container (the renderer
//! emits something like `<section class="markdown-content" style="max-width: 740px;
//! margin: 0 auto; ...">`). Paste targets drop the surrounding page, so the export
//! re-wraps the fragment with that container style. When no container is found a
//! fixed default is used instead; an unwrapped paste looks broken in most targets.

use crate::dom;
use markup5ever_rcdom::Handle;

/// Default wrapper style: readable column, padding, neutral typography and colors.
pub const DEFAULT_WRAPPER_STYLE: &str = "max-width: 740px; margin: 0 auto; padding: 20px; \
font-family: \"Helvetica Neue\", Helvetica, Arial, sans-serif; font-size: 16px; \
line-height: 1.8; color: #3f3f3f; background-color: #ffffff; word-wrap: break-word;";

/// Declarations that identify a container-level element.
const CONTAINER_PROPERTIES: &[&str] = &["max-width", "margin", "padding"];

const NON_CONTAINERS: &[&str] = &["img", "svg", "video", "picture"];

/// Derives the wrapper style for a rendered document.
#[derive(Debug, Clone)]
pub struct StyleContextExtractor {
    default_style: String,
}

impl Default for StyleContextExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_WRAPPER_STYLE)
    }
}

impl StyleContextExtractor {
    pub fn new(default_style: impl Into<String>) -> Self {
        Self {
            default_style: default_style.into(),
        }
    }

    pub fn default_style(&self) -> &str {
        &self.default_style
    }

    /// Inline style of the first descendant carrying container-level sizing, or the
    /// default style. Images and vector graphics never act as containers.
    pub fn extract(&self, root: &Handle) -> String {
        dom::descendants(root)
            .iter()
            .filter(|node| !NON_CONTAINERS.iter().any(|tag| dom::is_element(node, tag)))
            .filter(|node| dom::ancestor(node, "svg").is_none())
            .filter_map(|node| dom::get_attr(node, "style"))
            .find(|style| has_container_sizing(style))
            .unwrap_or_else(|| self.default_style.clone())
    }
}

/// Whether an inline style declares any container-level property.
pub fn has_container_sizing(style: &str) -> bool {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(property, _)| property.trim().to_ascii_lowercase())
        .any(|property| {
            CONTAINER_PROPERTIES
                .iter()
                .any(|wanted| property == *wanted || property.starts_with(&format!("{wanted}-")))
        })
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Wrap serialized content in a `<section>` carrying `style`.
pub fn wrap(inner_html: &str, style: &str) -> String {
    format!(
        "<section style=\"{}\">{inner_html}</section>",
        escape_attr(style)
    )
}
