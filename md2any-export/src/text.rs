//! Plain-text rendition of a normalized document

use crate::dom;
use crate::formula;
use markup5ever_rcdom::{Handle, NodeData};

/// Subtrees that are never visible text.
const HIDDEN: &[&str] = &[
    "script",
    "style",
    "noscript",
    "template",
    "head",
    "svg",
    "mjx-assistive-mml",
];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tr", "ul",
];

/// Visible text below `root`: one line per block, whitespace collapsed outside
/// `<pre>`. Formula images contribute their alt text and formulas left as vector
/// markup their accessible label.
pub fn plain_text(root: &Handle) -> String {
    let mut writer = TextWriter::default();
    for child in dom::children(root) {
        writer.visit(&child, false);
    }
    writer.finish()
}

#[derive(Default)]
struct TextWriter {
    out: String,
    pending_space: bool,
}

impl TextWriter {
    fn visit(&mut self, node: &Handle, in_pre: bool) {
        match &node.data {
            NodeData::Text { contents } => {
                let text = contents.borrow();
                if in_pre {
                    self.push_verbatim(&text);
                } else {
                    self.push_collapsed(&text);
                }
            }
            NodeData::Element { name, .. } => {
                let tag = &*name.local;
                if tag == "svg" && formula::is_formula(node) {
                    let label = formula_label(node);
                    self.push_collapsed(&label);
                    return;
                }
                if HIDDEN.contains(&tag) {
                    return;
                }
                match tag {
                    "br" => self.line_break(),
                    "img" => {
                        if dom::get_attr(node, "data-formula").is_some() {
                            let alt = dom::get_attr(node, "alt").unwrap_or_default();
                            self.push_collapsed(&alt);
                        }
                    }
                    "td" | "th" => {
                        if !self.out.is_empty() && !self.out.ends_with(['\n', '\t']) {
                            self.out.push('\t');
                        }
                        self.pending_space = false;
                        self.visit_children(node, in_pre);
                    }
                    _ => {
                        let block = BLOCKS.contains(&tag) || is_display_formula(node);
                        if block {
                            self.line_break();
                        }
                        self.visit_children(node, in_pre || tag == "pre");
                        if block {
                            self.line_break();
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_children(&mut self, node: &Handle, in_pre: bool) {
        for child in dom::children(node) {
            self.visit(&child, in_pre);
        }
    }

    fn push_collapsed(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.pending_space = !self.out.is_empty() && !self.out.ends_with(['\n', '\t']);
            } else {
                if self.pending_space {
                    self.out.push(' ');
                    self.pending_space = false;
                }
                self.out.push(ch);
            }
        }
    }

    fn push_verbatim(&mut self, text: &str) {
        if self.pending_space {
            self.out.push(' ');
            self.pending_space = false;
        }
        self.out.push_str(text);
    }

    fn line_break(&mut self) {
        let trimmed = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(trimmed);
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.pending_space = false;
    }

    fn finish(mut self) -> String {
        let trimmed = self.out.trim_end().len();
        self.out.truncate(trimmed);
        self.out
    }
}

fn formula_label(svg: &Handle) -> String {
    dom::get_attr(svg, "aria-label")
        .or_else(|| dom::ancestor(svg, "mjx-container").and_then(|c| dom::get_attr(&c, "aria-label")))
        .unwrap_or_default()
}

fn is_display_formula(node: &Handle) -> bool {
    dom::is_element(node, "mjx-container")
        && matches!(dom::get_attr(node, "display").as_deref(), Some("true" | "block"))
}
