//! Removal of executable content and session references

use crate::dom;
use markup5ever_rcdom::{Handle, NodeData};

/// Elements that never belong in a pasted document.
const EXECUTABLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Attributes whose value is a navigable URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction"];

/// Session schemes that mean nothing outside the editor.
const SESSION_MARKERS: &[&str] = &["blob:", "img://"];

/// Drop script-like elements, comments, `on*` handlers and `javascript:` URLs
/// below `root`.
pub fn strip_executable(root: &Handle) {
    for node in dom::find_all(root, |n| {
        matches!(n.data, NodeData::Comment { .. })
            || EXECUTABLE_ELEMENTS.iter().any(|tag| dom::is_element(n, tag))
    }) {
        dom::detach(&node);
    }
    for node in dom::descendants(root) {
        dom::remove_attrs_where(&node, |name| name.to_ascii_lowercase().starts_with("on"));
        for attr in URL_ATTRIBUTES {
            let scripted = dom::get_attr(&node, attr).is_some_and(|value| {
                value
                    .trim_start()
                    .to_ascii_lowercase()
                    .starts_with("javascript:")
            });
            if scripted {
                dom::remove_attr(&node, attr);
            }
        }
    }
}

/// Remove any attribute that still points at a `blob:` or `img:` session resource
/// (`srcset` candidates, `<source>`, links, inline `url(...)`).
pub fn scrub_session_references(root: &Handle) {
    for node in dom::descendants(root) {
        let stale: Vec<String> = attribute_names(&node)
            .into_iter()
            .filter(|name| {
                dom::get_attr(&node, name).is_some_and(|value| mentions_session(&value))
            })
            .collect();
        for name in stale {
            dom::remove_attr(&node, &name);
        }
    }
}

fn mentions_session(value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    SESSION_MARKERS.iter().any(|marker| value.contains(marker))
}

fn attribute_names(node: &Handle) -> Vec<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| attr.name.local.to_string())
            .collect(),
        _ => Vec::new(),
    }
}
