//! Standalone SVG serialization
//!
//! The HTML serializer writes HTML entities and omits namespace declarations, neither
//! of which an SVG decoder accepts. Formula copies are written out as XML instead.

use markup5ever_rcdom::{Handle, NodeData};

pub const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Serialize an SVG root as a standalone XML document. Namespace declarations and the
/// prolog are added when the markup lacks them. Returns an empty string for
/// non-element nodes.
pub fn to_standalone_xml(svg: &Handle) -> String {
    let mut body = String::new();
    write_node(svg, true, &mut body);
    if body.is_empty() {
        return body;
    }
    format!("{XML_PROLOG}{body}")
}

fn write_node(node: &Handle, is_root: bool, out: &mut String) {
    match &node.data {
        NodeData::Element { name, attrs, .. } => {
            let tag = &*name.local;
            out.push('<');
            out.push_str(tag);

            let attrs = attrs.borrow();
            let mut has_xmlns = false;
            let mut has_xlink = false;
            for attr in attrs.iter() {
                let attr_name = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", &**prefix, &*attr.name.local),
                    None => attr.name.local.to_string(),
                };
                has_xmlns |= attr_name == "xmlns";
                has_xlink |= attr_name == "xmlns:xlink";
                out.push_str(&format!(" {attr_name}=\"{}\"", escape(&attr.value, true)));
            }
            if is_root && !has_xmlns {
                out.push_str(&format!(" xmlns=\"{SVG_NS}\""));
            }
            if is_root && !has_xlink {
                out.push_str(&format!(" xmlns:xlink=\"{XLINK_NS}\""));
            }

            let children = node.children.borrow();
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children.iter() {
                write_node(child, false, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeData::Text { contents } if !is_root => {
            out.push_str(&escape(&contents.borrow(), false));
        }
        _ => {}
    }
}

fn escape(value: &str, in_attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if in_attribute => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
