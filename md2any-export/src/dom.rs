//! Owned DOM snapshots
//!
//! Every export works on a [`Snapshot`]: an `RcDom` parsed from a string the caller
//! handed over. Nothing here can reach back into a live, interactive page, so the
//! pipeline is free to mutate, detach and replace nodes.
//!
//! The helpers mirror the handful of DOM operations the pipeline needs (attribute
//! access, detaching, replacing, deep cloning, serialization) on top of
//! `markup5ever_rcdom`.

use crate::error::ExportError;
use html5ever::tendril::TendrilSink;
use html5ever::{
    ns, parse_document, serialize, serialize::SerializeOpts, serialize::TraversalScope,
    Attribute, LocalName, ParseOpts, QualName,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A parsed, owned copy of an HTML document or fragment.
pub struct Snapshot {
    dom: RcDom,
}

impl Snapshot {
    /// Parse HTML into an owned tree. html5ever recovers from malformed input, so
    /// this never fails.
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        Snapshot { dom }
    }

    /// The document node.
    pub fn document(&self) -> Handle {
        self.dom.document.clone()
    }

    /// The `<body>` element, where fragment content lands after parsing.
    pub fn body(&self) -> Option<Handle> {
        let html = first_child_element(&self.dom.document, "html")?;
        first_child_element(&html, "body")
    }

    /// The body if present, otherwise the document node.
    pub fn content_root(&self) -> Handle {
        self.body().unwrap_or_else(|| self.document())
    }
}

fn first_child_element(parent: &Handle, tag: &str) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|child| is_element(child, tag))
        .cloned()
}

/// Local name of an element, `None` for non-element nodes.
pub fn local_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

/// Whether `node` is an element with the given local name (any namespace).
pub fn is_element(node: &Handle, tag: &str) -> bool {
    local_name(node) == Some(tag)
}

/// Read an attribute by local name, ignoring its namespace (`xlink:href` and
/// `href` both answer to `"href"`).
pub fn get_attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Set (or add) an attribute in the null namespace.
pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        if let Some(existing) = attrs
            .iter_mut()
            .find(|attr| &*attr.name.local == name && attr.name.prefix.is_none())
        {
            existing.value = value.to_string().into();
        } else {
            attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(name)),
                value: value.to_string().into(),
            });
        }
    }
}

/// Remove every attribute whose local name matches `predicate`.
pub fn remove_attrs_where(node: &Handle, predicate: impl Fn(&str) -> bool) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs
            .borrow_mut()
            .retain(|attr| !predicate(&attr.name.local));
    }
}

/// Remove a single attribute by local name.
pub fn remove_attr(node: &Handle, name: &str) {
    remove_attrs_where(node, |local| local == name);
}

/// Snapshot of a node's children (cheap `Rc` clones).
pub fn children(node: &Handle) -> Vec<Handle> {
    node.children.borrow().clone()
}

/// Element children only.
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// Parent of a node, if it is still attached.
pub fn parent(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// Append `child` to `parent`, keeping the parent link consistent.
pub fn append(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Remove a node from its parent. Detached nodes are left alone.
pub fn detach(node: &Handle) {
    if let Some(parent) = parent(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// Put `replacement` where `node` currently sits. Returns `false` when `node` has
/// no parent.
pub fn replace(node: &Handle, replacement: Handle) -> bool {
    let Some(parent) = parent(node) else {
        return false;
    };
    let mut siblings = parent.children.borrow_mut();
    let Some(index) = siblings.iter().position(|child| Rc::ptr_eq(child, node)) else {
        return false;
    };
    replacement.parent.set(Some(Rc::downgrade(&parent)));
    siblings[index] = replacement;
    node.parent.set(None);
    true
}

/// Closest ancestor element with the given local name.
pub fn ancestor(node: &Handle, tag: &str) -> Option<Handle> {
    let mut current = parent(node);
    while let Some(candidate) = current {
        if is_element(&candidate, tag) {
            return Some(candidate);
        }
        current = parent(&candidate);
    }
    None
}

/// All descendant elements of `root` in document order, `root` excluded.
pub fn descendants(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    collect_descendants(root, &mut out);
    out
}

fn collect_descendants(node: &Handle, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if matches!(child.data, NodeData::Element { .. }) {
            out.push(child.clone());
        }
        collect_descendants(child, out);
    }
}

/// Descendant elements matching `predicate`, in document order.
pub fn find_all(root: &Handle, predicate: impl Fn(&Handle) -> bool) -> Vec<Handle> {
    descendants(root)
        .into_iter()
        .filter(|node| predicate(node))
        .collect()
}

/// Copy a subtree into fresh nodes. The copy is detached and shares nothing with
/// the original, so mutating it cannot disturb the source tree.
pub fn deep_clone(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            mathml_annotation_xml_integration_point,
            ..
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };
    let copy = Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data,
    });
    for child in node.children.borrow().iter() {
        append(&copy, deep_clone(child));
    }
    copy
}

/// Create an HTML element with attributes
pub fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    create_element_ns(QualName::new(None, ns!(html), LocalName::from(tag)), attrs)
}

/// Create an SVG element with attributes
pub fn create_svg_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    create_element_ns(QualName::new(None, ns!(svg), LocalName::from(tag)), attrs)
}

fn create_element_ns(qual_name: QualName, attrs: Vec<(&str, &str)>) -> Handle {
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node
pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

/// Serialize the children of `node` as HTML.
pub fn serialize_children(node: &Handle) -> Result<String, ExportError> {
    serialize_with_scope(node, TraversalScope::ChildrenOnly(None))
}

/// Serialize `node` itself, including its subtree, as HTML.
pub fn serialize_node(node: &Handle) -> Result<String, ExportError> {
    serialize_with_scope(node, TraversalScope::IncludeNode)
}

fn serialize_with_scope(node: &Handle, scope: TraversalScope) -> Result<String, ExportError> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };
    let serializable = SerializableHandle::from(node.clone());
    serialize(&mut output, &serializable, opts)
        .map_err(|e| ExportError::Serialization(format!("HTML serialization failed: {e}")))?;
    String::from_utf8(output)
        .map_err(|e| ExportError::Serialization(format!("UTF-8 conversion failed: {e}")))
}
