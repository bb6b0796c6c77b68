//! Inlining of symbol references into an isolated formula copy

use super::symbols::{reference_id, SymbolRegistry};
use crate::dom;
use markup5ever_rcdom::Handle;
use std::collections::BTreeSet;

/// Attributes of a reference element that describe the reference itself rather than
/// presentation, and so must not be carried onto the inlined group.
const REFERENCE_ONLY_ATTRS: &[&str] = &["href", "x", "y", "width", "height", "transform", "id"];

/// Outcome of resolving the references of one formula.
pub struct Resolution {
    /// Detached, resolved copy of the formula root.
    pub svg: Handle,
    /// Number of references replaced with inline shapes.
    pub inlined: usize,
    /// Ids kept as scoped definitions (nesting too deep or self-referencing).
    pub scoped: BTreeSet<String>,
    /// Ids that no registry knows about; those references draw nothing.
    pub missing: BTreeSet<String>,
}

/// Clone `formula` and inline every reference the registry can satisfy.
pub fn resolve_references(formula: &Handle, registry: &SymbolRegistry, max_depth: usize) -> Resolution {
    let svg = dom::deep_clone(formula);
    let mut resolution = Resolution {
        svg: svg.clone(),
        inlined: 0,
        scoped: BTreeSet::new(),
        missing: BTreeSet::new(),
    };
    let mut chain = Vec::new();
    inline_in(&svg, registry, max_depth, &mut chain, &mut resolution);

    if !resolution.scoped.is_empty() {
        let ids = scoped_closure(&resolution.scoped, registry);
        let defs = dom::create_svg_element("defs", vec![]);
        for id in &ids {
            if let Some(definition) = registry.get(id) {
                dom::append(&defs, dom::deep_clone(definition));
            }
        }
        prepend(&svg, defs);
        resolution.scoped = ids;
    }
    resolution
}

fn inline_in(
    node: &Handle,
    registry: &SymbolRegistry,
    max_depth: usize,
    chain: &mut Vec<String>,
    resolution: &mut Resolution,
) {
    for child in dom::children(node) {
        if !dom::is_element(&child, "use") {
            inline_in(&child, registry, max_depth, chain, resolution);
            continue;
        }
        let Some(id) = reference_id(&child) else {
            continue;
        };
        let Some(definition) = registry.get(&id) else {
            resolution.missing.insert(id);
            continue;
        };
        if chain.len() >= max_depth || chain.contains(&id) {
            resolution.scoped.insert(id);
            continue;
        }
        let group = inline_group(&child, definition);
        if dom::replace(&child, group.clone()) {
            resolution.inlined += 1;
            chain.push(id);
            inline_in(&group, registry, max_depth, chain, resolution);
            chain.pop();
        }
    }
}

/// Build the `<g>` that stands in for a reference: the reference's own placement and
/// presentation attributes around an id-stripped copy of the definition.
fn inline_group(reference: &Handle, definition: &Handle) -> Handle {
    let group = dom::create_svg_element("g", vec![]);
    if let Some(transform) = placement_transform(reference) {
        dom::set_attr(&group, "transform", &transform);
    }
    copy_presentation_attrs(reference, &group);

    if dom::is_element(definition, "symbol") {
        // A symbol is a template, not a shape: inline its children only.
        for child in dom::children(definition) {
            let copy = dom::deep_clone(&child);
            strip_ids(&copy);
            dom::append(&group, copy);
        }
    } else {
        let copy = dom::deep_clone(definition);
        strip_ids(&copy);
        dom::append(&group, copy);
    }
    group
}

/// The reference's `transform` followed by its `x`/`y` offset, as SVG applies them.
fn placement_transform(reference: &Handle) -> Option<String> {
    let transform = dom::get_attr(reference, "transform").filter(|t| !t.trim().is_empty());
    let x = coordinate(reference, "x");
    let y = coordinate(reference, "y");
    let translate = (x != 0.0 || y != 0.0).then(|| format!("translate({x} {y})"));
    match (transform, translate) {
        (Some(t), Some(tr)) => Some(format!("{} {tr}", t.trim())),
        (Some(t), None) => Some(t.trim().to_string()),
        (None, Some(tr)) => Some(tr),
        (None, None) => None,
    }
}

fn coordinate(node: &Handle, name: &str) -> f32 {
    dom::get_attr(node, name)
        .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
        .unwrap_or(0.0)
}

fn copy_presentation_attrs(reference: &Handle, group: &Handle) {
    let Some(names) = attr_names(reference) else {
        return;
    };
    for name in names {
        if REFERENCE_ONLY_ATTRS.contains(&name.as_str()) {
            continue;
        }
        if let Some(value) = dom::get_attr(reference, &name) {
            dom::set_attr(group, &name, &value);
        }
    }
}

fn attr_names(node: &Handle) -> Option<Vec<String>> {
    match &node.data {
        markup5ever_rcdom::NodeData::Element { attrs, .. } => Some(
            attrs
                .borrow()
                .iter()
                .filter(|attr| attr.name.prefix.is_none())
                .map(|attr| attr.name.local.to_string())
                .collect(),
        ),
        _ => None,
    }
}

fn strip_ids(node: &Handle) {
    dom::remove_attr(node, "id");
    for descendant in dom::descendants(node) {
        dom::remove_attr(&descendant, "id");
    }
}

/// Scoped ids plus every id their definitions reference in turn.
fn scoped_closure(seed: &BTreeSet<String>, registry: &SymbolRegistry) -> BTreeSet<String> {
    let mut ids = seed.clone();
    let mut pending: Vec<String> = seed.iter().cloned().collect();
    while let Some(id) = pending.pop() {
        let Some(definition) = registry.get(&id) else {
            continue;
        };
        for node in dom::find_all(definition, |n| dom::is_element(n, "use")) {
            if let Some(next) = reference_id(&node) {
                if registry.contains(&next) && ids.insert(next.clone()) {
                    pending.push(next);
                }
            }
        }
    }
    ids
}

fn prepend(parent: &Handle, child: Handle) {
    child
        .parent
        .set(Some(std::rc::Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, child);
}
