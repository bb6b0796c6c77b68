//! Symbol definition registry
//!
//! Typesetters keep glyph shapes in a shared `<defs>` block (a page-level "global
//! cache") and point at them from each formula with `<use href="#id">`. A formula
//! copied on its own therefore draws nothing unless those ids can be looked up
//! somewhere else. The registry is the lookup table: it is built from explicit
//! snapshot roots, never from ambient page state, and is rebuilt for every
//! rasterization because the page can change between calls.

use crate::dom;
use markup5ever_rcdom::Handle;
use std::collections::HashMap;

/// Read-only map from symbol id to its definition subtree.
#[derive(Default, Clone)]
pub struct SymbolRegistry {
    definitions: HashMap<String, Handle>,
}

impl SymbolRegistry {
    /// Build a registry by scanning each root in order. The first definition of an
    /// id wins, matching `getElementById` semantics.
    pub fn from_roots<'a>(roots: impl IntoIterator<Item = &'a Handle>) -> Self {
        let mut registry = SymbolRegistry::default();
        for root in roots {
            registry.scan(root);
        }
        registry
    }

    fn scan(&mut self, root: &Handle) {
        for container in dom::find_all(root, is_definition_container) {
            if dom::is_element(&container, "symbol") {
                self.insert(&container);
            }
            for node in dom::descendants(&container) {
                self.insert(&node);
            }
        }
    }

    fn insert(&mut self, node: &Handle) {
        if let Some(id) = dom::get_attr(node, "id").filter(|id| !id.is_empty()) {
            self.definitions.entry(id).or_insert_with(|| node.clone());
        }
    }

    pub fn get(&self, id: &str) -> Option<&Handle> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Collect every symbol definition reachable from `root`.
pub fn collect_symbol_definitions(root: &Handle) -> SymbolRegistry {
    SymbolRegistry::from_roots([root])
}

fn is_definition_container(node: &Handle) -> bool {
    dom::is_element(node, "defs") || dom::is_element(node, "symbol")
}

/// Target id of a reference element (`href="#id"` or `xlink:href="#id"`).
pub fn reference_id(node: &Handle) -> Option<String> {
    let href = dom::get_attr(node, "href")?;
    let id = href.trim().strip_prefix('#')?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
