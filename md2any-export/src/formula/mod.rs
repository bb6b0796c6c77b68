//! Vector formula rasterization
//!
//! Math typesetters emit formulas as inline SVG. Most paste targets either drop SVG
//! or render it without the page's shared glyph definitions, so exported formulas are
//! turned into PNG images.
//!
//! # Pipeline
//!
//! ```text
//! formula <svg> ──► isolated copy ──► inline <use> refs ──► measure ──► XML ──► usvg/resvg ──► PNG data URI
//!                                         ▲
//!                         SymbolRegistry (page snapshots + own document)
//! ```
//!
//! Preparation (copy, resolve, measure, serialize) works on the `Rc` DOM and is
//! synchronous. Decoding and painting run on the blocking pool under a timeout and
//! only see an owned XML string.
//!
//! [`FormulaRasterizer::rasterize`] never fails: any problem is logged and reported as
//! `None`, and the caller keeps the original vector markup. That includes references
//! to symbols found in no snapshot, which would otherwise paint as blank glyphs, and
//! boxes larger than `max_width` x `max_height`.

mod geometry;
mod raster;
mod resolve;
mod symbols;
mod xml;

pub use geometry::{measure, parse_length, FormulaBox};
pub use raster::{data_uri, render_png};
pub use resolve::{resolve_references, Resolution};
pub use symbols::{collect_symbol_definitions, reference_id, SymbolRegistry};
pub use xml::to_standalone_xml;

use crate::dom;
use crate::error::RasterError;
use log::{debug, warn};
use markup5ever_rcdom::Handle;
use std::time::Duration;

/// Knobs for formula rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Upper bound for decode + paint of one formula.
    pub timeout: Duration,
    /// Surface scale relative to the target box.
    pub supersample: f32,
    pub min_width: f32,
    pub min_height: f32,
    /// Largest target box accepted; bigger formulas are kept as vector markup.
    pub max_width: f32,
    pub max_height: f32,
    /// Pixels per `ex` when converting typesetter lengths.
    pub ex_px: f32,
    /// Pixels per `em`.
    pub em_px: f32,
    /// Nesting limit for inlined references.
    pub max_inline_depth: usize,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            supersample: 2.0,
            min_width: 50.0,
            min_height: 20.0,
            max_width: 4096.0,
            max_height: 4096.0,
            ex_px: 8.0,
            em_px: 16.0,
            max_inline_depth: 8,
        }
    }
}

/// A formula ready to be painted: owned data only, safe to move to another thread.
#[derive(Debug, Clone)]
pub struct PreparedFormula {
    pub xml: String,
    pub width: u32,
    pub height: u32,
}

/// A rasterized formula and the box it should occupy in CSS pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedFormula {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

/// Converts vector formula subtrees to raster data URIs.
#[derive(Debug, Clone, Default)]
pub struct FormulaRasterizer {
    options: RasterOptions,
}

impl FormulaRasterizer {
    pub fn new(options: RasterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    /// Rasterize one formula. `pages` are additional snapshot roots whose symbol
    /// definitions may be referenced; the formula's own document is always searched.
    ///
    /// Must run inside a tokio runtime.
    pub async fn rasterize(&self, formula: &Handle, pages: &[Handle]) -> Option<String> {
        match self.try_rasterize(formula, pages).await {
            Ok(rasterized) => Some(rasterized.data_uri),
            Err(err) => {
                warn!("Formula rasterization failed: {err}");
                None
            }
        }
    }

    /// Like [`rasterize`](Self::rasterize), but keeps the failure reason and the
    /// target box.
    pub async fn try_rasterize(
        &self,
        formula: &Handle,
        pages: &[Handle],
    ) -> Result<RasterizedFormula, RasterError> {
        let prepared = self.prepare(formula, pages)?;
        let (width, height) = (prepared.width, prepared.height);
        let data_uri = self.render(prepared).await?;
        Ok(RasterizedFormula {
            data_uri,
            width,
            height,
        })
    }

    /// Copy, resolve, measure and serialize a formula.
    pub fn prepare(&self, formula: &Handle, pages: &[Handle]) -> Result<PreparedFormula, RasterError> {
        let own_root = document_root(formula);
        let registry = SymbolRegistry::from_roots(pages.iter().chain(std::iter::once(&own_root)));
        let resolution = resolve_references(formula, &registry, self.options.max_inline_depth);

        if !resolution.missing.is_empty() {
            return Err(RasterError::UnresolvedSymbols(
                resolution.missing.into_iter().collect(),
            ));
        }
        if dom::element_children(&resolution.svg).is_empty() {
            return Err(RasterError::EmptySerialization);
        }
        let xml = to_standalone_xml(&resolution.svg);
        if xml.is_empty() {
            return Err(RasterError::EmptySerialization);
        }

        let natural = measure(&resolution.svg, &self.options)
            .unwrap_or(FormulaBox { width: 0.0, height: 0.0 });
        let (width, height) = natural.target(&self.options);
        if width as f32 > self.options.max_width || height as f32 > self.options.max_height {
            return Err(RasterError::Surface { width, height });
        }
        debug!(
            "Prepared formula: {width}x{height}, {} reference(s) inlined, {} symbol(s) registered",
            resolution.inlined,
            registry.len()
        );
        Ok(PreparedFormula { xml, width, height })
    }

    /// Paint a prepared formula on the blocking pool, bounded by the configured timeout.
    pub async fn render(&self, prepared: PreparedFormula) -> Result<String, RasterError> {
        let timeout = self.options.timeout;
        let supersample = self.options.supersample;
        let target = (prepared.width, prepared.height);
        let xml = prepared.xml;

        let task = tokio::task::spawn_blocking(move || render_png(&xml, target, supersample));
        let png = tokio::time::timeout(timeout, task)
            .await
            .map_err(|_| RasterError::Timeout(timeout))?
            .map_err(|e| RasterError::Task(e.to_string()))??;
        Ok(data_uri("image/png", &png))
    }
}

/// Whether an element is a typeset vector formula.
pub fn is_formula(node: &Handle) -> bool {
    if !dom::is_element(node, "svg") {
        return false;
    }
    dom::ancestor(node, "mjx-container").is_some()
        || dom::get_attr(node, "data-formula").is_some()
        || dom::descendants(node)
            .iter()
            .any(|n| dom::get_attr(n, "data-mml-node").is_some())
}

fn document_root(node: &Handle) -> Handle {
    let mut current = node.clone();
    while let Some(parent) = dom::parent(&current) {
        current = parent;
    }
    current
}
