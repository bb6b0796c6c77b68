//! Content normalization
//!
//! Turns a rendered document into a payload that survives being pasted anywhere:
//!
//! ```text
//! html ──► Snapshot ──► formulas ──► images ──► strip ──► wrap ──► NormalizedContent
//!                       (join_all)  (join_all)             │
//!                                                          └──► plain text
//! ```
//!
//! Each formula and each image is an independent job. Jobs are awaited together and
//! their results applied in document order afterwards, so a slow fetch never
//! reorders or blocks its siblings. Nothing in here fails because of one bad node:
//! failed items are kept or dropped according to their kind and reported as
//! [`ExportWarning`]s.

use crate::dom::{self, Snapshot};
use crate::error::Result;
use crate::formula::{is_formula, FormulaRasterizer};
use crate::images::{self, DefaultLoader, EmbedOutcome, ResourceLoader};
use crate::payload::{ExportWarning, NormalizeStats, NormalizedContent, WarningKind};
use crate::sanitize;
use crate::style::{self, has_container_sizing, StyleContextExtractor};
use crate::text;
use futures::future::join_all;
use log::{debug, warn};
use markup5ever_rcdom::{Handle, NodeData};
use std::rc::Rc;
use std::sync::Arc;

/// Elements that may act as the outer presentational container of a document.
const CONTAINER_TAGS: &[&str] = &["section", "div", "article", "main"];

/// Normalizes rendered documents for export.
#[derive(Clone)]
pub struct ContentNormalizer {
    rasterizer: FormulaRasterizer,
    loader: Arc<dyn ResourceLoader>,
    styles: StyleContextExtractor,
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(DefaultLoader::new(
            Default::default(),
            Default::default(),
        )))
    }
}

impl ContentNormalizer {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            rasterizer: FormulaRasterizer::default(),
            loader,
            styles: StyleContextExtractor::default(),
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: FormulaRasterizer) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_style_extractor(mut self, styles: StyleContextExtractor) -> Self {
        self.styles = styles;
        self
    }

    pub fn rasterizer(&self) -> &FormulaRasterizer {
        &self.rasterizer
    }

    /// Normalize a rendered fragment on its own.
    pub async fn normalize(&self, rendered_html: &str) -> Result<NormalizedContent> {
        self.normalize_with_page(rendered_html, None).await
    }

    /// Normalize a rendered fragment whose formulas may reference symbol definitions
    /// held elsewhere on the page.
    ///
    /// The only error is a serialization failure of the finished tree.
    pub async fn normalize_with_page(
        &self,
        rendered_html: &str,
        page: Option<&Snapshot>,
    ) -> Result<NormalizedContent> {
        let snapshot = Snapshot::parse(rendered_html);
        let root = snapshot.content_root();
        let pages: Vec<Handle> = page.map(|p| vec![p.document()]).unwrap_or_default();
        let mut report = Report::default();

        self.rasterize_formulas(&root, &pages, &mut report).await;
        self.embed_images(&root, &mut report).await;
        sanitize::strip_executable(&root);
        sanitize::scrub_session_references(&root);

        let wrapper_style = self.styles.extract(&root);
        let content = existing_container(&root, &wrapper_style).unwrap_or_else(|| root.clone());
        let html = style::wrap(&dom::serialize_children(&content)?, &wrapper_style);
        let plain_text = text::plain_text(&content);

        debug!(
            "Normalized document: {} formula(s) rasterized, {} kept, {} image(s) embedded, {} dropped, {} kept remote",
            report.stats.formulas_rasterized,
            report.stats.formulas_kept,
            report.stats.images_embedded,
            report.stats.images_dropped,
            report.stats.images_kept_remote
        );
        Ok(NormalizedContent {
            html,
            plain_text,
            warnings: report.warnings,
            stats: report.stats,
        })
    }

    async fn rasterize_formulas(&self, root: &Handle, pages: &[Handle], report: &mut Report) {
        let formulas: Vec<Handle> = dom::find_all(root, |node| {
            is_formula(node) && dom::ancestor(node, "svg").is_none()
        });
        if formulas.is_empty() {
            return;
        }
        debug!("Rasterizing {} formula(s)", formulas.len());

        let jobs = formulas
            .iter()
            .map(|formula| self.rasterizer.try_rasterize(formula, pages));
        let results = join_all(jobs).await;

        for (index, (formula, result)) in formulas.iter().zip(results).enumerate() {
            let label = formula_label(formula);
            match result {
                Ok(rasterized) => {
                    let container = replaceable_container(formula);
                    let display = container.as_ref().is_some_and(is_display_container);
                    let style = if display {
                        "display: block; margin: 0 auto;"
                    } else {
                        "vertical-align: middle;"
                    };
                    let width = rasterized.width.to_string();
                    let height = rasterized.height.to_string();
                    let img = dom::create_element(
                        "img",
                        vec![
                            ("src", rasterized.data_uri.as_str()),
                            ("alt", label.as_str()),
                            ("width", width.as_str()),
                            ("height", height.as_str()),
                            ("style", style),
                            ("data-formula", label.as_str()),
                        ],
                    );
                    let target = container.unwrap_or_else(|| formula.clone());
                    dom::replace(&target, img);
                    report.stats.formulas_rasterized += 1;
                }
                Err(err) => {
                    warn!("Formula #{index} kept as vector markup: {err}");
                    report.stats.formulas_kept += 1;
                    report.warn(
                        WarningKind::FormulaNotRasterized,
                        if label.is_empty() {
                            format!("formula #{index}")
                        } else {
                            label
                        },
                        err.to_string(),
                    );
                }
            }
        }
    }

    async fn embed_images(&self, root: &Handle, report: &mut Report) {
        let images: Vec<Handle> = dom::find_all(root, |node| {
            dom::is_element(node, "img") && dom::get_attr(node, "data-formula").is_none()
        });
        let sources: Vec<(Handle, String)> = images
            .iter()
            .filter_map(|img| dom::get_attr(img, "src").map(|src| (img.clone(), src)))
            .collect();

        let loader = self.loader.as_ref();
        let jobs = sources.iter().map(|(_, src)| images::embed(loader, src));
        let outcomes = join_all(jobs).await;

        for ((img, src), outcome) in sources.iter().zip(outcomes) {
            match outcome {
                EmbedOutcome::Embedded(uri) => {
                    dom::set_attr(img, "src", &uri);
                    dom::remove_attr(img, images::WARNING_ATTR);
                    report.stats.images_embedded += 1;
                }
                EmbedOutcome::Unchanged => {}
                EmbedOutcome::Dropped(err) => {
                    warn!("Dropping image {src}: {err}");
                    dom::detach(img);
                    report.stats.images_dropped += 1;
                    report.warn(WarningKind::ImageDropped, src.clone(), err.to_string());
                }
                EmbedOutcome::KeptRemote(err) => {
                    warn!("Keeping remote image {src}: {err}");
                    dom::set_attr(img, images::WARNING_ATTR, "unreachable");
                    report.stats.images_kept_remote += 1;
                    report.warn(WarningKind::ImageRemoteUnreachable, src.clone(), err.to_string());
                }
            }
        }

        for img in images.iter().filter(|img| dom::parent(img).is_some()) {
            images::make_responsive(img);
        }
    }
}

#[derive(Default)]
struct Report {
    warnings: Vec<ExportWarning>,
    stats: NormalizeStats,
}

impl Report {
    fn warn(&mut self, kind: WarningKind, source: String, message: String) {
        self.warnings.push(ExportWarning::new(kind, source, message));
    }
}

/// Alt text for a formula: its accessible label, else its source notation.
fn formula_label(formula: &Handle) -> String {
    let container = dom::ancestor(formula, "mjx-container");
    dom::get_attr(formula, "aria-label")
        .or_else(|| container.as_ref().and_then(|c| dom::get_attr(c, "aria-label")))
        .or_else(|| dom::get_attr(formula, "data-formula"))
        .map(|label| label.trim().to_string())
        .unwrap_or_default()
}

/// The `mjx-container` to replace instead of the bare `<svg>`, when the svg is its
/// only rendered child (an assistive MathML copy may sit beside it).
fn replaceable_container(formula: &Handle) -> Option<Handle> {
    let container = dom::parent(formula).filter(|p| dom::is_element(p, "mjx-container"))?;
    dom::element_children(&container)
        .iter()
        .all(|child| Rc::ptr_eq(child, formula) || dom::is_element(child, "mjx-assistive-mml"))
        .then_some(container)
}

fn is_display_container(container: &Handle) -> bool {
    matches!(
        dom::get_attr(container, "display").as_deref(),
        Some("true" | "block")
    )
}

/// The single container element wrapping the whole fragment, when its style is the
/// wrapper style. Its children become the content so the wrapper is not doubled.
fn existing_container(root: &Handle, wrapper_style: &str) -> Option<Handle> {
    let mut elements = Vec::new();
    for child in dom::children(root) {
        match &child.data {
            NodeData::Element { .. } => elements.push(child),
            NodeData::Text { contents } if contents.borrow().trim().is_empty() => {}
            _ => return None,
        }
    }
    let [container] = elements.as_slice() else {
        return None;
    };
    let style = dom::get_attr(container, "style")?;
    (CONTAINER_TAGS.iter().any(|tag| dom::is_element(container, tag))
        && style == wrapper_style
        && has_container_sizing(&style))
    .then(|| container.clone())
}
