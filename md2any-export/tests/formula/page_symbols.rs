//! Rasterizing formulas whose glyphs live in a page-level symbol cache

use crate::common::{FORMULA_USING_PAGE_GLYPH, PAGE_WITH_GLYPHS};
use base64::Engine;
use md2any_export::dom::{self, Snapshot};
use md2any_export::formula::{collect_symbol_definitions, FormulaRasterizer};
use md2any_export::RasterError;
use markup5ever_rcdom::Handle;

fn formula_of(snapshot: &Snapshot) -> Handle {
    dom::find_all(&snapshot.document(), |n| dom::is_element(n, "svg"))[0].clone()
}

/// Number of clearly dark pixels in a PNG data URI.
fn dark_pixels(uri: &str) -> usize {
    let encoded = uri.strip_prefix("data:image/png;base64,").unwrap();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    image::load_from_memory(&bytes)
        .unwrap()
        .to_rgba8()
        .pixels()
        .filter(|p| p.0[0] < 128 && p.0[1] < 128 && p.0[2] < 128)
        .count()
}

#[test]
fn test_page_registry_contains_glyph() {
    let page = Snapshot::parse(PAGE_WITH_GLYPHS);
    let definitions = collect_symbol_definitions(&page.document());
    assert!(definitions.contains("MJX-1-TEX-I-78"));
    assert_eq!(definitions.len(), 1);
}

#[tokio::test]
async fn test_reference_resolved_from_page_snapshot() {
    let page = Snapshot::parse(PAGE_WITH_GLYPHS);
    let fragment = Snapshot::parse(FORMULA_USING_PAGE_GLYPH);
    let formula = formula_of(&fragment);

    let uri = FormulaRasterizer::default()
        .rasterize(&formula, &[page.document()])
        .await
        .expect("page-level glyph should resolve");
    assert!(uri.starts_with("data:image/png;base64,"));
    assert!(dark_pixels(&uri) > 0);
}

#[tokio::test]
async fn test_missing_page_leaves_formula_unrasterized() {
    let fragment = Snapshot::parse(FORMULA_USING_PAGE_GLYPH);
    let rasterizer = FormulaRasterizer::default();
    let formula = formula_of(&fragment);

    assert!(rasterizer.rasterize(&formula, &[]).await.is_none());
    assert_eq!(
        rasterizer.try_rasterize(&formula, &[]).await,
        Err(RasterError::UnresolvedSymbols(vec!["MJX-1-TEX-I-78".to_string()]))
    );
}

#[tokio::test]
async fn test_rasterizing_leaves_inputs_untouched() {
    let page = Snapshot::parse(PAGE_WITH_GLYPHS);
    let fragment = Snapshot::parse(FORMULA_USING_PAGE_GLYPH);
    let formula = formula_of(&fragment);
    let before = dom::serialize_children(&fragment.document()).unwrap();
    let page_before = dom::serialize_children(&page.document()).unwrap();

    FormulaRasterizer::default()
        .rasterize(&formula, &[page.document()])
        .await
        .unwrap();

    assert_eq!(dom::serialize_children(&fragment.document()).unwrap(), before);
    assert_eq!(dom::serialize_children(&page.document()).unwrap(), page_before);
}
