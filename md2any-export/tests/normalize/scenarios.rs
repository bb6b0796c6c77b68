//! End-to-end normalization scenarios
//!
//! Each test feeds a rendered fragment through the normalizer and checks the
//! resulting payload, warnings and counters.

use crate::common::{
    offline_normalizer, ScriptedLoader, FORMULA_USING_PAGE_GLYPH, PAGE_WITH_GLYPHS, TINY_PNG,
};
use insta::assert_snapshot;
use md2any_export::style::{wrap, DEFAULT_WRAPPER_STYLE};
use md2any_export::{
    ContentNormalizer, FormulaRasterizer, RasterOptions, Resource, SessionStore, Snapshot,
    WarningKind,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

static IMG_SRC: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<img src="([^"]*)""#).unwrap());

fn image_sources(html: &str) -> Vec<String> {
    IMG_SRC
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect()
}

// ============================================================================
// BASELINE
// ============================================================================

#[tokio::test]
async fn test_plain_document_is_wrapped_verbatim() {
    let input = "<h1>Release notes</h1><p>Nothing to convert here.</p>";
    let content = offline_normalizer(SessionStore::new())
        .normalize(input)
        .await
        .unwrap();

    assert_eq!(content.html, wrap(input, DEFAULT_WRAPPER_STYLE));
    assert_eq!(content.plain_text, "Release notes\nNothing to convert here.");
    assert!(content.warnings.is_empty());
    assert_eq!(content.stats, Default::default());
}

#[tokio::test]
async fn test_wrapper_snapshot() {
    let content = offline_normalizer(SessionStore::new())
        .normalize("<p>x</p>")
        .await
        .unwrap();
    assert_snapshot!(content.html, @r#"<section style="max-width: 740px; margin: 0 auto; padding: 20px; font-family: &quot;Helvetica Neue&quot;, Helvetica, Arial, sans-serif; font-size: 16px; line-height: 1.8; color: #3f3f3f; background-color: #ffffff; word-wrap: break-word;"><p>x</p></section>"#);
}

#[tokio::test]
async fn test_configured_default_style() {
    let normalizer = offline_normalizer(SessionStore::new())
        .with_style_extractor(md2any_export::StyleContextExtractor::new("padding: 4px;"));
    let content = normalizer.normalize("<p>x</p>").await.unwrap();
    assert_eq!(content.html, r#"<section style="padding: 4px;"><p>x</p></section>"#);
}

// ============================================================================
// IMAGES
// ============================================================================

#[tokio::test]
async fn test_unreadable_session_image_is_dropped_with_warning() {
    let content = offline_normalizer(SessionStore::new())
        .normalize(r#"<p>Before</p><p><img src="blob:http://localhost/expired" alt="shot"></p><p>After</p>"#)
        .await
        .unwrap();

    assert!(!content.html.contains("<img"));
    assert!(!content.html.contains("blob:"));
    assert!(content.html.contains("<p>Before</p><p></p><p>After</p>"));
    assert_eq!(content.stats.images_dropped, 1);
    assert_eq!(content.warnings.len(), 1);
    assert_eq!(content.warnings[0].kind, WarningKind::ImageDropped);
}

#[tokio::test]
async fn test_session_image_is_embedded_as_png() {
    let store = SessionStore::new();
    store.register("blob:a", Resource::new(TINY_PNG.clone(), None));
    let content = offline_normalizer(store)
        .normalize(r#"<img src="blob:a">"#)
        .await
        .unwrap();

    let sources = image_sources(&content.html);
    assert_eq!(sources.len(), 1);
    assert!(sources[0].starts_with("data:image/png;base64,"));
    assert_eq!(content.stats.images_embedded, 1);
}

#[tokio::test]
async fn test_pasted_image_ids_are_session_handles() {
    let store = SessionStore::new();
    store.register("img://4f2c", Resource::new(TINY_PNG.clone(), None));
    let content = offline_normalizer(store)
        .normalize(r#"<p><img src="img://4f2c" alt="kept"><img src="img://9d01" alt="gone"></p>"#)
        .await
        .unwrap();

    let sources = image_sources(&content.html);
    assert_eq!(sources.len(), 1);
    assert!(sources[0].starts_with("data:image/png;base64,"));
    assert!(!content.html.contains("img://"));
    assert_eq!(content.stats.images_embedded, 1);
    assert_eq!(content.stats.images_dropped, 1);
    assert_eq!(content.stats.images_kept_remote, 0);
    assert_eq!(content.warnings[0].kind, WarningKind::ImageDropped);
    assert_eq!(content.warnings[0].source, "img://9d01");
}

#[tokio::test]
async fn test_local_image_is_embedded_relative_to_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("chart.png"), TINY_PNG.as_slice()).unwrap();
    let options = md2any_export::LoaderOptions {
        fetch_remote: false,
        base_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let loader = md2any_export::DefaultLoader::new(SessionStore::new(), options);
    let content = ContentNormalizer::new(Arc::new(loader))
        .normalize(r#"<img src="chart.png">"#)
        .await
        .unwrap();

    assert!(image_sources(&content.html)[0].starts_with("data:image/png;base64,"));
    assert!(content.warnings.is_empty());
}

#[tokio::test]
async fn test_unreachable_remote_image_keeps_its_url() {
    let content = offline_normalizer(SessionStore::new())
        .normalize(r#"<p><img src="https://example.com/figure.png" height="120"></p>"#)
        .await
        .unwrap();

    assert_eq!(image_sources(&content.html), vec!["https://example.com/figure.png"]);
    assert!(content.html.contains(r#"data-export-warning="unreachable""#));
    assert!(content.html.contains("max-width: 100%; height: auto;"));
    assert!(!content.html.contains(r#"height="120""#));
    assert_eq!(content.stats.images_kept_remote, 1);
    assert_eq!(content.warnings[0].kind, WarningKind::ImageRemoteUnreachable);
}

#[tokio::test]
async fn test_results_follow_document_order_not_completion_order() {
    let loader = ScriptedLoader::default()
        .with("blob:slow", 40, b"first")
        .with("blob:fast", 0, b"second")
        .with("https://example.com/medium.png", 15, b"third");
    let content = ContentNormalizer::new(Arc::new(loader))
        .normalize(
            r#"<img src="blob:slow"><img src="blob:fast"><img src="https://example.com/medium.png">"#,
        )
        .await
        .unwrap();

    assert_eq!(
        image_sources(&content.html),
        vec![
            "data:image/png;base64,Zmlyc3Q=",
            "data:image/png;base64,c2Vjb25k",
            "data:image/png;base64,dGhpcmQ=",
        ]
    );
}

#[tokio::test]
async fn test_executable_content_is_stripped() {
    let content = offline_normalizer(SessionStore::new())
        .normalize(r#"<p onmouseover="steal()">Hi<script>steal()</script><!-- <img src="blob:http://localhost/a"> --></p><style>p { color: red }</style>"#)
        .await
        .unwrap();
    assert!(content.html.ends_with("<p>Hi</p></section>"));
    assert!(!content.html.contains("<!--"));
    assert_eq!(content.plain_text, "Hi");
}

// ============================================================================
// FORMULAS
// ============================================================================

#[tokio::test]
async fn test_formula_using_page_symbols_becomes_image() {
    let page = Snapshot::parse(PAGE_WITH_GLYPHS);
    let input = format!("<p>Let {FORMULA_USING_PAGE_GLYPH} be given.</p>");
    let content = offline_normalizer(SessionStore::new())
        .normalize_with_page(&input, Some(&page))
        .await
        .unwrap();

    assert!(!content.html.contains("<svg"));
    assert!(!content.html.contains("mjx-container"));
    let sources = image_sources(&content.html);
    assert_eq!(sources.len(), 1);
    assert!(sources[0].starts_with("data:image/png;base64,"));
    assert!(content.html.contains(r#"alt="x" width="50" height="20" style="vertical-align: middle;""#));
    assert_eq!(content.plain_text, "Let x be given.");
    assert_eq!(content.stats.formulas_rasterized, 1);
}

#[tokio::test]
async fn test_failed_formula_keeps_vector_markup() {
    let rasterizer = FormulaRasterizer::new(RasterOptions {
        timeout: Duration::ZERO,
        ..RasterOptions::default()
    });
    let input = r#"<p>a</p><mjx-container><svg width="1500px" height="1500px" aria-label="big"><rect width="1500" height="1500"></rect></svg></mjx-container><p>b</p>"#;
    let content = offline_normalizer(SessionStore::new())
        .with_rasterizer(rasterizer)
        .normalize(input)
        .await
        .unwrap();

    assert!(content.html.contains("<mjx-container><svg"));
    assert!(content.html.contains("<p>a</p>"));
    assert!(content.html.contains("<p>b</p>"));
    assert_eq!(content.stats.formulas_kept, 1);
    assert_eq!(content.warnings[0].kind, WarningKind::FormulaNotRasterized);
    assert_eq!(content.warnings[0].source, "big");
}

#[tokio::test]
async fn test_unresolvable_reference_keeps_formula_markup() {
    let input = format!("<p>Let {FORMULA_USING_PAGE_GLYPH} be given.</p>");
    let content = offline_normalizer(SessionStore::new())
        .normalize(&input)
        .await
        .unwrap();

    assert!(content.html.contains("<mjx-container"));
    assert!(content.html.contains(r##"<use href="#MJX-1-TEX-I-78">"##));
    assert!(image_sources(&content.html).is_empty());
    assert_eq!(content.stats.formulas_rasterized, 0);
    assert_eq!(content.stats.formulas_kept, 1);
    assert_eq!(content.warnings.len(), 1);
    assert_eq!(content.warnings[0].kind, WarningKind::FormulaNotRasterized);
    assert_eq!(content.warnings[0].source, "x");
    assert!(content.warnings[0].message.contains("MJX-1-TEX-I-78"));
    assert_eq!(content.plain_text, "Let x be given.");
}

#[tokio::test]
async fn test_oversized_formula_is_kept_without_painting() {
    let input = r#"<p>a</p><mjx-container><svg width="100000px" height="100000px" aria-label="huge"><rect width="10" height="10"></rect></svg></mjx-container>"#;
    let content = offline_normalizer(SessionStore::new())
        .normalize(input)
        .await
        .unwrap();

    assert!(content.html.contains("<mjx-container><svg"));
    assert_eq!(content.stats.formulas_kept, 1);
    assert_eq!(content.warnings[0].source, "huge");
    assert!(content.warnings[0].message.contains("100000x100000"));
}
