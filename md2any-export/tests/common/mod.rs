//! Shared fixtures for the integration tests.

use futures::future::BoxFuture;
use image::{ImageFormat, Rgba, RgbaImage};
use md2any_export::{
    ContentNormalizer, DefaultLoader, LoadError, LoaderOptions, Resource, ResourceLoader,
    SessionStore,
};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// A 2x2 red PNG.
pub static TINY_PNG: Lazy<Vec<u8>> = Lazy::new(|| {
    let image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
});

/// Page-level glyph cache in the shape typesetters emit: a hidden svg whose `<defs>`
/// hold every glyph, referenced from formulas elsewhere on the page.
pub const PAGE_WITH_GLYPHS: &str = r#"<html><body>
<svg style="display: none"><defs><path id="MJX-1-TEX-I-78" d="M0 0 L10 0 L10 10 Z"></path></defs></svg>
<div id="preview"></div>
</body></html>"#;

/// A formula whose only shape is a reference into [`PAGE_WITH_GLYPHS`].
pub const FORMULA_USING_PAGE_GLYPH: &str = r##"<mjx-container class="MathJax" jax="SVG"><svg width="2ex" height="2ex" viewBox="0 0 10 10" aria-label="x"><g fill="black"><use href="#MJX-1-TEX-I-78"></use></g></svg></mjx-container>"##;

/// Normalizer that never touches the network.
pub fn offline_normalizer(store: SessionStore) -> ContentNormalizer {
    let options = LoaderOptions {
        fetch_remote: false,
        ..LoaderOptions::default()
    };
    ContentNormalizer::new(Arc::new(DefaultLoader::new(store, options)))
}

/// Loader serving fixed resources, each after its own delay.
#[derive(Default)]
pub struct ScriptedLoader {
    entries: HashMap<String, (Duration, Resource)>,
}

impl ScriptedLoader {
    pub fn with(mut self, src: &str, delay_ms: u64, bytes: &[u8]) -> Self {
        self.entries.insert(
            src.to_string(),
            (
                Duration::from_millis(delay_ms),
                Resource::new(bytes.to_vec(), Some("image/png".into())),
            ),
        );
        self
    }

    async fn serve(&self, src: &str) -> Result<Resource, LoadError> {
        let (delay, resource) = self
            .entries
            .get(src)
            .cloned()
            .ok_or_else(|| LoadError::UnknownHandle(src.to_string()))?;
        tokio::time::sleep(delay).await;
        Ok(resource)
    }
}

impl ResourceLoader for ScriptedLoader {
    fn read_session<'a>(&'a self, handle: &'a str) -> BoxFuture<'a, Result<Resource, LoadError>> {
        Box::pin(self.serve(handle))
    }

    fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Resource, LoadError>> {
        Box::pin(async move {
            self.serve(url).await.map_err(|_| LoadError::Fetch {
                url: url.to_string(),
                reason: "unreachable".to_string(),
            })
        })
    }
}

/// Drive a future to completion outside `#[tokio::test]` (e.g. inside proptest).
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}
