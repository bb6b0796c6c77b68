//! Image source normalization
//!
//! Rendered documents reference images in three ways: transient session handles
//! (`blob:` URLs, or `img:` ids of the editor's pasted-image store), embedded `data:`
//! URIs, and everything else (web URLs, local paths). Only embedded images survive
//! a trip through the clipboard, so the export converts whatever it can into data
//! URIs and degrades predictably for the rest:
//!
//! - a session handle that cannot be read is dropped (it would be a dead link in
//!   any paste target);
//! - a remote image that cannot be fetched keeps its URL and is flagged;
//! - embedded images pass through untouched.

mod loader;

pub use loader::{
    resolve_reference, DefaultLoader, LoaderOptions, Reference, Resource, ResourceLoader,
    SessionStore,
};

use crate::dom;
use crate::error::LoadError;
use crate::formula::data_uri;
use markup5ever_rcdom::Handle;

/// Attribute set on remote images that stayed linked.
pub const WARNING_ATTR: &str = "data-export-warning";

/// Where an image `src` points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSourceKind {
    /// `blob:` or `img:` handle, valid only inside the current session.
    SessionHandle,
    /// `data:` URI, already self-contained.
    Embedded,
    /// Anything else.
    Remote,
}

/// Classify an image source by its scheme.
pub fn classify(src: &str) -> ImageSourceKind {
    let src = src.trim_start();
    let scheme = src
        .split_once(':')
        .map(|(scheme, _)| scheme.to_ascii_lowercase());
    match scheme.as_deref() {
        Some("blob" | "img") => ImageSourceKind::SessionHandle,
        Some("data") => ImageSourceKind::Embedded,
        _ => ImageSourceKind::Remote,
    }
}

/// What happened to one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedOutcome {
    /// The source was replaced with this data URI.
    Embedded(String),
    /// Already embedded; nothing to do.
    Unchanged,
    /// Session data was unreadable; the image must go.
    Dropped(LoadError),
    /// Remote data was unreachable; the URL stays.
    KeptRemote(LoadError),
}

/// Resolve one image source through `loader`.
pub async fn embed(loader: &dyn ResourceLoader, src: &str) -> EmbedOutcome {
    match classify(src) {
        ImageSourceKind::Embedded => EmbedOutcome::Unchanged,
        ImageSourceKind::SessionHandle => match loader.read_session(src.trim()).await {
            Ok(resource) => EmbedOutcome::Embedded(to_data_uri(&resource)),
            Err(err) => EmbedOutcome::Dropped(err),
        },
        ImageSourceKind::Remote => match loader.fetch_remote(src).await {
            Ok(resource) => EmbedOutcome::Embedded(to_data_uri(&resource)),
            Err(err) => EmbedOutcome::KeptRemote(err),
        },
    }
}

fn to_data_uri(resource: &Resource) -> String {
    data_uri(&resource.media_type(), &resource.bytes)
}

/// Make an image scale with its container: cap the width at 100%, let the height
/// follow, and drop any fixed `height` attribute.
pub fn make_responsive(img: &Handle) {
    let existing = dom::get_attr(img, "style").unwrap_or_default();
    let mut declarations: Vec<String> = existing
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl
                .split_once(':')
                .map(|(p, _)| p.trim().to_ascii_lowercase())
                .unwrap_or_default();
            property != "max-width" && property != "height"
        })
        .map(str::to_string)
        .collect();
    declarations.push("max-width: 100%".to_string());
    declarations.push("height: auto".to_string());
    dom::set_attr(img, "style", &format!("{};", declarations.join("; ")));
    dom::remove_attr(img, "height");
}
