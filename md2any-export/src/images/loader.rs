//! Resource loading for image embedding
//!
//! The normalizer never reads bytes itself; it goes through a [`ResourceLoader`].
//! [`DefaultLoader`] covers the usual sources: transient session handles registered
//! by the paste subsystem, local files, and (with the `remote-fetch` feature) HTTP.

use crate::error::LoadError;
use futures::future::BoxFuture;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use url::Url;

/// Bytes of an image plus the media type the source declared, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl Resource {
    pub fn new(bytes: Vec<u8>, mime: Option<String>) -> Self {
        Self { bytes, mime }
    }

    /// Media type for a data URI: a declared `image/*` type, else sniffed from the
    /// bytes, else `application/octet-stream`.
    pub fn media_type(&self) -> String {
        if let Some(mime) = self
            .mime
            .as_deref()
            .map(|m| m.split(';').next().unwrap_or(m).trim())
            .filter(|m| m.starts_with("image/"))
        {
            return mime.to_string();
        }
        image::guess_format(&self.bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string())
    }
}

/// Source of image bytes for the normalizer.
pub trait ResourceLoader: Send + Sync {
    /// Read the data behind a transient session handle (`blob:` URL or `img:` id).
    fn read_session<'a>(&'a self, handle: &'a str) -> BoxFuture<'a, Result<Resource, LoadError>>;

    /// Fetch a remote or local image reference.
    fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Resource, LoadError>>;
}

/// In-memory table of session handles. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<String, Resource>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register data under a handle, replacing any previous entry.
    pub fn register(&self, handle: impl Into<String>, resource: Resource) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(handle.into(), resource);
        }
    }

    /// Invalidate a handle. Later reads fail like an expired browser handle.
    pub fn revoke(&self, handle: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(handle);
        }
    }

    pub fn get(&self, handle: &str) -> Option<Resource> {
        self.entries.read().ok()?.get(handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settings for [`DefaultLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderOptions {
    /// Whether `http(s)` references are fetched at all.
    pub fetch_remote: bool,
    pub fetch_timeout: Duration,
    /// Largest resource that will be embedded.
    pub max_bytes: usize,
    /// Directory relative references resolve against.
    pub base_dir: Option<PathBuf>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            fetch_remote: true,
            fetch_timeout: Duration::from_secs(10),
            max_bytes: 10 * 1024 * 1024,
            base_dir: None,
        }
    }
}

/// Loader backed by a [`SessionStore`], the filesystem and an HTTP client.
pub struct DefaultLoader {
    sessions: SessionStore,
    options: LoaderOptions,
    #[cfg(feature = "remote-fetch")]
    client: Option<reqwest::Client>,
}

impl DefaultLoader {
    pub fn new(sessions: SessionStore, options: LoaderOptions) -> Self {
        #[cfg(feature = "remote-fetch")]
        let client = reqwest::Client::builder()
            .timeout(options.fetch_timeout)
            .build()
            .map_err(|e| log::warn!("HTTP client unavailable, remote images stay linked: {e}"))
            .ok();
        Self {
            sessions,
            options,
            #[cfg(feature = "remote-fetch")]
            client,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn check_size(&self, url: &str, len: usize) -> Result<(), LoadError> {
        if len > self.options.max_bytes {
            Err(LoadError::TooLarge {
                url: url.to_string(),
                limit: self.options.max_bytes,
            })
        } else {
            Ok(())
        }
    }

    async fn read_file(&self, url: &str, path: &Path) -> Result<Resource, LoadError> {
        let fetch_error = |e: std::io::Error| LoadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let file = tokio::fs::File::open(path).await.map_err(fetch_error)?;
        let declared = file.metadata().await.map_err(fetch_error)?.len();
        self.check_size(url, usize::try_from(declared).unwrap_or(usize::MAX))?;

        // The file may grow between stat and read; never buffer past the limit.
        let mut bytes = Vec::with_capacity(declared as usize);
        file.take(self.options.max_bytes as u64 + 1)
            .read_to_end(&mut bytes)
            .await
            .map_err(fetch_error)?;
        self.check_size(url, bytes.len())?;
        Ok(Resource::new(bytes, None))
    }

    #[cfg(feature = "remote-fetch")]
    async fn fetch_http(&self, url: &str) -> Result<Resource, LoadError> {
        let fetch_error = |reason: String| LoadError::Fetch {
            url: url.to_string(),
            reason,
        };
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| fetch_error("no HTTP client".to_string()))?;
        let mut response = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_error(e.to_string()))?;
        if let Some(len) = response.content_length() {
            self.check_size(url, usize::try_from(len).unwrap_or(usize::MAX))?;
        }
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
        {
            self.check_size(url, bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(Resource::new(bytes, mime))
    }

    #[cfg(not(feature = "remote-fetch"))]
    async fn fetch_http(&self, url: &str) -> Result<Resource, LoadError> {
        Err(LoadError::Unsupported(url.to_string()))
    }
}

impl ResourceLoader for DefaultLoader {
    fn read_session<'a>(&'a self, handle: &'a str) -> BoxFuture<'a, Result<Resource, LoadError>> {
        Box::pin(async move {
            self.sessions
                .get(handle)
                .ok_or_else(|| LoadError::UnknownHandle(handle.to_string()))
        })
    }

    fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Resource, LoadError>> {
        Box::pin(async move {
            let target = resolve_reference(url, self.options.base_dir.as_deref())
                .ok_or_else(|| LoadError::Unsupported(url.to_string()))?;
            debug!("Fetching image {url}");
            match target {
                Reference::Http(absolute) if self.options.fetch_remote => {
                    self.fetch_http(absolute.as_str()).await
                }
                Reference::Http(_) => Err(LoadError::Unsupported(url.to_string())),
                Reference::File(path) => self.read_file(url, &path).await,
            }
        })
    }
}

/// Where a non-session, non-embedded reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Http(Url),
    File(PathBuf),
}

/// Resolve an image reference to an HTTP URL or a local path.
pub fn resolve_reference(reference: &str, base_dir: Option<&Path>) -> Option<Reference> {
    let reference = reference.trim();
    if let Some(rest) = reference.strip_prefix("//") {
        return Url::parse(&format!("https://{rest}")).ok().map(Reference::Http);
    }
    match Url::parse(reference) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Some(Reference::Http(url)),
            "file" => url.to_file_path().ok().map(Reference::File),
            _ => None,
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = reference.split(['?', '#']).next().unwrap_or(reference);
            base_dir.map(|dir| Reference::File(dir.join(path)))
        }
        Err(_) => None,
    }
}
