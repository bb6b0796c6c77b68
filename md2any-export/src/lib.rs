//! Rich-content export for rendered md2any documents
//!
//!     This crate takes a document that has already been rendered to HTML (math typeset as
//!     inline SVG, images pointing at session handles, web URLs or data URIs) and turns it into
//!     a payload that can be pasted anywhere: the system clipboard or a standalone file.
//!
//!     TLDR:
//!         - Everything works on an owned snapshot (./dom.rs). The live document is never touched.
//!         - Formulas become PNG images; images become data URIs where possible.
//!         - One bad formula or image never fails an export. It is kept, dropped or flagged
//!           according to its kind, and reported as a warning.
//!         - The clipboard write walks a fixed chain of methods and stops at the first success.
//!
//! Architecture
//!
//!     The pipeline is split into small components, leaves first:
//!
//!     .
//!     ├── dom.rs              # Snapshot + DOM helpers over markup5ever_rcdom
//!     ├── style.rs            # StyleContextExtractor: the presentational wrapper
//!     ├── formula             # FormulaRasterizer: symbols, inlining, measuring, painting
//!     ├── images              # Source classification, ResourceLoader, SessionStore
//!     ├── sanitize.rs         # Executable content and stale session references
//!     ├── text.rs             # Plain-text rendition
//!     ├── normalize.rs        # ContentNormalizer: drives all of the above
//!     ├── clipboard           # ClipboardWriter and its strategies
//!     ├── payload.rs          # ClipboardPayload, warnings, stats
//!     └── publish.rs          # Exporter: normalize + deliver, one export at a time
//!
//!     The normalizer runs per-formula and per-image jobs concurrently and applies their
//!     results in document order. Painting runs on tokio's blocking pool under a timeout.
//!
//!     This is a pure lib: it does not print, read env vars or parse arguments. The
//!     md2any-cli crate is the shell around it and md2any-config provides the settings.
//!
//! Testing
//!
//!     tests
//!     ├── lib.rs              # includes the modules below
//!     ├── common/mod.rs       # fixtures and loaders
//!     ├── normalize/
//!     ├── formula/
//!     └── clipboard/
//!
//!     Rust does not discover tests in subdirectories by itself, so they are included from
//!     tests/lib.rs.

pub mod clipboard;
pub mod dom;
pub mod error;
pub mod formula;
pub mod images;
pub mod normalize;
pub mod payload;
pub mod publish;
pub mod sanitize;
pub mod style;
pub mod text;

pub use clipboard::{ClipboardMethod, ClipboardOptions, ClipboardOutcome, ClipboardWriter};
pub use dom::Snapshot;
pub use error::{ExportError, LoadError, RasterError, Result};
pub use formula::{FormulaRasterizer, RasterOptions};
pub use images::{DefaultLoader, LoaderOptions, Resource, ResourceLoader, SessionStore};
pub use normalize::ContentNormalizer;
pub use payload::{ClipboardPayload, ExportWarning, NormalizeStats, NormalizedContent, WarningKind};
pub use publish::{ExportReport, ExportRequest, Exporter};
pub use style::StyleContextExtractor;
