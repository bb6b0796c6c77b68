//! Shared configuration loader for the md2any export tools.
//!
//! `defaults/md2any.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`Md2anyConfig`].
//! The section structs convert into the option types of `md2any-export`.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use md2any_export::clipboard::{ClipboardOptions, CopyCommand};
use md2any_export::{LoaderOptions, RasterOptions, StyleContextExtractor};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TOML: &str = include_str!("../defaults/md2any.default.toml");

/// Top-level configuration consumed by md2any applications.
#[derive(Debug, Clone, Deserialize)]
pub struct Md2anyConfig {
    pub raster: RasterConfig,
    pub images: ImagesConfig,
    pub clipboard: ClipboardConfig,
    pub wrapper: WrapperConfig,
}

/// Formula rasterization.
#[derive(Debug, Clone, Deserialize)]
pub struct RasterConfig {
    pub timeout_ms: u64,
    pub supersample: f32,
    pub min_width: f32,
    pub min_height: f32,
    pub max_width: f32,
    pub max_height: f32,
    pub ex_px: f32,
    pub em_px: f32,
    pub max_inline_depth: usize,
}

impl From<&RasterConfig> for RasterOptions {
    fn from(config: &RasterConfig) -> Self {
        RasterOptions {
            timeout: Duration::from_millis(config.timeout_ms),
            supersample: config.supersample,
            min_width: config.min_width,
            min_height: config.min_height,
            max_width: config.max_width,
            max_height: config.max_height,
            ex_px: config.ex_px,
            em_px: config.em_px,
            max_inline_depth: config.max_inline_depth,
        }
    }
}

/// Image embedding.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    pub fetch_remote: bool,
    pub fetch_timeout_ms: u64,
    pub max_bytes: usize,
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl From<&ImagesConfig> for LoaderOptions {
    fn from(config: &ImagesConfig) -> Self {
        LoaderOptions {
            fetch_remote: config.fetch_remote,
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            max_bytes: config.max_bytes,
            base_dir: config.base_dir.clone(),
        }
    }
}

/// Clipboard method chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipboardConfig {
    pub rich_api: bool,
    pub rich_api_hold_ms: u64,
    pub editable_surface: bool,
    pub plain_text: bool,
    pub html_commands: Vec<String>,
    pub text_commands: Vec<String>,
}

impl From<&ClipboardConfig> for ClipboardOptions {
    fn from(config: &ClipboardConfig) -> Self {
        ClipboardOptions {
            rich_api: config.rich_api,
            rich_api_hold: Duration::from_millis(config.rich_api_hold_ms),
            editable_surface: config.editable_surface,
            plain_text: config.plain_text,
            html_commands: parse_commands(&config.html_commands),
            text_commands: parse_commands(&config.text_commands),
            scaffold_dir: None,
        }
    }
}

fn parse_commands(lines: &[String]) -> Vec<CopyCommand> {
    lines.iter().filter_map(|line| CopyCommand::parse(line)).collect()
}

/// Presentational wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct WrapperConfig {
    pub default_style: String,
}

impl From<&WrapperConfig> for StyleContextExtractor {
    fn from(config: &WrapperConfig) -> Self {
        StyleContextExtractor::new(config.default_style.clone())
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<Md2anyConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<Md2anyConfig, ConfigError> {
    Loader::new().build()
}
