// Command-line interface for md2any
//
// This binary drives the export pipeline over documents that were already rendered to HTML.
// Rendering markdown is somebody else's job: point md2any at the rendered fragment (and, when
// formulas share a page-level glyph cache, at a snapshot of the whole page).
//
// Usage:
//  md2any normalize <input.html> [--page <page.html>] [--json]    - Print the normalized fragment (or the full report)
//  md2any copy <input.html> [--page <page.html>] [--json]         - Normalize and put the result on the clipboard
//  md2any export <input.html> -o <out.html> [--title <title>]     - Write a standalone HTML document
//
// Global options:
//  --config <path>              Layer a TOML file over the built-in defaults (md2any.toml in the
//                               working directory is picked up automatically)
//  --session <handle>=<file>    Register the bytes of <file> under a blob: or img:// handle (repeatable). Rendered
//                               documents reference pasted images through such handles.
//
// Logging goes to stderr through env_logger; set RUST_LOG=debug to follow each formula and image.

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::debug;
use md2any_config::{Loader, Md2anyConfig};
use md2any_export::{
    ClipboardOptions, ClipboardWriter, ContentNormalizer, DefaultLoader, ExportReport,
    ExportRequest, Exporter, FormulaRasterizer, LoaderOptions, RasterOptions, Resource,
    SessionStore, Snapshot, StyleContextExtractor,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Rendered HTML fragment to export")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn page_arg() -> Arg {
    Arg::new("page")
        .long("page")
        .help("Snapshot of the whole page, for formulas that use shared glyph definitions")
        .value_hint(ValueHint::FilePath)
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Print the full report as JSON")
        .action(ArgAction::SetTrue)
}

fn build_cli() -> Command {
    Command::new("md2any")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Normalize rendered documents for pasting and export")
        .long_about(
            "md2any turns a rendered HTML fragment into a self-contained payload.\n\n\
             Formulas are rasterized to PNG, images are embedded as data URIs, scripts are\n\
             stripped, and the result is wrapped in the document's own container style.\n\n\
             Examples:\n  \
             md2any normalize rendered.html --page page.html\n  \
             md2any copy rendered.html --session blob:app/1=photo.png\n  \
             md2any export rendered.html -o out.html --title \"Release notes\"",
        )
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to an md2any.toml configuration file")
                .global(true)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("session")
                .long("session")
                .value_name("HANDLE=FILE")
                .help("Register FILE under a blob: or img:// handle (repeatable)")
                .global(true)
                .action(ArgAction::Append),
        )
        .subcommand(
            Command::new("normalize")
                .about("Print the normalized fragment")
                .arg(input_arg())
                .arg(page_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("copy")
                .about("Normalize and copy to the system clipboard")
                .arg(input_arg())
                .arg(page_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("export")
                .about("Write a standalone HTML document")
                .arg(input_arg())
                .arg(page_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output file path")
                        .required(true)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("title")
                        .long("title")
                        .help("Document title (defaults to \"md2any export\")"),
                )
                .arg(json_arg()),
        )
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = build_cli().get_matches();
    let config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));

    let sessions = SessionStore::new();
    if let Some(entries) = matches.get_many::<String>("session") {
        for entry in entries {
            if let Err(e) = register_session(&sessions, entry) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        debug!("Registered {} session handle(s)", sessions.len());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to start runtime: {e}");
            std::process::exit(1);
        });

    match matches.subcommand() {
        Some(("normalize", sub_matches)) => {
            let exporter = build_exporter(&config, sessions, sub_matches);
            runtime.block_on(handle_normalize_command(&exporter, sub_matches));
        }
        Some(("copy", sub_matches)) => {
            let exporter = build_exporter(&config, sessions, sub_matches);
            runtime.block_on(handle_copy_command(&exporter, sub_matches));
        }
        Some(("export", sub_matches)) => {
            let exporter = build_exporter(&config, sessions, sub_matches);
            runtime.block_on(handle_export_command(&exporter, sub_matches));
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

/// Inputs shared by every subcommand.
struct Inputs {
    html: String,
    page: Option<Snapshot>,
}

fn read_inputs(sub_matches: &ArgMatches) -> Inputs {
    let input = required(sub_matches, "input");
    let html = fs::read_to_string(input).unwrap_or_else(|e| {
        eprintln!("Error reading file '{input}': {e}");
        std::process::exit(1);
    });
    let page = sub_matches.get_one::<String>("page").map(|path| {
        let page_html = fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading file '{path}': {e}");
            std::process::exit(1);
        });
        Snapshot::parse(&page_html)
    });
    Inputs { html, page }
}

async fn handle_normalize_command(exporter: &Exporter, sub_matches: &ArgMatches) {
    let inputs = read_inputs(sub_matches);
    let content = exporter
        .normalizer()
        .normalize_with_page(&inputs.html, inputs.page.as_ref())
        .await
        .unwrap_or_else(|e| fail(e));

    if sub_matches.get_flag("json") {
        print_json(&content);
    } else {
        report_warnings(&content.warnings);
        println!("{}", content.html);
    }
}

async fn handle_copy_command(exporter: &Exporter, sub_matches: &ArgMatches) {
    let inputs = read_inputs(sub_matches);
    let report = exporter
        .export_to_clipboard(request(&inputs, None))
        .await
        .unwrap_or_else(|e| fail(e));
    finish(&report, sub_matches);
}

async fn handle_export_command(exporter: &Exporter, sub_matches: &ArgMatches) {
    let inputs = read_inputs(sub_matches);
    let output = required(sub_matches, "output");
    let title = sub_matches.get_one::<String>("title").map(|s| s.as_str());
    let report = exporter
        .export_to_file(request(&inputs, title), output)
        .await
        .unwrap_or_else(|e| fail(e));
    finish(&report, sub_matches);
}

fn request<'a>(inputs: &'a Inputs, title: Option<&'a str>) -> ExportRequest<'a> {
    let mut request = ExportRequest::new(&inputs.html);
    if let Some(page) = &inputs.page {
        request = request.with_page(page);
    }
    if let Some(title) = title {
        request = request.with_title(title);
    }
    request
}

fn finish(report: &ExportReport, sub_matches: &ArgMatches) {
    if sub_matches.get_flag("json") {
        print_json(report);
        return;
    }
    report_warnings(&report.warnings);
    match (&report.method, &report.output) {
        (Some(method), _) => println!("Copied to clipboard ({method})"),
        (None, Some(path)) => println!("Wrote {}", path.display()),
        (None, None) => {}
    }
    if report.is_partial() {
        println!("Some content was kept in a degraded form; see the warnings above.");
    }
}

fn report_warnings(warnings: &[md2any_export::ExportWarning]) {
    for warning in warnings {
        eprintln!("warning: {}: {}", warning.source, warning.message);
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Serialization error: {e}");
            std::process::exit(1);
        }
    }
}

fn fail(e: md2any_export::ExportError) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}

fn required<'a>(sub_matches: &'a ArgMatches, id: &str) -> &'a str {
    sub_matches
        .get_one::<String>(id)
        .map(|s| s.as_str())
        .unwrap_or_else(|| {
            eprintln!("Error: missing required argument '{id}'");
            std::process::exit(1);
        })
}

/// Parse `HANDLE=FILE` and register the file's bytes under `HANDLE`.
///
/// The split happens at the last `=`, so handles may contain `=` but file names may not.
fn register_session(sessions: &SessionStore, entry: &str) -> Result<(), String> {
    let (handle, path) = entry
        .rsplit_once('=')
        .filter(|(handle, path)| !handle.is_empty() && !path.is_empty())
        .ok_or_else(|| format!("invalid --session '{entry}', expected HANDLE=FILE"))?;
    let bytes = fs::read(path).map_err(|e| format!("reading session file '{path}': {e}"))?;
    sessions.register(handle, Resource::new(bytes, None));
    Ok(())
}

fn build_exporter(config: &Md2anyConfig, sessions: SessionStore, sub_matches: &ArgMatches) -> Exporter {
    let mut loader_options = LoaderOptions::from(&config.images);
    if loader_options.base_dir.is_none() {
        // Relative image paths are resolved next to the input document.
        loader_options.base_dir = Path::new(required(sub_matches, "input"))
            .parent()
            .map(Path::to_path_buf);
    }

    let normalizer = ContentNormalizer::new(Arc::new(DefaultLoader::new(sessions, loader_options)))
        .with_rasterizer(FormulaRasterizer::new(RasterOptions::from(&config.raster)))
        .with_style_extractor(StyleContextExtractor::from(&config.wrapper));
    let writer = ClipboardWriter::new(&ClipboardOptions::from(&config.clipboard));
    Exporter::new(normalizer, writer)
}

fn load_cli_config(explicit_path: Option<&str>) -> Md2anyConfig {
    let loader = Loader::new().with_optional_file("md2any.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}
