//! Clipboard fallback chain against real (harmless) copy commands
//!
//! `tee` stands in for a clipboard utility: it reads the payload from stdin like
//! `xclip` or `wl-copy` do, and leaves it somewhere the test can read.

use md2any_export::clipboard::{ClipboardOptions, CopyCommand};
use md2any_export::{ClipboardMethod, ClipboardPayload, ClipboardWriter};
use std::path::Path;

fn payload() -> ClipboardPayload {
    ClipboardPayload::new("<section><p>Hello</p></section>", "Hello")
}

fn tee(target: &Path) -> CopyCommand {
    CopyCommand::new("tee", vec![target.display().to_string()])
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_all_methods_failing_resolves_to_none() {
    let scaffolds = tempfile::tempdir().unwrap();
    let writer = ClipboardWriter::new(&ClipboardOptions {
        rich_api: false,
        editable_surface: true,
        plain_text: true,
        html_commands: vec![CopyCommand::new("false", vec![])],
        text_commands: vec![CopyCommand::new("false", vec![])],
        scaffold_dir: Some(scaffolds.path().to_path_buf()),
        ..ClipboardOptions::default()
    });

    let outcome = writer.write(&payload());

    assert_eq!(outcome.method, ClipboardMethod::None);
    assert!(!outcome.success);
    let methods: Vec<_> = outcome.failures.iter().map(|f| f.method).collect();
    assert_eq!(
        methods,
        vec![
            ClipboardMethod::RichApi,
            ClipboardMethod::EditableSurface,
            ClipboardMethod::PlainText
        ]
    );
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["method"], "none");
    assert_eq!(json["success"], false);
    assert_eq!(entries(scaffolds.path()), 0, "scaffolding must be removed");
}

#[test]
fn test_rich_failure_falls_back_to_editable_surface() {
    let dir = tempfile::tempdir().unwrap();
    let scaffolds = dir.path().join("scaffolds");
    std::fs::create_dir(&scaffolds).unwrap();
    let html_sink = dir.path().join("clipboard.html");
    let text_sink = dir.path().join("clipboard.txt");

    let writer = ClipboardWriter::new(&ClipboardOptions {
        rich_api: false,
        editable_surface: true,
        plain_text: true,
        html_commands: vec![tee(&html_sink)],
        text_commands: vec![tee(&text_sink)],
        scaffold_dir: Some(scaffolds.clone()),
        ..ClipboardOptions::default()
    });

    let outcome = writer.write(&payload());

    assert_eq!(outcome.method, ClipboardMethod::EditableSurface);
    assert!(outcome.success);
    assert_eq!(
        std::fs::read_to_string(&html_sink).unwrap(),
        "<section><p>Hello</p></section>"
    );
    assert!(!text_sink.exists(), "plain text must not be attempted");
    assert_eq!(entries(&scaffolds), 0);
}

#[test]
fn test_plain_text_is_the_last_resort() {
    let dir = tempfile::tempdir().unwrap();
    let text_sink = dir.path().join("clipboard.txt");
    let writer = ClipboardWriter::new(&ClipboardOptions {
        rich_api: false,
        editable_surface: true,
        plain_text: true,
        html_commands: vec![CopyCommand::new("md2any-missing-html-copy", vec![])],
        text_commands: vec![
            CopyCommand::new("false", vec![]),
            tee(&text_sink),
        ],
        scaffold_dir: Some(dir.path().to_path_buf()),
        ..ClipboardOptions::default()
    });

    let outcome = writer.write(&payload());

    assert_eq!(outcome.method, ClipboardMethod::PlainText);
    assert_eq!(std::fs::read_to_string(&text_sink).unwrap(), "Hello");
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[1].reason, "no copy command installed");
}
