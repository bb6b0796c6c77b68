//! Temporary carriers for fallback clipboard methods
//!
//! The command-based methods cannot hand data to the clipboard directly; the
//! content is first materialized in a hidden file. A [`Scaffold`] owns that file
//! and removes it when dropped, whichever way the attempt ends.

use log::debug;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const PREFIX: &str = ".md2any-clip-";

pub struct Scaffold {
    file: NamedTempFile,
}

impl Scaffold {
    /// Write `contents` into a new hidden file, in `dir` or the system temp dir.
    pub fn materialize(dir: Option<&Path>, contents: &str, suffix: &str) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX).suffix(suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        debug!("Created clipboard scaffold {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// A fresh read handle positioned at the start, for use as a child's stdin.
    pub fn reader(&self) -> io::Result<File> {
        File::open(self.file.path())
    }
}

impl Drop for Scaffold {
    fn drop(&mut self) {
        debug!("Removing clipboard scaffold {}", self.file.path().display());
    }
}
