//! Stdin/stdout-aware file helpers.
//!
//! Every file argument of the CLI accepts `-` for the standard stream, so
//! the open helpers return trait objects and tag errors with the offending
//! path.

use std::fs::File;
use std::io::{BufWriter, Read, Write};

use anyhow::{Context, Result};

/// Filename standing for stdin or stdout.
pub const STDIO_MARK: &str = "-";

/// Opens `path` for reading; `-` selects stdin.
pub fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == STDIO_MARK {
        Ok(Box::new(std::io::stdin()))
    } else {
        let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
        Ok(Box::new(file))
    }
}

/// Opens `path` for (buffered) writing; `-` selects stdout.
pub fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == STDIO_MARK {
        Ok(Box::new(std::io::stdout()))
    } else {
        let file = File::create(path).with_context(|| format!("failed to create {path}"))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}
