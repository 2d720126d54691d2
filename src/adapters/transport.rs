//! Line-oriented streams over local files or stdio.
//!
//! Locations are plain filesystem paths; `-` stands for stdin (readers) or
//! stdout (writers).

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs::{self, File};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader, BufWriter};

/// Location meaning stdin/stdout
pub const STDIO: &str = "-";

/// Readable stream of JSONL lines
pub type LineReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// Writable stream of JSONL lines
pub type LineWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Open a location for line-by-line reading
pub async fn open_reader(location: &str) -> Result<LineReader> {
    if location == STDIO {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = File::open(location)
        .await
        .with_context(|| format!("Failed to open input: {}", location))?;

    Ok(Box::new(BufReader::new(file)))
}

/// Open a location for writing, truncating any existing file
pub async fn open_writer(location: &str) -> Result<LineWriter> {
    if location == STDIO {
        return Ok(Box::new(BufWriter::new(tokio::io::stdout())));
    }

    if let Some(parent) = Path::new(location).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
    }

    let file = File::create(location)
        .await
        .with_context(|| format!("Failed to create output: {}", location))?;

    Ok(Box::new(BufWriter::new(file)))
}
