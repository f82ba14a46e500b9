//! Batch input files: one tracking code per line, read in chunks small
//! enough for a single asynchronous registration.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RastroError, Result};

/// Largest number of codes the API accepts in one registration.
pub const BATCH_SIZE: usize = 1000;

static TRACKING_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2}\d{9}[A-Za-z]{2}$").expect("tracking code pattern is valid"));

/// Two letters, nine digits, two letters.
pub fn is_valid_code(code: &str) -> bool {
    TRACKING_CODE.is_match(code)
}

/// Reads `path` and splits it into validated chunks of at most [`BATCH_SIZE`] codes.
pub fn read_batches(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| RastroError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    chunk_lines(&content)
}

/// Splits file content into chunks, preserving line order. The first line
/// that is not a tracking code aborts the whole read.
pub fn chunk_lines(content: &str) -> Result<Vec<Vec<String>>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut batches = Vec::with_capacity(lines.len().div_ceil(BATCH_SIZE));

    for (index, chunk) in lines.chunks(BATCH_SIZE).enumerate() {
        validate(chunk, index * BATCH_SIZE)?;
        batches.push(chunk.iter().map(|line| line.to_string()).collect());
    }

    Ok(batches)
}

fn validate(chunk: &[&str], offset: usize) -> Result<()> {
    match chunk.iter().position(|code| !is_valid_code(code)) {
        Some(position) => Err(RastroError::Validation {
            code: chunk[position].to_string(),
            line: offset + position + 1,
        }),
        None => Ok(()),
    }
}
