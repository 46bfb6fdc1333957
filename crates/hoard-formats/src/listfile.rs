//! Listfile manifest text format
//!
//! Each line is `<FileDataID>;<path>`. Blank lines are skipped; any other
//! malformed line aborts the whole parse.

use thiserror::Error;

/// Manifest parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    /// Line does not split into exactly an ID and a path
    #[error("line {line}: expected '<id>;<path>', got {text:?}")]
    MalformedLine {
        /// 1-based line number
        line: usize,
        /// Line contents
        text: String,
    },

    /// ID is not an unsigned 32-bit integer
    #[error("line {line}: invalid FileDataID {value:?}")]
    InvalidId {
        /// 1-based line number
        line: usize,
        /// Offending token
        value: String,
    },
}

/// Parse a manifest into `(id, path)` pairs in file order
///
/// Paths are returned as written; callers normalize them.
pub fn parse_manifest(text: &str) -> Result<Vec<(u32, String)>, ManifestError> {
    let mut entries = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let mut tokens = line.split(';');
        let (Some(id), Some(path), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(ManifestError::MalformedLine {
                line: index + 1,
                text: line.to_string(),
            });
        };
        if path.is_empty() {
            return Err(ManifestError::MalformedLine {
                line: index + 1,
                text: line.to_string(),
            });
        }

        let id = id.trim().parse::<u32>().map_err(|_| ManifestError::InvalidId {
            line: index + 1,
            value: id.to_string(),
        })?;
        entries.push((id, path.to_string()));
    }

    Ok(entries)
}
