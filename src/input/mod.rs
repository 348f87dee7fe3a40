pub mod timestamp;

pub use timestamp::LineParser;

use crate::core::DataLine;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced while loading a replay log
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot read file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no replayable sentences in file")]
    EmptyOrUnparsable,
}

/// Load a replay log into file-ordered, offset-normalized records.
///
/// Line hygiene, in order: blank lines and `#` comments are skipped; a UTF-8
/// byte-order mark is stripped from the first content line; a trailing `\r`
/// is dropped (CRLF logs). After timestamp recovery, any bytes preceding the
/// first `$`/`!` marker in the recovered sentence are trimmed (loggers
/// sometimes prepend stray bytes); a sentence without either marker is kept
/// unmodified. Trimming must not touch the raw line, since a leading
/// `seconds,` timestamp sits before the marker and would be lost.
///
/// Each surviving line goes through [`LineParser`]; the seed of the first
/// parsed line becomes the base, so the first record's `timestamp_offset` is
/// exactly 0 and every later offset is relative to it. Records stay in file
/// order even when recovered timestamps are non-monotonic; the playback
/// delay computation clamps bad deltas instead of sorting them away.
pub fn load_log(path: &Path) -> Result<Vec<DataLine>, LoadError> {
    info!("loading replay log: {}", path.display());

    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut parser = LineParser::new();
    let mut lines = Vec::new();
    let mut base: Option<f64> = None;
    let mut first_content_line = true;

    for read in reader.lines() {
        let raw = read.map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = raw.strip_suffix('\r').unwrap_or(&raw).to_string();

        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }

        let mut line = raw.as_str();
        if first_content_line {
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                debug!("stripped UTF-8 BOM");
                line = stripped;
            }
            first_content_line = false;
        }

        let (sentence, seed) = parser.parse(line);

        // Trim stray bytes before the sentence start marker. This runs on
        // the recovered sentence, after parsing, so a leading numeric
        // timestamp is still seen by the parser.
        let sentence = match sentence.find(['$', '!']) {
            Some(start) if start > 0 => sentence[start..].to_string(),
            _ => sentence,
        };

        let base_seed = *base.get_or_insert(seed);
        lines.push(DataLine::new(sentence, seed - base_seed));
    }

    if lines.is_empty() {
        return Err(LoadError::EmptyOrUnparsable);
    }

    info!("loaded {} sentences from {}", lines.len(), path.display());
    Ok(lines)
}
