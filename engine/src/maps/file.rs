//! CSV/TSV lookup tables with encoding auto-detection.
//!
//! Each row contributes one `key -> value` entry taken from two configurable
//! columns. Rows too short for either column are skipped.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MapError, MapResult};
use crate::mapping::Mapping;

/// How a map file is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMapOptions {
    /// Field separator.
    #[serde(default = "default_separator")]
    pub sep_char: char,

    /// 0-based column holding the key.
    #[serde(default)]
    pub key_column: usize,

    /// 0-based column holding the value.
    #[serde(default = "default_value_column")]
    pub value_column: usize,

    /// Encoding label (auto-detect if not specified).
    #[serde(default)]
    pub encoding: Option<String>,
}

fn default_separator() -> char {
    '\t'
}

fn default_value_column() -> usize {
    1
}

impl Default for FileMapOptions {
    fn default() -> Self {
        Self {
            sep_char: default_separator(),
            key_column: 0,
            value_column: default_value_column(),
            encoding: None,
        }
    }
}

impl FileMapOptions {
    pub fn with_separator(mut self, sep_char: char) -> Self {
        self.sep_char = sep_char;
        self
    }

    pub fn with_columns(mut self, key_column: usize, value_column: usize) -> Self {
        self.key_column = key_column;
        self.value_column = value_column;
        self
    }

    /// The separator as a CSV delimiter byte.
    pub fn delimiter(&self) -> MapResult<u8> {
        if self.sep_char.is_ascii() {
            Ok(self.sep_char as u8)
        } else {
            Err(MapError::InvalidSeparator(self.sep_char))
        }
    }
}

/// Decode the bytes of a map file.
///
/// A configured encoding label wins; without one, valid UTF-8 is used as is
/// and anything else goes by the chardet guess (Windows-1252 if unknown).
/// Returns the text and the encoding it was decoded with.
pub fn decode_map_bytes<'a>(bytes: &'a [u8], label: Option<&str>) -> (Cow<'a, str>, &'static Encoding) {
    let encoding = match label {
        Some(label) => Encoding::for_label(label.trim().as_bytes()).unwrap_or(UTF_8),
        None if std::str::from_utf8(bytes).is_ok() => UTF_8,
        None => {
            let (charset, _, _) = chardet::detect(bytes);
            Encoding::for_label(charset.as_bytes()).unwrap_or(WINDOWS_1252)
        }
    };
    let (text, used, _) = encoding.decode(bytes);
    (text, used)
}

/// Resolve a map path against an optional base directory.
pub fn resolve_map_path(path: &str, base_dir: Option<&Path>) -> MapResult<PathBuf> {
    let candidate = Path::new(path);
    let resolved = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        match base_dir {
            Some(dir) => dir.join(candidate),
            None => return Err(MapError::RelativePath(path.to_string())),
        }
    };

    if resolved.is_file() {
        Ok(resolved)
    } else {
        Err(MapError::FileNotFound(resolved.display().to_string()))
    }
}

/// Load a map file into a [`Mapping`].
pub fn load_file_map(path: &Path, options: &FileMapOptions) -> MapResult<Mapping> {
    let delimiter = options.delimiter()?;
    let location = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| MapError::Io {
        path: location.clone(),
        source,
    })?;

    let (content, encoding) = decode_map_bytes(&bytes, options.encoding.as_deref());
    let mapping = read_rows(&content, delimiter, options).map_err(|source| MapError::Csv {
        path: location.clone(),
        source,
    })?;

    debug!(path = %location, encoding = encoding.name(), entries = mapping.len(), "Loaded file map");
    Ok(mapping)
}

/// Parse separated text into a [`Mapping`].
pub fn parse_map(content: &str, options: &FileMapOptions) -> MapResult<Mapping> {
    read_rows(content, options.delimiter()?, options).map_err(|source| MapError::Csv {
        path: String::new(),
        source,
    })
}

fn read_rows(content: &str, delimiter: u8, options: &FileMapOptions) -> Result<Mapping, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(content.as_bytes());

    let mut mapping = Mapping::new();
    for row in reader.records() {
        let row = row?;
        if let (Some(key), Some(value)) = (row.get(options.key_column), row.get(options.value_column)) {
            mapping.put(key, value.to_string());
        }
    }
    Ok(mapping)
}
