//! CSV loading.
//!
//! Readers are tried in order until one succeeds: standard quote handling,
//! quotes read as plain characters, and finally a pass over pre-cleaned
//! content that collapses doubled quotes and drops blank lines.

use crate::error::{DoctorError, Result};
use polars::prelude::*;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rows sampled for schema inference.
const SCHEMA_INFERENCE_ROWS: usize = 100;

/// Load a headed CSV file into a DataFrame.
///
/// # Errors
///
/// - [`DoctorError::Io`] when the file does not exist or cannot be read
/// - [`DoctorError::InvalidDataset`] when the parsed frame has no columns
/// - [`DoctorError::Polars`] when every reader fails
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(DoctorError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }

    let df = read_with_fallbacks(path)?;
    if df.width() == 0 {
        return Err(DoctorError::InvalidDataset(format!(
            "{} has no columns",
            path.display()
        )));
    }

    info!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// One way of parsing the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadStrategy {
    /// `"` opens a quoted field.
    Quoted,
    /// Quote characters are ordinary field content.
    Unquoted,
    /// Quoted parsing over [`clean_csv_content`] output.
    Cleaned,
}

impl ReadStrategy {
    const ALL: [ReadStrategy; 3] = [Self::Quoted, Self::Unquoted, Self::Cleaned];

    fn read(self, path: &Path) -> Result<DataFrame> {
        let options = CsvReadOptions::default()
            .with_infer_schema_length(Some(SCHEMA_INFERENCE_ROWS))
            .with_has_header(true);

        let df = match self {
            Self::Quoted => options
                .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
                .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
                .finish()?,
            Self::Unquoted => options
                .with_parse_options(CsvParseOptions::default().with_quote_char(None))
                .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
                .finish()?,
            Self::Cleaned => {
                let content = std::fs::read_to_string(path)?;
                options
                    .into_reader_with_file_handle(Cursor::new(clean_csv_content(&content)))
                    .finish()?
            }
        };
        Ok(df)
    }
}

fn read_with_fallbacks(path: &Path) -> Result<DataFrame> {
    first_successful(path, &ReadStrategy::ALL, ReadStrategy::read)
}

/// Try `strategies` in order and return the first frame read. The last
/// strategy's error is returned when all fail.
fn first_successful<F>(path: &Path, strategies: &[ReadStrategy], read: F) -> Result<DataFrame>
where
    F: Fn(ReadStrategy, &Path) -> Result<DataFrame>,
{
    let mut last_error = None;
    for &strategy in strategies {
        match read(strategy, path) {
            Ok(df) => {
                if last_error.is_some() {
                    debug!("Read {} with {:?} parsing", path.display(), strategy);
                }
                return Ok(df);
            }
            Err(e) => {
                debug!("{:?} CSV read of {} failed: {}", strategy, path.display(), e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| DoctorError::InvalidConfig("no CSV read strategy given".to_string()))
        .with_context(format!("Parsing {}", path.display())))
}

/// Collapse tripled and doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
