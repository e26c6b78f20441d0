//! Tabular test-case sheets, read from spreadsheets or CSV files.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader};
use thiserror::Error;

/// Errors that can occur while reading a sheet.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The sheet's path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The CSV content is malformed.
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    /// The workbook could not be parsed.
    #[error("malformed workbook: {0}")]
    Workbook(#[from] calamine::Error),
    /// The workbook has no worksheet.
    #[error("{0} has no worksheet")]
    NoWorksheet(PathBuf),
}

/// The first worksheet of a workbook, with every cell rendered as text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sheet {
    /// Cells of the first row.
    pub headers: Vec<String>,
    /// Remaining rows. Rows may be shorter than the header.
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Reads a sheet, choosing the format by file extension.
    ///
    /// `.csv` files are parsed as CSV, everything else is handed to
    /// `calamine`, which understands `.xlsx`, `.xlsm`, `.xls` and `.ods`.
    /// This is blocking I/O.
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            let file = File::open(path).map_err(|source| SheetError::Io {
                path: path.to_owned(),
                source,
            })?;
            return Self::from_csv(file);
        }

        let mut workbook = calamine::open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SheetError::NoWorksheet(path.to_owned()))??;
        Ok(Self::from_range(&range))
    }

    /// Parses CSV content whose first record is the header.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, SheetError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.iter().map(str::to_owned).collect();
        let rows = reader
            .records()
            .map(|record| {
                record.map(|record| record.iter().map(str::to_owned).collect())
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { headers, rows })
    }

    fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range.rows().map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    cell => cell.to_string(),
                })
                .collect::<Vec<_>>()
        });
        let headers = rows.next().unwrap_or_default();
        Self {
            headers,
            rows: rows.collect(),
        }
    }

    /// Returns the index of the first column whose trimmed, lower-cased
    /// header is one of `names`.
    pub fn find_column(&self, names: &[&str]) -> Option<usize> {
        self.headers.iter().position(|header| {
            let header = header.trim().to_lowercase();
            names.contains(&header.as_str())
        })
    }

    /// Returns the rows whose cell in `column` matches `value`, ignoring
    /// case and surrounding whitespace.
    pub fn rows_matching<'a>(
        &'a self,
        column: usize,
        value: &str,
    ) -> impl Iterator<Item = &'a [String]> + 'a {
        let value = value.trim().to_uppercase();
        self.rows
            .iter()
            .filter(move |row| {
                row.get(column)
                    .is_some_and(|cell| cell.trim().to_uppercase() == value)
            })
            .map(Vec::as_slice)
    }

    /// Renders a row as `header: value` lines, skipping empty cells.
    pub fn describe_row(&self, row: &[String]) -> String {
        self.headers
            .iter()
            .zip(row)
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(header, cell)| format!("{header}: {cell}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
