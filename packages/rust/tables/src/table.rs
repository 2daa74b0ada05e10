//! Column-ordered result tables.

use std::path::Path;

use tracing::debug;

use dbbuilder_shared::{DbBuilderError, Result};

use crate::delimited::{DEFAULT_DELIMITER, parse_records, write_record};

/// An ordered set of named columns of equal length.
///
/// Row `i` of the persisted form is the `i`-th value of every column, in
/// column insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    columns: Vec<(String, Vec<String>)>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table with the given headers, to be filled with [`push_row`](Self::push_row).
    pub fn with_headers<I, S>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for header in headers {
            table.insert_column(header, Vec::new())?;
        }
        Ok(table)
    }

    /// Append a column. Its length must match the existing columns and its
    /// name must be new.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<String>) -> Result<()> {
        let name = name.into();

        if self.columns.iter().any(|(existing, _)| *existing == name) {
            return Err(DbBuilderError::validation(format!(
                "duplicate column {name:?}"
            )));
        }

        if let Some((first, first_values)) = self.columns.first() {
            if first_values.len() != values.len() {
                return Err(DbBuilderError::validation(format!(
                    "column {name:?} has {} values but {first:?} has {}",
                    values.len(),
                    first_values.len()
                )));
            }
        }

        self.columns.push((name, values));
        Ok(())
    }

    /// Append one value to every column.
    pub fn push_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) -> Result<()> {
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        if row.len() != self.columns.len() {
            return Err(DbBuilderError::validation(format!(
                "row has {} fields, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }

        for ((_, values), value) in self.columns.iter_mut().zip(row) {
            values.push(value);
        }
        Ok(())
    }

    /// Append every row of `other`, whose headers must match.
    pub fn append(&mut self, other: &ResultTable) -> Result<()> {
        if self.headers() != other.headers() {
            return Err(DbBuilderError::validation(format!(
                "cannot append table with headers {:?} to {:?}",
                other.headers(),
                self.headers()
            )));
        }

        for ((_, values), (_, more)) in self.columns.iter_mut().zip(&other.columns) {
            values.extend(more.iter().cloned());
        }
        Ok(())
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |(_, values)| values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Rows in order, each a vector of borrowed cells.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        (0..self.row_count()).map(move |i| {
            self.columns
                .iter()
                .map(|(_, values)| values[i].as_str())
                .collect()
        })
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Render as delimited text: a header row, then one line per row.
    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.headers(), delimiter);
        for row in self.rows() {
            write_record(&mut out, &row, delimiter);
        }
        out
    }

    /// Write to `path` with the default delimiter, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        self.write_with(path, DEFAULT_DELIMITER)
    }

    pub fn write_with(&self, path: &Path, delimiter: char) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DbBuilderError::io(parent, e))?;
        }

        std::fs::write(path, self.to_delimited(delimiter))
            .map_err(|e| DbBuilderError::io(path, e))?;

        debug!(
            path = %path.display(),
            columns = self.column_count(),
            rows = self.row_count(),
            "table written"
        );
        Ok(())
    }

    /// Read a table written by [`write`](Self::write).
    pub fn read(path: &Path) -> Result<Self> {
        Self::read_with(path, DEFAULT_DELIMITER)
    }

    pub fn read_with(path: &Path, delimiter: char) -> Result<Self> {
        if !path.is_file() {
            return Err(DbBuilderError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| DbBuilderError::io(path, e))?;
        Self::from_delimited(&text, delimiter)
    }

    /// Parse delimited text whose first record is the header row.
    pub fn from_delimited(text: &str, delimiter: char) -> Result<Self> {
        let mut records = parse_records(text, delimiter)?.into_iter();

        let Some(headers) = records.next() else {
            return Ok(Self::new());
        };

        let mut table = Self::with_headers(headers)?;
        for (line, row) in records.enumerate() {
            table.push_row(row).map_err(|e| {
                DbBuilderError::validation(format!("data row {}: {e}", line + 1))
            })?;
        }
        Ok(table)
    }
}
