//! Tabular output and input files for dbbuilder.
//!
//! [`ResultTable`] is the in-memory form of every generated table. It is
//! persisted as delimited text with a header row. The loaders in [`inputs`]
//! read the seed files the work units start from.

pub mod delimited;
pub mod inputs;
pub mod table;

pub use delimited::{DEFAULT_DELIMITER, parse_records, write_record};
pub use inputs::{load_names, load_targets, read_records, table_file_name};
pub use table::ResultTable;
