//! Delimited-text records.
//!
//! Fields holding the delimiter, a double quote, or a line break are written
//! double-quoted with embedded quotes doubled. A record made of one empty
//! field is written as `""` so it is not read back as a blank line. The
//! reader accepts the same form plus `\r\n` line endings.

use dbbuilder_shared::{DbBuilderError, Result};

/// Field separator used unless a table says otherwise.
pub const DEFAULT_DELIMITER: char = ',';

/// Append one record, terminated by `\n`, to `out`.
pub fn write_record<S: AsRef<str>>(out: &mut String, fields: &[S], delimiter: char) {
    if matches!(fields, [only] if only.as_ref().is_empty()) {
        out.push_str("\"\"\n");
        return;
    }
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        write_field(out, field.as_ref(), delimiter);
    }
    out.push('\n');
}

fn write_field(out: &mut String, field: &str, delimiter: char) {
    let needs_quotes = field
        .chars()
        .any(|c| c == delimiter || c == '"' || c == '\n' || c == '\r');

    if !needs_quotes {
        out.push_str(field);
        return;
    }

    out.push('"');
    for c in field.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

/// Split `text` into records of fields. Blank lines are skipped.
pub fn parse_records(text: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // a record that consists of one empty unquoted field is a blank line
    let mut touched = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                c => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                touched = true;
            }
            c if c == delimiter => {
                record.push(std::mem::take(&mut field));
                touched = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                finish_record(&mut records, &mut record, &mut field, touched);
                touched = false;
            }
            c => {
                field.push(c);
                touched = true;
            }
        }
    }

    if in_quotes {
        return Err(DbBuilderError::parse("unterminated quoted field"));
    }
    finish_record(&mut records, &mut record, &mut field, touched);

    Ok(records)
}

fn finish_record(
    records: &mut Vec<Vec<String>>,
    record: &mut Vec<String>,
    field: &mut String,
    touched: bool,
) {
    if !touched {
        return;
    }
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
}
