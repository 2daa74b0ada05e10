//! Readers for free-form model output.
//!
//! Grammar accepted by [`parse_list`]:
//! - The list opens at the first `[`; without one, it opens at the start of the text.
//! - Items are `"double"` or `'single'` quoted strings separated by commas;
//!   backslash escapes are honoured and a trailing comma is allowed.
//! - The list closes at the first `]` outside a quoted string. With no `]`
//!   left, anything after the last complete item is dropped and the list is
//!   closed there.

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use regex::Regex;

use dbbuilder_shared::{DbBuilderError, Result};

static HTTPS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://(?:[a-zA-Z0-9@.&+!*(),$-_]|%[0-9a-fA-F]{2})+").expect("valid url regex")
});

type Cursor<'a> = Peekable<CharIndices<'a>>;

/// Parse a bracketed list of quoted strings out of a model response.
pub fn parse_list(text: &str) -> Result<Vec<String>> {
    let body = match text.find('[') {
        Some(idx) => &text[idx + 1..],
        None => text,
    };

    let mut cursor = body.char_indices().peekable();
    let mut items = Vec::new();

    loop {
        skip_whitespace(&mut cursor);
        match cursor.peek().copied() {
            Some((_, ']')) => return Ok(items),
            None => return close_implicitly(items),
            Some((_, quote @ ('"' | '\''))) => {
                cursor.next();
                items.push(read_quoted(&mut cursor, quote)?);
            }
            Some((idx, _)) => return close_before_trailing(items, &body[idx..]),
        }

        skip_whitespace(&mut cursor);
        match cursor.peek().copied() {
            Some((_, ',')) => {
                cursor.next();
            }
            Some((_, ']')) => return Ok(items),
            None => return close_implicitly(items),
            Some((idx, _)) => return close_before_trailing(items, &body[idx..]),
        }
    }
}

/// First `https://` URL in `text`, if any.
pub fn extract_https_url(text: &str) -> Option<String> {
    HTTPS_URL_RE.find(text).map(|m| m.as_str().to_string())
}

fn skip_whitespace(cursor: &mut Cursor<'_>) {
    while cursor.next_if(|(_, c)| c.is_whitespace()).is_some() {}
}

fn read_quoted(cursor: &mut Cursor<'_>, quote: char) -> Result<String> {
    let mut value = String::new();
    while let Some((_, c)) = cursor.next() {
        match c {
            '\\' => match cursor.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, other)) => value.push(other),
                None => break,
            },
            c if c == quote => return Ok(value),
            c => value.push(c),
        }
    }
    Err(DbBuilderError::parse(format!(
        "unterminated {quote}-quoted string"
    )))
}

/// End of input without `]`: the list ends after the last item.
fn close_implicitly(items: Vec<String>) -> Result<Vec<String>> {
    if items.is_empty() {
        return Err(DbBuilderError::parse("no list items found"));
    }
    Ok(items)
}

/// Unexpected content: only acceptable as trailing text of an unclosed list.
fn close_before_trailing(items: Vec<String>, rest: &str) -> Result<Vec<String>> {
    if items.is_empty() || rest.contains(']') {
        let snippet: String = rest.chars().take(40).collect();
        return Err(DbBuilderError::parse(format!(
            "malformed list near {snippet:?}"
        )));
    }
    Ok(items)
}
