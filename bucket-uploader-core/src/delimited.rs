//! Minimal delimited-text (CSV/TSV) reading and writing.
//!
//! Supports double-quoted fields with `""` escapes and embedded newlines.
//! Rows must all have the same width as the header; anything else is a parse
//! error so callers can fall back to the original text.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnterminatedQuote,
    RaggedRow { line: usize, expected: usize, found: usize },
    Empty,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnterminatedQuote => write!(f, "unterminated quoted field"),
            ParseError::RaggedRow { line, expected, found } => write!(
                f,
                "row {line} has {found} fields, expected {expected}"
            ),
            ParseError::Empty => write!(f, "no header row"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Splits delimited text into rows of fields. The first row is the header.
pub fn parse(text: &str, delimiter: char) -> Result<Vec<Vec<String>>, ParseError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            c if c == delimiter => row.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(ParseError::UnterminatedQuote);
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    // Blank lines carry no data.
    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));

    let expected = rows.first().map(Vec::len).ok_or(ParseError::Empty)?;
    for (i, r) in rows.iter().enumerate() {
        if r.len() != expected {
            return Err(ParseError::RaggedRow {
                line: i + 1,
                expected,
                found: r.len(),
            });
        }
    }
    Ok(rows)
}

/// Appends one row, quoting fields that contain the delimiter, quotes or newlines.
pub fn write_row<S: AsRef<str>>(out: &mut String, fields: &[S], delimiter: char) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        let field = field.as_ref();
        if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r') {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}
