//! Binary-vs-text classification.
//!
//! This is a heuristic. A text payload that happens to be dense with `\x`
//! escapes is reported as binary, and binary data smuggled through a string
//! without NUL bytes is reported as text. Both are accepted outcomes.

use std::path::Path;

use crate::config::FileFormat;
use crate::contract::ContentKind;

const BINARY_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "xlsx", "docx", "pptx", "jpg", "jpeg", "png", "gif", "bmp", "webp", "ico",
    "mp3", "mp4", "avi", "mov", "exe", "dll", "so", "bin", "dat", "db", "sqlite", "parquet",
];

/// Text shorter than this is never judged by escape density.
const ESCAPE_DENSITY_MIN_LEN: usize = 100;

/// Content as seen by the classifier.
#[derive(Debug, Clone, Copy)]
pub enum Content<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_binary: bool,
    pub content_type: ContentKind,
}

impl Classification {
    fn binary() -> Self {
        Self {
            is_binary: true,
            content_type: ContentKind::Binary,
        }
    }
}

/// Decides whether an item is uploaded as binary. `text_kind` is the kind the
/// extractor assigned and is kept when the content turns out to be text.
pub fn classify(
    suggested_path: Option<&str>,
    content: Content<'_>,
    target_format: FileFormat,
    text_kind: ContentKind,
) -> Classification {
    if target_format.is_binary() {
        return Classification::binary();
    }
    if suggested_path.is_some_and(has_binary_extension) {
        return Classification::binary();
    }
    match content {
        Content::Bytes(_) => Classification::binary(),
        Content::Text(text) if looks_binary(text) => Classification::binary(),
        _ => Classification {
            is_binary: false,
            content_type: text_kind,
        },
    }
}

pub fn has_binary_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// NUL characters, or a long string where literal `\x` escapes make up more
/// than a tenth of the length.
pub fn looks_binary(text: &str) -> bool {
    if text.contains('\0') {
        return true;
    }
    text.len() > ESCAPE_DENSITY_MIN_LEN && text.matches("\\x").count() * 10 > text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_target_format_wins_over_text_content() {
        let c = classify(None, Content::Text("hello"), FileFormat::Zip, ContentKind::Text);
        assert!(c.is_binary);
        assert_eq!(c.content_type, ContentKind::Binary);
    }

    #[test]
    fn suggested_path_extension_marks_binary() {
        let c = classify(Some("scans/page.PNG"), Content::Text("x"), FileFormat::Txt, ContentKind::Text);
        assert!(c.is_binary);
        let c = classify(Some("notes/readme.md"), Content::Text("x"), FileFormat::Txt, ContentKind::Text);
        assert!(!c.is_binary);
    }

    #[test]
    fn raw_bytes_are_binary() {
        let c = classify(None, Content::Bytes(b"abc"), FileFormat::Txt, ContentKind::Text);
        assert!(c.is_binary);
    }

    #[test]
    fn nul_character_is_binary() {
        assert!(looks_binary("abc\0def"));
    }

    #[test]
    fn dense_hex_escapes_are_binary_only_past_length_threshold() {
        let dense = "\\x00".repeat(30);
        assert!(dense.len() > ESCAPE_DENSITY_MIN_LEN);
        assert!(looks_binary(&dense));

        let short = "\\x00".repeat(5);
        assert!(!looks_binary(&short));

        let sparse = format!("{}\\x41", "a".repeat(200));
        assert!(!looks_binary(&sparse));
    }

    #[test]
    fn text_keeps_extracted_kind() {
        let c = classify(None, Content::Text("a,b\n1,2"), FileFormat::Csv, ContentKind::Dataframe);
        assert_eq!(
            c,
            Classification {
                is_binary: false,
                content_type: ContentKind::Dataframe
            }
        );
    }
}
