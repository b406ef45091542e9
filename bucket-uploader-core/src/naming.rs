//! Destination key synthesis from naming templates.
//!
//! Templates accept the tokens `{timestamp}`, `{date}`, `{time}`, `{index}` and
//! `{format}`; `{{` and `}}` produce literal braces. Every token is derived
//! from one [`BatchTimestamp`] captured at the start of a run, so a resolver is
//! a pure function of its configuration and the item index.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::{FileFormat, UploadConfig};
use crate::error::TemplateError;

/// The single instant all names in a batch are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTimestamp(DateTime<Utc>);

impl BatchTimestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// `YYYYMMDD_HHMMSS`
    pub fn timestamp(&self) -> String {
        self.0.format("%Y%m%d_%H%M%S").to_string()
    }

    /// `YYYYMMDD`
    pub fn date(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// `HHMMSS`
    pub fn time(&self) -> String {
        self.0.format("%H%M%S").to_string()
    }
}

/// Builds destination keys for items that carry no explicit path.
#[derive(Debug, Clone)]
pub struct PathResolver {
    filename_template: Option<String>,
    path_template: Option<String>,
    default_directory: Option<String>,
    key_prefix: Option<String>,
    strip_path: bool,
    format: FileFormat,
    stamp: BatchTimestamp,
}

impl PathResolver {
    pub fn new(config: &UploadConfig, stamp: BatchTimestamp) -> Self {
        fn non_blank(s: &Option<String>) -> Option<String> {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
        Self {
            filename_template: non_blank(&config.filename_template),
            path_template: non_blank(&config.path_template),
            default_directory: non_blank(&config.default_directory),
            key_prefix: non_blank(&config.key_prefix),
            strip_path: config.strip_path,
            format: config.effective_format(),
            stamp,
        }
    }

    /// Final object key for the item at 1-based `index`. Never fails: a broken
    /// template is logged and replaced by the default name.
    pub fn resolve(&self, index: usize) -> String {
        let path = match self.render_path(index) {
            Ok(path) => path,
            Err(e) => {
                warn!(index, error = %e, "Error processing naming template, using default");
                join_dir(self.default_directory.as_deref().unwrap_or(""), &self.default_filename(index))
            }
        };
        normalize_key(&path, self.key_prefix.as_deref(), self.strip_path)
    }

    fn render_path(&self, index: usize) -> Result<String, TemplateError> {
        let filename = match &self.filename_template {
            Some(template) => {
                let rendered = render(template, &self.vars(index))?;
                let stem = std::path::Path::new(&rendered)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| !s.is_empty())
                    .ok_or(TemplateError::Empty)?;
                format!("{stem}.{}", self.format.extension())
            }
            None => self.default_filename(index),
        };
        let dir = match &self.path_template {
            Some(template) => render(template, &self.vars(index))?,
            None => self.default_directory.clone().unwrap_or_default(),
        };
        Ok(join_dir(&dir, &filename))
    }

    fn default_filename(&self, index: usize) -> String {
        format!(
            "data_{}_{}.{}",
            self.stamp.timestamp(),
            index,
            self.format.extension()
        )
    }

    fn vars(&self, index: usize) -> [(&'static str, String); 5] {
        [
            ("timestamp", self.stamp.timestamp()),
            ("date", self.stamp.date()),
            ("time", self.stamp.time()),
            ("index", index.to_string()),
            ("format", self.format.extension().to_string()),
        ]
    }
}

/// Substitutes `{name}` tokens from `vars`.
pub fn render(template: &str, vars: &[(&str, String)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, '{')) | None => return Err(TemplateError::Unbalanced(pos)),
                        Some((_, ch)) => name.push(ch),
                    }
                }
                let value = vars
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| v)
                    .ok_or(TemplateError::UnknownToken(name))?;
                out.push_str(value);
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(TemplateError::Unbalanced(pos)),
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Applies the strip-path rule and key prefix, and removes leading slashes.
///
/// Stripping keeps the last non-empty component, so `reports/` becomes
/// `reports`. The result is empty only when `path` has no component at all.
pub fn normalize_key(path: &str, prefix: Option<&str>, strip_path: bool) -> String {
    let path = if strip_path {
        path.rsplit(|c| c == '/' || c == '\\')
            .find(|component| !component.is_empty())
            .unwrap_or("")
    } else {
        path
    };
    let key = match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => join_dir(prefix, path.trim_start_matches('/')),
        None => path.to_string(),
    };
    key.trim_start_matches('/').to_string()
}

fn join_dir(dir: &str, filename: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        filename.to_string()
    } else {
        format!("{dir}/{filename}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> BatchTimestamp {
        BatchTimestamp::at(Utc.with_ymd_and_hms(2024, 12, 12, 9, 5, 7).unwrap())
    }

    fn config(format: FileFormat) -> UploadConfig {
        let mut c = UploadConfig::new("bucket");
        c.file_format = Some(format);
        c
    }

    #[test]
    fn default_name_uses_batch_timestamp_and_index() {
        let resolver = PathResolver::new(&config(FileFormat::Txt), stamp());
        assert_eq!(resolver.resolve(1), "data_20241212_090507_1.txt");
        assert_eq!(resolver.resolve(2), "data_20241212_090507_2.txt");
    }

    #[test]
    fn filename_template_replaces_user_extension_with_format() {
        let mut c = config(FileFormat::Json);
        c.filename_template = Some("report_{date}_{index}.csv".into());
        let resolver = PathResolver::new(&c, stamp());
        assert_eq!(resolver.resolve(3), "report_20241212_3.json");
    }

    #[test]
    fn path_template_is_joined_with_filename() {
        let mut c = config(FileFormat::Txt);
        c.filename_template = Some("data_{index}".into());
        c.path_template = Some("reports/{date}/".into());
        let resolver = PathResolver::new(&c, stamp());
        assert_eq!(resolver.resolve(1), "reports/20241212/data_1.txt");
    }

    #[test]
    fn default_directory_applies_without_path_template() {
        let mut c = config(FileFormat::Csv);
        c.default_directory = Some("uploads".into());
        let resolver = PathResolver::new(&c, stamp());
        assert_eq!(resolver.resolve(1), "uploads/data_20241212_090507_1.csv");
    }

    #[test]
    fn unknown_token_falls_back_to_default_name() {
        let mut c = config(FileFormat::Txt);
        c.filename_template = Some("report_{user}".into());
        let resolver = PathResolver::new(&c, stamp());
        assert_eq!(resolver.resolve(4), "data_20241212_090507_4.txt");
    }

    #[test]
    fn malformed_template_falls_back_to_default_name() {
        let mut c = config(FileFormat::Txt);
        c.path_template = Some("reports/{date".into());
        let resolver = PathResolver::new(&c, stamp());
        assert_eq!(resolver.resolve(1), "data_20241212_090507_1.txt");
    }

    #[test]
    fn escaped_braces_render_literally() {
        let vars = [("index", "7".to_string())];
        assert_eq!(render("{{x}}_{index}", &vars).unwrap(), "{x}_7");
        assert_eq!(render("a}b", &vars), Err(TemplateError::Unbalanced(1)));
    }

    #[test]
    fn resolver_is_pure() {
        let mut c = config(FileFormat::Md);
        c.filename_template = Some("{timestamp}_{time}_{format}".into());
        let a = PathResolver::new(&c, stamp());
        let b = PathResolver::new(&c, stamp());
        assert_eq!(a.resolve(9), b.resolve(9));
        assert_eq!(a.resolve(9), "20241212_090507_090507_md.md");
    }

    #[test]
    fn prefix_and_leading_slashes() {
        assert_eq!(normalize_key("/a/b.txt", None, false), "a/b.txt");
        assert_eq!(normalize_key("a/b.txt", Some("/exports/"), false), "exports/a/b.txt");
        assert_eq!(normalize_key("/a/b.txt", Some("exports"), true), "exports/b.txt");
        assert_eq!(normalize_key("//x", Some("  "), false), "x");
    }

    #[test]
    fn strip_skips_trailing_separators() {
        assert_eq!(normalize_key("reports/", None, true), "reports");
        assert_eq!(normalize_key("a\\b\\", Some("out"), true), "out/b");
        assert_eq!(normalize_key("/", None, true), "");
        assert_eq!(normalize_key("/", None, false), "");
    }

    #[test]
    fn prefix_applies_to_synthesized_keys() {
        let mut c = config(FileFormat::Txt);
        c.key_prefix = Some("/tenant-a".into());
        c.path_template = Some("/{date}".into());
        let resolver = PathResolver::new(&c, stamp());
        assert_eq!(resolver.resolve(1), "tenant-a/20241212/data_20241212_090507_1.txt");
    }
}
