//! Line-preserving model of a `KEY=value` environment file.
//!
//! Only lines that are mutated get re-rendered; everything else,
//! comments and blank lines included, is written back exactly as
//! it was read.

/// How [`EnvFile::set`] treats a key that already has a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Only fill a key that is missing, blank, or commented out.
    IfBlank,
    /// Replace whatever is there.
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    value: String,
    commented: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    raw: String,
    entry: Option<Entry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl EnvFile {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|raw| Line {
                raw: raw.to_string(),
                entry: parse_entry(raw),
            })
            .collect();

        Self {
            lines,
            trailing_newline: text.is_empty() || text.ends_with('\n'),
        }
    }

    /// Value of the active (uncommented) entry for `key`, quotes
    /// stripped.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.active(key)
            .and_then(|i| self.lines[i].entry.as_ref())
            .map(|e| unquote(&e.value))
    }

    /// True when `key` is absent, commented out, or has no value.
    #[must_use]
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).is_none_or(|v| v.trim().is_empty())
    }

    /// Set `key` to `value` under `policy`. Returns whether the
    /// document changed.
    pub fn set(&mut self, key: &str, value: &str, policy: Policy) -> bool {
        if let Some(i) = self.active(key) {
            let current = self.lines[i].entry.as_ref().map_or("", |e| unquote(&e.value));
            if current == value || (policy == Policy::IfBlank && !current.trim().is_empty()) {
                return false;
            }
            self.lines[i] = assignment(key, value);
            return true;
        }

        let commented = self.lines.iter().position(|l| {
            l.entry
                .as_ref()
                .is_some_and(|e| e.commented && e.key == key)
        });
        match commented {
            Some(i) => self.lines[i] = assignment(key, value),
            None => self.lines.push(assignment(key, value)),
        }
        true
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|l| l.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }

    fn active(&self, key: &str) -> Option<usize> {
        self.lines.iter().position(|l| {
            l.entry
                .as_ref()
                .is_some_and(|e| !e.commented && e.key == key)
        })
    }
}

fn assignment(key: &str, value: &str) -> Line {
    Line {
        raw: format!("{key}={value}"),
        entry: Some(Entry {
            key: key.to_string(),
            value: value.to_string(),
            commented: false,
        }),
    }
}

fn parse_entry(raw: &str) -> Option<Entry> {
    let trimmed = raw.trim_start();
    let (body, commented) = trimmed
        .strip_prefix('#')
        .map_or((trimmed, false), |rest| (rest.trim_start(), true));
    let body = body.strip_prefix("export ").unwrap_or(body);

    let (key, value) = body.split_once('=')?;
    if !is_key(key) {
        return None;
    }

    Some(Entry {
        key: key.to_string(),
        value: value.trim_end().to_string(),
        commented,
    })
}

fn is_key(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognises_commented_keys() {
        let doc = EnvFile::parse("# REDIS_URL=\n#Just a note\nA=1\n");

        assert_eq!(doc.get("REDIS_URL"), None);
        assert!(doc.is_blank("REDIS_URL"));
        assert_eq!(doc.get("A"), Some("1"));
    }

    #[test]
    fn prose_comments_are_not_entries() {
        assert!(parse_entry("# Example: set FOO=bar to enable").is_none());
        assert!(parse_entry("# see https://x.test/?a=b").is_none());
    }

    #[test]
    fn quoted_blank_is_blank() {
        let doc = EnvFile::parse("SECRET_KEY_BASE=\"\"\n");
        assert!(doc.is_blank("SECRET_KEY_BASE"));
    }

    #[test]
    fn untouched_document_renders_verbatim() {
        let text = "# header\n\nA=1\n  # indented comment\nB= spaced\n";
        assert_eq!(EnvFile::parse(text).render(), text);
    }

    #[test]
    fn missing_trailing_newline_is_kept() {
        let text = "A=1\nB=2";
        assert_eq!(EnvFile::parse(text).render(), text);
    }

    #[test]
    fn export_prefix_is_understood() {
        let doc = EnvFile::parse("export TOKEN=abc\n");
        assert_eq!(doc.get("TOKEN"), Some("abc"));
    }
}
