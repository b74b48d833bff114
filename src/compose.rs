use docker_compose_types::Compose;

use crate::error::ProvisionResult;

/// The application's compose descriptor, kept as text so that
/// patching a placeholder leaves the vendor's formatting and
/// comments alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeFile {
    lines: Vec<String>,
    trailing_newline: bool,
}

/// Where an environment entry sits on a line and how it is spelled.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EnvLine {
    indent: String,
    /// `- KEY=value` rather than `KEY: value`.
    list: bool,
    quoted: bool,
    commented: bool,
    value: String,
}

impl ComposeFile {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(ToString::to_string).collect(),
            trailing_newline: text.is_empty() || text.ends_with('\n'),
        }
    }

    /// Service names in declaration order.
    pub fn services(&self) -> ProvisionResult<Vec<String>> {
        let compose: Compose = serde_yaml::from_str(&self.render())?;
        Ok(compose.services.0.keys().cloned().collect())
    }

    /// Value of the first active environment entry named `key`.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<String> {
        self.lines
            .iter()
            .filter_map(|l| env_line(l, key))
            .find(|e| !e.commented)
            .map(|e| e.value)
    }

    /// Fill the environment entry `key` if it is blank or commented
    /// out. Returns whether the document changed.
    pub fn set_env_if_blank(&mut self, key: &str, value: &str) -> bool {
        let matches: Vec<(usize, EnvLine)> = self
            .lines
            .iter()
            .enumerate()
            .filter_map(|(i, l)| env_line(l, key).map(|e| (i, e)))
            .collect();

        let target = matches
            .iter()
            .find(|(_, e)| !e.commented)
            .or_else(|| matches.first());

        let Some((i, entry)) = target else {
            return false;
        };
        if !entry.commented && !entry.value.is_empty() {
            return false;
        }

        self.lines[*i] = render_env_line(entry, key, value);
        true
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }
}

fn env_line(line: &str, key: &str) -> Option<EnvLine> {
    let body = line.trim_start();
    let indent = line[..line.len() - body.len()].to_string();

    let (body, commented) = body
        .strip_prefix('#')
        .map_or((body, false), |rest| (rest.trim_start(), true));

    if let Some(item) = body.strip_prefix("- ") {
        let item = item.trim();
        let (item, quoted) = match item.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            Some(inner) => (inner, true),
            None => (item, false),
        };
        let value = item.strip_prefix(key)?.strip_prefix('=')?;
        return Some(EnvLine {
            indent,
            list: true,
            quoted,
            commented,
            value: value.trim().to_string(),
        });
    }

    let value = body.strip_prefix(key)?.strip_prefix(':')?.trim();
    let (value, quoted) = match value
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
    {
        Some(inner) => (inner, true),
        None => (value, false),
    };
    Some(EnvLine {
        indent,
        list: false,
        quoted,
        commented,
        value: value.trim().to_string(),
    })
}

fn render_env_line(entry: &EnvLine, key: &str, value: &str) -> String {
    let indent = &entry.indent;
    match (entry.list, entry.quoted) {
        (true, true) => format!("{indent}- \"{key}={value}\""),
        (true, false) => format!("{indent}- {key}={value}"),
        (false, true) => format!("{indent}{key}: \"{value}\""),
        (false, false) => format!("{indent}{key}: {value}"),
    }
}
