//! Sectioned key/value codec for the connections file.
//!
//! Parsing keeps the original text of every section so that a rewrite
//! reproduces untouched sections byte-for-byte. Only sections created or
//! replaced through this module are re-rendered.

use crate::{Result, error::ProfileError};

/// One `[name]` block of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Section {
    pub(crate) name: String,
    pub(crate) entries: Vec<(String, String)>,
    /// 1-based line of the header, 0 for sections not read from disk
    pub(crate) line: usize,
    raw: String,
}

impl Section {
    fn rendered(name: &str, pairs: &[(&str, String)]) -> Self {
        let mut raw = format!("[{}]\n", name);
        for (key, value) in pairs {
            raw.push_str(key);
            raw.push_str(" = ");
            raw.push_str(&value.replace('\n', "\n\t"));
            raw.push('\n');
        }
        raw.push('\n');

        Self {
            name: name.to_string(),
            entries: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            line: 0,
            raw,
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed contents of a connections file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ConfigDocument {
    /// Blank lines and comments before the first header
    preamble: String,
    sections: Vec<Section>,
}

impl ConfigDocument {
    /// Parses file contents. Empty input yields an empty document.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let mut document = Self::default();
        let mut current: Option<Section> = None;
        let mut continuing = false;
        // Indented blank lines inside a value, kept only if more text follows.
        let mut held_blank = 0;

        for (index, line) in text.split_inclusive('\n').enumerate() {
            let line_number = index + 1;
            let content = line.trim_end_matches(['\n', '\r']);
            let trimmed = content.trim();

            if content.starts_with('[') {
                let Some(name) = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                else {
                    return Err(ProfileError::malformed(
                        line_number,
                        "unterminated section header",
                    ));
                };
                if name.is_empty() {
                    return Err(ProfileError::malformed(line_number, "empty section name"));
                }
                let duplicate = document.sections.iter().any(|s| s.name == name)
                    || current.as_ref().is_some_and(|s| s.name == name);
                if duplicate {
                    return Err(ProfileError::malformed(
                        line_number,
                        format!("section '{}' already exists", name),
                    ));
                }

                if let Some(done) = current.take() {
                    document.sections.push(done);
                }
                current = Some(Section {
                    name: name.to_string(),
                    entries: Vec::new(),
                    line: line_number,
                    raw: line.to_string(),
                });
                continuing = false;
                held_blank = 0;
                continue;
            }

            let Some(section) = current.as_mut() else {
                if trimmed.is_empty() || trimmed.starts_with(['#', ';']) {
                    document.preamble.push_str(line);
                    continue;
                }
                return Err(ProfileError::malformed(
                    line_number,
                    "entry found before any section header",
                ));
            };
            section.raw.push_str(line);

            let indented = content.starts_with([' ', '\t']);
            if trimmed.is_empty() {
                if continuing && indented {
                    held_blank += 1;
                } else {
                    continuing = false;
                    held_blank = 0;
                }
                continue;
            }
            if trimmed.starts_with(['#', ';']) {
                continue;
            }

            if continuing && indented {
                if let Some((_, value)) = section.entries.last_mut() {
                    for _ in 0..=held_blank {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                }
                held_blank = 0;
                continue;
            }
            held_blank = 0;

            let Some(split_at) = content.find(['=', ':']) else {
                return Err(ProfileError::malformed(
                    line_number,
                    format!("expected 'key = value', found '{}'", trimmed),
                ));
            };
            let key = content[..split_at].trim().to_lowercase();
            let value = content[split_at + 1..].trim().to_string();
            if key.is_empty() {
                return Err(ProfileError::malformed(line_number, "empty key"));
            }
            if section.get(&key).is_some() {
                return Err(ProfileError::malformed(
                    line_number,
                    format!("key '{}' already exists in section '{}'", key, section.name),
                ));
            }
            section.entries.push((key, value));
            continuing = true;
        }

        if let Some(done) = current.take() {
            document.sections.push(done);
        }
        Ok(document)
    }

    pub(crate) fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub(crate) fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    /// Appends a freshly rendered section at the end of the document.
    pub(crate) fn append(&mut self, name: &str, pairs: &[(&str, String)]) {
        let tail = match self.sections.last_mut() {
            Some(last) => &mut last.raw,
            None => &mut self.preamble,
        };
        if !tail.is_empty() && !tail.ends_with('\n') {
            tail.push('\n');
        }
        self.sections.push(Section::rendered(name, pairs));
    }

    /// Removes a section with everything up to the next header.
    ///
    /// Returns false when no such section exists.
    pub(crate) fn remove(&mut self, name: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.name != name);
        self.sections.len() != before
    }

    /// Replaces `old` in place with a rendered `name` section.
    ///
    /// Falls back to appending when `old` is not present.
    pub(crate) fn replace(&mut self, old: &str, name: &str, pairs: &[(&str, String)]) {
        match self.sections.iter().position(|s| s.name == old) {
            Some(index) => self.sections[index] = Section::rendered(name, pairs),
            None => self.append(name, pairs),
        }
    }

    /// Serializes the document back to text.
    pub(crate) fn render(&self) -> String {
        let mut text = self.preamble.clone();
        for section in &self.sections {
            text.push_str(&section.raw);
        }
        text
    }
}
