//! Archive manifest (`META-INF/MANIFEST.MF`) parsing.
//!
//! The manifest is plain `Key: Value` text. A line starting with a single
//! space continues the previous value; the folded text is joined back
//! before it is exposed. Sections are separated by blank lines: the first
//! holds the main attributes, later ones describe individual entries and
//! start with a `Name` attribute.

use crate::error::{Error, Result};

/// Well-known name of the manifest entry
pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";

/// Primary entry point read by generic archive launchers
pub const MAIN_CLASS_ATTRIBUTE: &str = "Main-Class";

/// Application entry point written by the packaging tool
pub const START_CLASS_ATTRIBUTE: &str = "Start-Class";

/// Ordered attribute list with ASCII case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: Vec<(String, String)>,
}

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn push(&mut self, key: String, value: String) {
        self.values.push((key, value));
    }

    fn last_value_mut(&mut self) -> Option<&mut String> {
        self.values.last_mut().map(|(_, v)| v)
    }
}

/// Parsed manifest: main attributes plus named per-entry sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    sections: Vec<(String, Attributes)>,
}

impl Manifest {
    /// Parse manifest text; `archive` only names the source in errors.
    pub fn parse(archive: &str, bytes: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(bytes);
        let mut manifest = Manifest::default();
        let mut current = Attributes::default();
        let mut in_main = true;

        for (number, line) in split_lines(&text).enumerate() {
            let line_no = number + 1;

            if line.is_empty() {
                if !current.is_empty() || in_main {
                    manifest.finish_section(std::mem::take(&mut current), in_main, archive, line_no)?;
                    in_main = false;
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                let value = current.last_value_mut().ok_or_else(|| Error::MalformedManifest {
                    archive: archive.to_string(),
                    line: line_no,
                    reason: "continuation line without a preceding attribute".to_string(),
                })?;
                value.push_str(rest);
                continue;
            }

            let (key, value) = line.split_once(':').ok_or_else(|| Error::MalformedManifest {
                archive: archive.to_string(),
                line: line_no,
                reason: format!("expected `Key: Value`, found {:?}", line),
            })?;
            if key.is_empty() {
                return Err(Error::MalformedManifest {
                    archive: archive.to_string(),
                    line: line_no,
                    reason: "empty attribute name".to_string(),
                });
            }
            let value = value.strip_prefix(' ').unwrap_or(value);
            current.push(key.to_string(), value.to_string());
        }

        if !current.is_empty() || in_main {
            let last_line = split_lines(&text).count();
            manifest.finish_section(current, in_main, archive, last_line)?;
        }

        Ok(manifest)
    }

    fn finish_section(
        &mut self,
        attributes: Attributes,
        main: bool,
        archive: &str,
        line: usize,
    ) -> Result<()> {
        if main {
            self.main = attributes;
            return Ok(());
        }
        let name = attributes
            .get("Name")
            .ok_or_else(|| Error::MalformedManifest {
                archive: archive.to_string(),
                line,
                reason: "entry section without a Name attribute".to_string(),
            })?
            .to_string();
        self.sections.push((name, attributes));
        Ok(())
    }

    pub fn main_attributes(&self) -> &Attributes {
        &self.main
    }

    /// Attributes of the section describing `name`.
    pub fn section(&self, name: &str) -> Option<&Attributes> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, attrs)| attrs)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.sections.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.main.get(key)
    }

    pub fn main_class(&self) -> Option<&str> {
        self.get(MAIN_CLASS_ATTRIBUTE)
    }

    pub fn start_class(&self) -> Option<&str> {
        self.get(START_CLASS_ATTRIBUTE)
    }
}

/// Split on `\r\n`, `\n` or a lone `\r`, dropping the final empty piece.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(['\r', '\n']) {
            Some(i) => {
                let line = &rest[..i];
                let skip = if rest[i..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[i + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_continuation_lines() {
        let manifest =
            Manifest::parse("t", b"Main-Class: com.example.A\nX-Long: abc\n def\n").unwrap();
        assert_eq!(manifest.main_class(), Some("com.example.A"));
        assert_eq!(manifest.get("X-Long"), Some("abcdef"));
    }

    #[test]
    fn keeps_order_and_ignores_key_case() {
        let manifest = Manifest::parse(
            "t",
            b"Manifest-Version: 1.0\r\nMain-Class: Launcher\r\nStart-Class: com.example.App\r\n\r\n",
        )
        .unwrap();
        let keys: Vec<_> = manifest.main_attributes().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["Manifest-Version", "Main-Class", "Start-Class"]);
        assert_eq!(manifest.get("start-class"), Some("com.example.App"));
        assert_eq!(manifest.start_class(), Some("com.example.App"));
    }

    #[test]
    fn reads_named_sections() {
        let manifest = Manifest::parse(
            "t",
            b"Manifest-Version: 1.0\n\nName: lib/a.jar\nSealed: true\n\nName: lib/b\n jar\nSealed: false\n",
        )
        .unwrap();
        assert_eq!(manifest.main_attributes().len(), 1);
        assert_eq!(manifest.section("lib/a.jar").and_then(|s| s.get("Sealed")), Some("true"));
        assert_eq!(manifest.section("lib/bjar").and_then(|s| s.get("sealed")), Some("false"));
        assert_eq!(manifest.sections().count(), 2);
    }

    #[test]
    fn rejects_lines_without_colon() {
        let err = Manifest::parse("t", b"Main-Class: A\nbroken line\n").unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { line: 2, .. }));
    }

    #[test]
    fn rejects_leading_continuation() {
        let err = Manifest::parse("t", b" orphan\n").unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { line: 1, .. }));
    }

    #[test]
    fn empty_manifest_has_no_attributes() {
        let manifest = Manifest::parse("t", b"").unwrap();
        assert!(manifest.main_attributes().is_empty());
        assert_eq!(manifest.main_class(), None);
    }
}
