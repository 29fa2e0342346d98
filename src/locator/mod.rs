//! Locator strings addressing entries across nested archives.
//!
//! A locator has the form `<container>!/<entry>` where the container is a
//! root source (`file:/app.jar`, `mem:name`, `https://...`) or, recursively,
//! another locator. `file:/app.jar!/lib/x.jar!/greeting.txt` names
//! `greeting.txt` inside `lib/x.jar` inside `/app.jar`; a trailing `!/`
//! with nothing after it names the archive itself.

mod encoding;

pub use encoding::{decode_path, encode_path};

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Separator between a container and an entry path
pub const SEPARATOR: &str = "!/";

/// Optional scheme prefix accepted in front of a locator
const JAR_SCHEME: &str = "jar:";

/// Decoded locator: a root container followed by nested archive names
/// and an optional terminal entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryLocator {
    root: String,
    archives: Vec<Vec<u8>>,
    entry: Option<Vec<u8>>,
}

impl EntryLocator {
    /// Locator of the root archive itself.
    pub fn root(container: impl Into<String>) -> Self {
        Self {
            root: container.into(),
            archives: Vec::new(),
            entry: None,
        }
    }

    /// Decode a locator string.
    ///
    /// The string is split on its last `!/`; everything before it is the
    /// container, decoded the same way until no separator remains.
    pub fn decode(locator: &str) -> Result<Self> {
        let body = locator.strip_prefix(JAR_SCHEME).unwrap_or(locator);
        if !body.contains(SEPARATOR) {
            return Err(Error::locator(locator, format!("no {} found", SEPARATOR)));
        }
        Self::decode_nested(locator, body)
    }

    fn decode_nested(locator: &str, body: &str) -> Result<Self> {
        let Some(separator) = body.rfind(SEPARATOR) else {
            if body.is_empty() {
                return Err(Error::locator(locator, "empty root container"));
            }
            return Ok(Self::root(body));
        };

        let entry_part = &body[separator + SEPARATOR.len()..];
        let container = &body[..separator];

        let mut parsed = Self::decode_nested(locator, container)?;
        if let Some(nested) = parsed.entry.take() {
            parsed.archives.push(nested);
        } else if !parsed.archives.is_empty() || container.contains(SEPARATOR) {
            return Err(Error::locator(locator, "empty nested archive name"));
        }
        if !entry_part.is_empty() {
            parsed.entry = Some(decode_path(entry_part)?);
        }
        Ok(parsed)
    }

    /// Root container, e.g. `file:/app.jar`.
    pub fn container_root(&self) -> &str {
        &self.root
    }

    /// Names of the nested archives to descend through, outermost first.
    pub fn archives(&self) -> &[Vec<u8>] {
        &self.archives
    }

    /// Terminal entry, or `None` when the locator names an archive.
    pub fn entry(&self) -> Option<&[u8]> {
        self.entry.as_deref()
    }

    /// Number of archive levels below the root.
    pub fn depth(&self) -> usize {
        self.archives.len()
    }

    /// Locator of the archive holding the terminal entry.
    pub fn archive_locator(&self) -> Self {
        Self {
            root: self.root.clone(),
            archives: self.archives.clone(),
            entry: None,
        }
    }

    /// Address one more segment below this locator.
    ///
    /// On an archive locator this names an entry of that archive; on an
    /// entry locator the entry becomes a nested archive.
    pub fn join(&self, name: impl Into<Vec<u8>>) -> Self {
        let mut joined = self.clone();
        if let Some(entry) = joined.entry.take() {
            joined.archives.push(entry);
        }
        joined.entry = Some(name.into());
        joined
    }

    /// Drop the last segment, or `None` at the root archive.
    pub fn parent(&self) -> Option<Self> {
        let mut parent = self.clone();
        if parent.entry.take().is_some() {
            return Some(parent);
        }
        let last = parent.archives.pop()?;
        parent.entry = Some(last);
        Some(parent)
    }
}

impl fmt::Display for EntryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for archive in &self.archives {
            write!(f, "{}{}", SEPARATOR, encode_path(archive))?;
        }
        f.write_str(SEPARATOR)?;
        if let Some(entry) = &self.entry {
            f.write_str(&encode_path(entry))?;
        }
        Ok(())
    }
}

impl FromStr for EntryLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}
