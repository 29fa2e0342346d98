//! Connection factory: turns locator strings into resolved archives.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::cache::ArchiveCache;
use crate::config::ResolverConfig;
use crate::connection::ResourceConnection;
use crate::error::{Error, Result};
use crate::io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
use crate::locator::{EntryLocator, decode_path};
use crate::zip::ArchiveHandle;

const FILE_SCHEME: &str = "file:";
const MEMORY_SCHEME: &str = "mem:";

/// Creates [`ResourceConnection`]s and owns the archive cache they share.
///
/// Cloning a resolver is cheap; clones share the cache, the registered
/// in-memory buffers and the configuration.
#[derive(Clone, Default)]
pub struct Resolver {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    config: ResolverConfig,
    cache: ArchiveCache,
    buffers: RwLock<HashMap<String, Arc<MemoryReader>>>,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                cache: ArchiveCache::new(),
                buffers: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.inner.cache
    }

    /// Make `bytes` addressable as the root container `mem:<name>`.
    ///
    /// Registering a name again replaces the buffer and drops every
    /// cached archive, root or nested, parsed from the old one.
    pub fn register_memory(&self, name: &str, bytes: impl Into<Arc<[u8]>>) -> String {
        let reader = Arc::new(MemoryReader::new(name, bytes));
        let container = reader.identity().to_string();
        let mut buffers = self.inner.buffers.write().unwrap_or_else(|e| e.into_inner());
        if buffers.insert(container.clone(), reader).is_some() {
            let evicted = self.inner.cache.evict_backing(&container);
            debug!(container = %container, evicted, "replaced in-memory archive");
        }
        container
    }

    /// Decode `locator` into an unconnected connection.
    pub fn connection(&self, locator: &str) -> Result<ResourceConnection> {
        let locator = EntryLocator::decode(locator)?;
        Ok(self.connection_for(locator))
    }

    pub fn connection_for(&self, locator: EntryLocator) -> ResourceConnection {
        ResourceConnection::new(self.clone(), locator)
    }

    /// Open the backing source named by a root container.
    pub fn open_reader(&self, container: &str) -> Result<Arc<dyn ReadAt>> {
        if container.starts_with(MEMORY_SCHEME) {
            let buffers = self.inner.buffers.read().unwrap_or_else(|e| e.into_inner());
            let reader = buffers.get(container).ok_or_else(|| Error::UnknownSource {
                container: container.to_string(),
            })?;
            return Ok(Arc::clone(reader) as Arc<dyn ReadAt>);
        }

        if container.starts_with("http://") || container.starts_with("https://") {
            let config = &self.inner.config;
            let reader = HttpRangeReader::new(
                container.to_string(),
                config.http_timeout,
                config.http_max_retry,
            )?;
            return Ok(Arc::new(reader));
        }

        let path = file_path(container)?;
        let reader = LocalFileReader::new(&path)?;
        debug!(path = %path.display(), size = reader.size(), "opened archive file");
        Ok(Arc::new(reader))
    }

    /// Root archive of `container`, parsed once per backing and cached.
    ///
    /// Handles are keyed by the backing's identity, so `file:/a.jar`,
    /// `file:///a.jar` and `/a.jar` share one parsed index. The root
    /// handle is named by that identity, not by the container as written.
    pub fn open_root(&self, container: &str) -> Result<Arc<ArchiveHandle>> {
        let cache = &self.inner.cache;
        // Canonical containers are their backing's identity
        if let Some(handle) = cache.get(&(container.to_string(), 0)) {
            return Ok(handle);
        }
        let reader = self.open_reader(container)?;
        let key = (reader.identity().to_string(), 0);
        cache.get_or_try_insert(key, || ArchiveHandle::open_root(reader))
    }

    /// Walk the nested archive chain of `locator`, ignoring its terminal entry.
    pub fn resolve_archive(&self, locator: &EntryLocator) -> Result<Arc<ArchiveHandle>> {
        let mut archive = self.open_root(locator.container_root())?;
        for name in locator.archives() {
            let data = archive.nested_source(name)?;
            let container = archive.entry_url(name);
            let key = (data.identity().to_string(), data.absolute_offset());
            archive = self
                .inner
                .cache
                .get_or_try_insert(key, || ArchiveHandle::open(data, container))?;
        }
        Ok(archive)
    }
}

/// Local path named by a `file:` URL or a bare absolute path.
fn file_path(container: &str) -> Result<PathBuf> {
    let encoded = match container.strip_prefix(FILE_SCHEME) {
        Some(rest) => rest.strip_prefix("//").filter(|p| p.starts_with('/')).unwrap_or(rest),
        None if PathBuf::from(container).is_absolute() => container,
        None => {
            return Err(Error::UnknownSource {
                container: container.to_string(),
            });
        }
    };
    let bytes = decode_path(encoded)?;
    let path = String::from_utf8(bytes).map_err(|_| Error::MalformedLocator {
        locator: container.to_string(),
        reason: "file path is not valid UTF-8".to_string(),
    })?;
    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_paths_from_containers() {
        assert_eq!(file_path("file:/tmp/app.jar").unwrap(), PathBuf::from("/tmp/app.jar"));
        assert_eq!(file_path("file:///tmp/app.jar").unwrap(), PathBuf::from("/tmp/app.jar"));
        assert_eq!(file_path("file:/tmp/my%20app.jar").unwrap(), PathBuf::from("/tmp/my app.jar"));
        assert!(matches!(
            file_path("ftp://host/app.jar"),
            Err(Error::UnknownSource { .. })
        ));
    }

    #[test]
    fn unregistered_memory_container_is_unknown() {
        let resolver = Resolver::default();
        assert!(matches!(
            resolver.open_reader("mem:nothing"),
            Err(Error::UnknownSource { .. })
        ));
    }
}
