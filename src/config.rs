use std::time::Duration;

/// Default location of nested libraries inside an application archive
pub const DEFAULT_LIBRARY_PREFIX: &str = "lib/";

/// Settings shared by every connection a [`Resolver`](crate::Resolver) creates.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Prefix under which nested library archives are stored
    pub library_prefix: String,
    /// Per-request timeout for HTTP backed roots
    pub http_timeout: Duration,
    /// Attempts per HTTP range read before giving up
    pub http_max_retry: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            library_prefix: DEFAULT_LIBRARY_PREFIX.to_string(),
            http_timeout: Duration::from_secs(30),
            http_max_retry: 10,
        }
    }
}

impl ResolverConfig {
    pub fn with_library_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.library_prefix = prefix.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_http_max_retry(mut self, max_retry: u32) -> Self {
        self.http_max_retry = max_retry;
        self
    }
}
