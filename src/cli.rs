use clap::Parser;
use std::time::Duration;

use crate::config::{DEFAULT_LIBRARY_PREFIX, ResolverConfig};
use crate::locator::{SEPARATOR, encode_path};

#[derive(Parser, Debug)]
#[command(name = "nestjar")]
#[command(version)]
#[command(about = "Read entries of nested archives without extracting them", long_about = None)]
#[command(after_help = "Examples:\n  \
  nestjar 'file:/srv/app.jar!/'                         list entries of app.jar\n  \
  nestjar 'file:/srv/app.jar!/lib/x.jar!/greeting.txt'  print an entry of a nested archive\n  \
  nestjar -m 'file:/srv/app.jar!/'                      show the manifest\n  \
  nestjar -c https://example.com/app.jar!/              list nested libraries of a remote archive")]
pub struct Cli {
    /// Locator of an archive (ending in `!/`) or of an entry, or a plain archive path
    #[arg(value_name = "LOCATOR")]
    pub locator: String,

    /// Only list entries matching these patterns (`*` and `?` wildcards)
    #[arg(value_name = "PATTERNS")]
    pub patterns: Vec<String>,

    /// List entry names of the resolved archive
    #[arg(short = 'l')]
    pub list: bool,

    /// List entries verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print the manifest main attributes
    #[arg(short = 'm')]
    pub manifest: bool,

    /// List nested library archives as locators
    #[arg(short = 'c')]
    pub classpath: bool,

    /// Prefix under which nested libraries are stored
    #[arg(long = "lib-prefix", value_name = "PREFIX", default_value = DEFAULT_LIBRARY_PREFIX)]
    pub library_prefix: String,

    /// HTTP request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Attempts per HTTP range read
    #[arg(long = "retries", value_name = "N", default_value_t = 10)]
    pub retries: u32,

    /// Quiet mode, only warnings and errors are logged
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Log debug details to stderr
    #[arg(long = "debug", conflicts_with = "quiet")]
    pub debug: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.locator.starts_with("http://") || self.locator.starts_with("https://")
    }

    /// The locator argument; a bare archive path becomes its root locator.
    pub fn locator_string(&self) -> std::io::Result<String> {
        if self.locator.contains(SEPARATOR) {
            return Ok(self.locator.clone());
        }
        if self.is_http_url() || self.locator.starts_with("file:") {
            return Ok(format!("{}{}", self.locator, SEPARATOR));
        }
        let path = std::path::absolute(&self.locator)?;
        Ok(format!(
            "file:{}{}",
            encode_path(path.to_string_lossy().as_bytes()),
            SEPARATOR
        ))
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_library_prefix(self.library_prefix.clone())
            .with_http_timeout(Duration::from_secs(self.timeout))
            .with_http_max_retry(self.retries)
    }
}
