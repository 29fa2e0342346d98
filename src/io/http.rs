use reqwest::blocking::Client;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;
use crate::error::{Error, Result};

/// HTTP Range reader for remote archives
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// This will send a HEAD request to verify Range support and get file size
    pub fn new(url: String, timeout: Duration, max_retry: u32) -> Result<Self> {
        let remote = |reason: String| Error::Remote {
            url: url.clone(),
            reason,
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| remote(e.to_string()))?;

        // Send HEAD request to check capabilities
        let resp = client.head(&url).send().map_err(|e| remote(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(remote(format!("HEAD request failed with status {}", resp.status())));
        }

        // Check if server supports Range requests
        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");

        if !accept_ranges.contains("bytes") {
            return Err(remote("server does not support Range requests".to_string()));
        }

        // Get file size from Content-Length
        let size = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| remote("server did not return Content-Length".to_string()))?;

        debug!(url = %url, size, "opened remote archive");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: max_retry.max(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReadAt for HttpRangeReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Some(end) = range_end(offset, buf.len(), self.size) else {
            return Ok(0);
        };
        let expected_size = (end - offset + 1) as usize;

        let mut received = 0;
        let mut retry_count = 0;

        while received < expected_size {
            let current_start = offset + received as u64;
            let range = format!("bytes={}-{}", current_start, end);

            let result = self.client.get(&self.url).header("Range", &range).send();

            match result {
                Ok(resp) => {
                    if resp.status() != reqwest::StatusCode::PARTIAL_CONTENT {
                        return Err(io::Error::other(format!(
                            "range request to {} failed with status {}",
                            self.url,
                            resp.status()
                        )));
                    }

                    let bytes = resp.bytes().map_err(io::Error::other)?;
                    let chunk_len = copy_chunk(&mut buf[received..expected_size], &bytes)
                        .map_err(|e| io::Error::new(e.kind(), format!("{} {}: {}", self.url, range, e)))?;
                    received += chunk_len;

                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("max retries exceeded for {}", self.url),
                        ));
                    }
                    warn!(
                        url = %self.url,
                        retry = retry_count,
                        max_retry = self.max_retry,
                        "connection error: {}",
                        e
                    );
                    std::thread::sleep(Duration::from_millis(500 * retry_count as u64));
                }
                Err(e) => return Err(io::Error::other(e)),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identity(&self) -> &str {
        &self.url
    }

    fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

/// Inclusive last byte of a `len` byte read at `offset`, clamped to `size`.
///
/// `None` when nothing can be read.
fn range_end(offset: u64, len: usize, size: u64) -> Option<u64> {
    if len == 0 || offset >= size {
        return None;
    }
    Some(offset.saturating_add(len as u64 - 1).min(size - 1))
}

/// Copy a response body into the unfilled part of the caller's buffer.
///
/// Servers may send more than asked for; the excess is dropped. An empty
/// body would make no progress, so it is an error.
fn copy_chunk(unfilled: &mut [u8], body: &[u8]) -> io::Result<usize> {
    if body.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "server returned an empty range",
        ));
    }
    let n = body.len().min(unfilled.len());
    unfilled[..n].copy_from_slice(&body[..n]);
    Ok(n)
}
