//! Logging setup for the command line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is
//! left to the binary. `RUST_LOG` overrides the level chosen here:
//!
//! ```bash
//! RUST_LOG=nestjar=trace nestjar app.jar!/
//! ```

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a compact stderr subscriber at `level` unless `RUST_LOG` is set.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nestjar={}", level)));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact(),
    );

    // Ignore the error if a subscriber is already installed
    let _ = tracing::subscriber::set_global_default(subscriber);
}
