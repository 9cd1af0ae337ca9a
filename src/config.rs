//! Runtime configuration for hosts embedding the decode pool.
//!
//! Settings come from command-line flags or environment variables with the
//! `GEOTIFF_` prefix:
//!
//! - `GEOTIFF_POOL_SIZE` - Number of decode workers (default: host
//!   parallelism, 0 decodes on the caller's task)
//! - `GEOTIFF_WORKER_PREFIX` - Name prefix for worker threads
//!   (default: geotiff-decode)
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use geotiff_codec::config::{init_logging, Config};
//!
//! let config = Config::parse();
//! config.validate().expect("invalid configuration");
//! init_logging(config.verbose);
//!
//! let pool = config.build_pool();
//! ```

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::decode::{default_pool_size, DecoderRegistry, Pool, ThreadWorkerFactory};

// =============================================================================
// Default Values
// =============================================================================

/// Default worker thread name prefix.
pub const DEFAULT_WORKER_PREFIX: &str = "geotiff-decode";

/// Largest accepted pool size.
pub const MAX_POOL_SIZE: usize = 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Decode pool and logging settings.
#[derive(Parser, Debug, Clone)]
#[command(name = "geotiff-codec")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Number of decode workers.
    ///
    /// Defaults to the host's available parallelism. Zero decodes every
    /// chunk on the calling task.
    #[arg(long, env = "GEOTIFF_POOL_SIZE")]
    pub pool_size: Option<usize>,

    /// Name prefix for worker threads; the slot index is appended.
    #[arg(long, default_value = DEFAULT_WORKER_PREFIX, env = "GEOTIFF_WORKER_PREFIX")]
    pub worker_name_prefix: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(size) = self.pool_size {
            if size > MAX_POOL_SIZE {
                return Err(format!("pool_size must be at most {MAX_POOL_SIZE}"));
            }
        }

        if self.worker_name_prefix.is_empty() {
            return Err("worker_name_prefix must not be empty".to_string());
        }
        if self.worker_name_prefix.contains('\0') {
            return Err("worker_name_prefix must not contain NUL bytes".to_string());
        }

        Ok(())
    }

    /// Pool size after applying the default.
    pub fn effective_pool_size(&self) -> usize {
        self.pool_size.unwrap_or_else(default_pool_size)
    }

    /// Build a thread-backed pool bound to the global decoder registry.
    pub fn build_pool(&self) -> Pool {
        self.build_pool_with(DecoderRegistry::global())
    }

    /// Build a thread-backed pool bound to `registry`.
    pub fn build_pool_with(&self, registry: Arc<DecoderRegistry>) -> Pool {
        Pool::new(
            self.effective_pool_size(),
            Arc::new(ThreadWorkerFactory::new(self.worker_name_prefix.clone())),
            registry,
        )
    }
}

/// Install a formatting subscriber filtered by `RUST_LOG`, or by
/// `geotiff_codec=info` (`debug` when verbose) if it is unset.
///
/// Does nothing when a global subscriber is already installed.
pub fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "geotiff_codec=debug"
    } else {
        "geotiff_codec=info"
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

// =============================================================================
// Tests
// =============================================================================
