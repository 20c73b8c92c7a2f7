#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context as _;
use glide_db::SqliteStore;
use glide_rollup::{Collaborators, GlideConfig, NoopSettlement, RoleRegistry, Rollup, SystemClock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Rollup backed by one SQLite database serving as both store and queue.
pub type SqliteRollup = Rollup<SqliteStore>;

/// Default initialization of logging.
///
/// `RUST_LOG` wins over `level` when it is set.
pub fn initialize_logging(level: tracing::Level) -> anyhow::Result<()> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| level.as_str().to_lowercase());
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_str(&directives).context("Invalid log filter")?)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    log_panics::init();
    Ok(())
}

/// Opens the database under `config.storage.path` and recovers the rollup
/// from it, with roles seeded from the config.
pub fn open_rollup(config: GlideConfig) -> anyhow::Result<SqliteRollup> {
    let store = Arc::new(open_store(&config.storage.path)?);
    let collaborators = Collaborators {
        clock: Arc::new(SystemClock),
        authorizer: Arc::new(RoleRegistry::from_config(&config.roles)),
        settlement: Arc::new(NoopSettlement),
    };
    Rollup::new(config.rollup, store, collaborators)
        .context("Failed to recover rollup state")
}

fn open_store(path: &Path) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(path)
        .with_context(|| format!("Failed to open database in {}", path.display()))
}
