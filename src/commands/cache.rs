//! Cache maintenance command.

use crate::config::Config;
use crate::ecs::Cache;
use anyhow::{Context, Result};
use tracing::info;

/// Removes entries from the response cache.
pub struct CacheCommand {
    config: Config,
}

impl CacheCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Flushes every entry, or only stale ones when `expired_only` is set.
    pub fn flush(&self, expired_only: bool) -> Result<String> {
        let dir = self.config.cache_dir.clone().unwrap_or_else(Cache::default_dir);
        let cache = Cache::new(&dir)
            .with_context(|| format!("Failed to open cache at {}", dir.display()))?;

        let removed = if expired_only { cache.flush_expired()? } else { cache.flush_all()? };
        info!("Removed {} entries from {}", removed, dir.display());

        Ok(format!("Removed {} cache entr{} from {}", removed, plural(removed), dir.display()))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}
