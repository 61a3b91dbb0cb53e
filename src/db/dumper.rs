//! Best-effort basket persistence: flush on graceful shutdown, restore on boot.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::config::{Config, ConfigTrait};

use super::basket::BasketSnapshot;
use super::BasketsDatabase;

/// Serializes every basket to a JSON file on shutdown and loads it back on
/// startup. Configs, responses, tokens, ring order and total counts survive
/// a restart; nothing is written while the service runs.
pub struct Dumper {
    enabled: bool,
    path: PathBuf,
}

impl Dumper {
    pub fn new(cfg: &Config) -> Self {
        let persistence = cfg.persistence();
        Self {
            enabled: persistence.map(|p| p.enabled).unwrap_or(false),
            path: persistence
                .and_then(|p| p.file.clone())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public/baskets.json")),
        }
    }

    /// Flushes all baskets to disk. Writes to a sibling temp file first and
    /// renames it into place so a crash mid-write never corrupts the dump.
    pub async fn dump(&self, db: &Arc<dyn BasketsDatabase>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let snapshots = db.snapshot().context("failed to snapshot baskets")?;
        let payload =
            serde_json::to_vec(&snapshots).context("failed to serialize basket snapshots")?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create dump directory {:?}", dir))?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &payload)
            .await
            .with_context(|| format!("failed to write dump file {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to move dump file into place at {:?}", self.path))?;

        info!(
            component = "dumper",
            event = "dump_success",
            path = ?self.path,
            baskets = snapshots.len(),
            "baskets flushed to disk"
        );
        Ok(())
    }

    /// Restores baskets from the dump file when one exists.
    /// A missing file is a normal first boot, not an error.
    pub async fn load(&self, db: &Arc<dyn BasketsDatabase>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    component = "dumper",
                    event = "load_skipped",
                    path = ?self.path,
                    "no dump file found"
                );
                return Ok(());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read dump file {:?}", self.path));
            }
        };

        let snapshots: Vec<BasketSnapshot> = match serde_json::from_slice(&raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    component = "dumper",
                    event = "load_failed",
                    path = ?self.path,
                    error = %e,
                    "dump file is unreadable, starting empty"
                );
                return Ok(());
            }
        };

        let count = snapshots.len();
        db.restore(snapshots).context("failed to restore baskets")?;

        info!(
            component = "dumper",
            event = "load_success",
            path = ?self.path,
            baskets = count,
            "baskets restored from disk"
        );
        Ok(())
    }
}
