use chrono::NaiveDate;
use replybot_core::{CoreError, DailyStats, ErrorExt, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};


/// Flat JSON file holding today's counters. Every save rewrites the whole file.
#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Counters for `today`. A missing file, or one written on another day,
    /// yields fresh zeroed counters.
    pub async fn load(&self, today: NaiveDate) -> Result<DailyStats, CoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stats file at {}, starting fresh", self.path.display());
                return Ok(DailyStats::new(today));
            }
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
        };

        let stored: DailyStats =
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                path: self.path.display().to_string(),
                details: e.to_string(),
            })?;

        if stored.is_for(today) {
            Ok(stored)
        } else {
            info!(
                "Stats file is from {}, resetting counters for {}",
                stored.date, today
            );
            Ok(DailyStats::new(today))
        }
    }

    /// Like [`load`](Self::load) but never fails: read problems are logged and
    /// fresh counters are returned.
    pub async fn load_or_fresh(&self, today: NaiveDate) -> DailyStats {
        match self.load(today).await {
            Ok(stats) => stats,
            Err(e) => {
                e.log_warn();
                DailyStats::new(today)
            }
        }
    }

    pub async fn save(&self, stats: &DailyStats) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(stats)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StorageError::WriteFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!("Saved stats to {}", self.path.display());
        Ok(())
    }
}
