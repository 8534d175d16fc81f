//! One-time seeding of an empty store with the demo corpus.
//!
//! Each region has its own `sample_logs_<region>.json` file. A region whose
//! file cannot be read or parsed is skipped; a failed insert transaction
//! aborts the whole bootstrap.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::error::{LogQueryError, Result};
use crate::model::DemoRecord;
use crate::store::LogStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionLoad {
    Loaded { region: String, rows: usize },
    Skipped { region: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub regions: Vec<RegionLoad>,
}

impl BootstrapReport {
    pub fn loaded_rows(&self) -> usize {
        self.regions
            .iter()
            .map(|r| match r {
                RegionLoad::Loaded { rows, .. } => *rows,
                RegionLoad::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.regions
            .iter()
            .filter_map(|r| match r {
                RegionLoad::Skipped { region, .. } => Some(region.as_str()),
                RegionLoad::Loaded { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    AlreadyPopulated { rows: u64 },
    Seeded(BootstrapReport),
}

#[derive(Debug, Clone)]
pub struct BootstrapLoader {
    base_dir: PathBuf,
    regions: Vec<String>,
}

impl BootstrapLoader {
    pub fn new(base_dir: impl Into<PathBuf>, regions: Vec<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            regions,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.demo_logs_path.clone(), config.regions.clone())
    }

    pub fn region_file(&self, region: &str) -> PathBuf {
        self.base_dir
            .join(format!("sample_logs_{}.json", region.to_lowercase()))
    }

    /// Load every configured region into `store`. Has no way to tell whether
    /// the rows are already present; see [`seed_if_empty`].
    pub async fn load(&self, store: &LogStore) -> Result<BootstrapReport> {
        info!(base_dir = %self.base_dir.display(), "loading demo logs");
        let mut report = BootstrapReport::default();

        for region in &self.regions {
            let path = self.region_file(region);
            let records = match read_records(&path).await {
                Ok(records) => records,
                Err(reason) => {
                    warn!(region = %region, path = %path.display(), %reason, "skipping demo logs");
                    report.regions.push(RegionLoad::Skipped {
                        region: region.clone(),
                        reason,
                    });
                    continue;
                }
            };

            let rows: Vec<(i64, String)> = records
                .into_iter()
                .map(|r| (r.raw.time, r.raw.log))
                .collect();
            let inserted = store
                .insert_batch(region, rows)
                .await
                .map_err(|e| LogQueryError::Bootstrap {
                    region: region.clone(),
                    reason: e.to_string(),
                })?;
            info!(region = %region, rows = inserted, "loaded demo logs");
            report.regions.push(RegionLoad::Loaded {
                region: region.clone(),
                rows: inserted,
            });
        }

        Ok(report)
    }
}

async fn read_records(path: &Path) -> std::result::Result<Vec<DemoRecord>, String> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| format!("could not load file: {e}"))?;
    serde_json::from_slice(&data).map_err(|e| format!("could not parse file: {e}"))
}

/// Run `loader` only if the store has no rows at all.
pub async fn seed_if_empty(store: &LogStore, loader: &BootstrapLoader) -> Result<SeedOutcome> {
    let rows = store.count().await?;
    if rows > 0 {
        info!(rows, "store already populated, skipping demo bootstrap");
        return Ok(SeedOutcome::AlreadyPopulated { rows });
    }

    let report = loader.load(store).await?;
    info!(
        rows = report.loaded_rows(),
        skipped = ?report.skipped(),
        "demo bootstrap finished"
    );
    Ok(SeedOutcome::Seeded(report))
}
