//! TargetsFile — load and publish the on-disk target state.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{TargetsError, TargetsResult};
use crate::schema::{GlobalConfig, PrometheusConfig, ScrapeConfig, StaticConfig};

/// The reconciled view: job name → resolved `host:port` address.
///
/// `BTreeMap` so the published file has a deterministic entry order.
pub type TargetMap = BTreeMap<String, String>;

/// Handle on the persisted target-state file.
#[derive(Debug, Clone)]
pub struct TargetsFile {
    path: PathBuf,
    scrape_interval: String,
}

impl TargetsFile {
    /// Create a handle for the file at `path`, publishing the given global
    /// scrape interval (e.g. `"60s"`).
    pub fn new(path: impl Into<PathBuf>, scrape_interval: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scrape_interval: scrape_interval.into(),
        }
    }

    /// The file path this handle reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current target state.
    ///
    /// A missing file is an empty state (first run). Job entries without a
    /// static config or without a target are skipped, not errors.
    pub fn load(&self) -> TargetsResult<TargetMap> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "target file absent, starting from empty state");
                return Ok(TargetMap::new());
            }
            Err(e) => return Err(TargetsError::Read(e.to_string())),
        };

        let config: PrometheusConfig =
            serde_yaml::from_str(&raw).map_err(|e| TargetsError::Parse(e.to_string()))?;

        let mut state = TargetMap::new();
        for scrape_config in config.scrape_configs {
            let target = scrape_config
                .static_configs
                .first()
                .and_then(|sc| sc.targets.first());
            match target {
                Some(target) => {
                    state.insert(scrape_config.job_name, target.clone());
                }
                None => {
                    warn!(job = %scrape_config.job_name, "job entry has no target, skipping");
                }
            }
        }
        Ok(state)
    }

    /// Publish the full new target state, overwriting prior contents.
    ///
    /// One job entry per workload, exactly one static config with exactly
    /// one address. Written even for zero entries.
    pub fn publish(&self, targets: &TargetMap) -> TargetsResult<()> {
        let config = PrometheusConfig {
            global: GlobalConfig {
                scrape_interval: self.scrape_interval.clone(),
            },
            scrape_configs: targets
                .iter()
                .map(|(job_name, target)| ScrapeConfig {
                    job_name: job_name.clone(),
                    static_configs: vec![StaticConfig {
                        targets: vec![target.clone()],
                    }],
                })
                .collect(),
        };

        let raw =
            serde_yaml::to_string(&config).map_err(|e| TargetsError::Serialize(e.to_string()))?;

        // Write-then-rename, so an interrupted publish never leaves a
        // half-written file for the next cycle (or the scraper) to choke on.
        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, raw).map_err(|e| TargetsError::Write(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| TargetsError::Write(e.to_string()))?;

        debug!(path = ?self.path, jobs = targets.len(), "target state published");
        Ok(())
    }
}
