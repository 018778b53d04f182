//! Serde model of the Prometheus configuration subset this system owns.
//!
//! Only the fields scrapesync reads and writes are modeled; everything is
//! defaulted so a hand-edited or partially written file still loads.

use serde::{Deserialize, Serialize};

/// The document written to (and read from) the target file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub scrape_configs: Vec<ScrapeConfig>,
}

/// Global scrape settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub scrape_interval: String,
}

/// One published job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub job_name: String,
    #[serde(default)]
    pub static_configs: Vec<StaticConfig>,
}

/// One static target group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default)]
    pub targets: Vec<String>,
}
