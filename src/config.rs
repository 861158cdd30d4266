use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::annotation::{BIOMART_URL, BiomartEndpoint};
use crate::domain::AnnotationMode;
use crate::error::GtexError;
use crate::expression::{GTEX_DATASET, GTEX_URL, GtexEndpoint};
use crate::retry::{BIOMART_ERROR_MARKER, RetryPolicy};

pub const CONFIG_FILE: &str = "gtexquery.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub gtex: GtexSection,
    #[serde(default)]
    pub biomart: BiomartSection,
    #[serde(default)]
    pub lookup: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub genes: Vec<GeneEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GtexSection {
    pub url: String,
    pub dataset_id: String,
}

impl Default for GtexSection {
    fn default() -> Self {
        Self {
            url: GTEX_URL.to_string(),
            dataset_id: GTEX_DATASET.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BiomartSection {
    pub url: String,
    pub mode: AnnotationMode,
    pub retry: RetrySection,
}

impl Default for BiomartSection {
    fn default() -> Self {
        Self {
            url: BIOMART_URL.to_string(),
            mode: AnnotationMode::default(),
            retry: RetrySection::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: usize,
    pub delay_ms: u64,
    pub marker: String,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay_ms: 100,
            marker: BIOMART_ERROR_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GeneEntry {
    Shorthand(String),
    Detailed(GeneEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GeneEntryObject {
    pub symbol: String,
    #[serde(default)]
    pub regions: Option<Vec<String>>,
}

/// One gene in one tissue region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub gene: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub gtex: GtexEndpoint,
    pub biomart: BiomartEndpoint,
    pub lookup: Option<Utf8PathBuf>,
    pub output_dir: Utf8PathBuf,
    pub threads: usize,
    pub jobs: Vec<Job>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GtexError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(GtexError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GtexError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| GtexError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, GtexError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let threads = config.threads.unwrap_or_else(default_threads);
        if threads == 0 {
            return Err(GtexError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }

        let jobs = config
            .genes
            .into_iter()
            .flat_map(|entry| {
                let (symbol, regions) = match entry {
                    GeneEntry::Shorthand(symbol) => (symbol, config.regions.clone()),
                    GeneEntry::Detailed(obj) => (
                        obj.symbol,
                        obj.regions.unwrap_or_else(|| config.regions.clone()),
                    ),
                };
                regions.into_iter().map(move |region| Job {
                    gene: symbol.trim().to_string(),
                    region: region.trim().to_string(),
                })
            })
            .collect::<Vec<_>>();
        if let Some(job) = jobs
            .iter()
            .find(|job| job.gene.is_empty() || job.region.is_empty())
        {
            return Err(GtexError::InvalidConfig(format!(
                "empty gene or region in job {job:?}"
            )));
        }

        Ok(ResolvedConfig {
            schema_version,
            gtex: GtexEndpoint {
                url: config.gtex.url,
                dataset_id: config.gtex.dataset_id,
            },
            biomart: BiomartEndpoint {
                url: config.biomart.url,
                mode: config.biomart.mode,
                retry: RetryPolicy {
                    max_retries: config.biomart.retry.max_retries,
                    delay: Duration::from_millis(config.biomart.retry.delay_ms),
                    marker: config.biomart.retry.marker,
                },
            },
            lookup: config.lookup.map(Utf8PathBuf::from),
            output_dir: config
                .output_dir
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from("output")),
            threads,
            jobs,
        })
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}
