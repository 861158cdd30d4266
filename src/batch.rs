use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use serde::Serialize;

use crate::annotation::fetch_annotations_with;
use crate::config::{Job, ResolvedConfig};
use crate::error::GtexError;
use crate::expression::{ExpressionOutcome, fetch_expression_with};
use crate::lookup::{LookupTable, resolve};
use crate::session::{DEFAULT_HEADERS, Transport, get_session};
use crate::table::read_transcripts;

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub gene: String,
    pub region: String,
    pub identifier: String,
    pub expression: ExpressionOutcome,
    pub expression_path: Option<String>,
    pub annotation_rows: Option<usize>,
    pub annotation_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub items: Vec<JobReport>,
    pub failures: Vec<JobFailure>,
}

#[derive(Debug, Serialize)]
pub struct JobFailure {
    pub gene: String,
    pub region: String,
    pub error: String,
}

impl BatchReport {
    pub fn into_result(self) -> Result<Self, GtexError> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        Err(GtexError::Batch {
            failed: self.failures.len(),
            total: self.failures.len() + self.items.len(),
        })
    }
}

pub fn expression_path(output_dir: &Utf8Path, job: &Job) -> Utf8PathBuf {
    output_dir.join(format!("{}_{}.csv", job.gene, job.region))
}

pub fn annotation_path(output_dir: &Utf8Path, job: &Job) -> Utf8PathBuf {
    output_dir.join(format!("{}_{}_biomart.csv", job.gene, job.region))
}

/// Runs every configured job on a pool of `config.threads` workers, each worker
/// reusing its own thread-local session.
pub fn run_batch(config: &ResolvedConfig, lookup: &LookupTable) -> Result<BatchReport, GtexError> {
    run_batch_with(config, lookup, || get_session(Some(DEFAULT_HEADERS), None))
}

/// Like [`run_batch`], with `connect` supplying the transport for each job.
pub fn run_batch_with<T, F>(
    config: &ResolvedConfig,
    lookup: &LookupTable,
    connect: F,
) -> Result<BatchReport, GtexError>
where
    T: Transport,
    F: Fn() -> Result<T, GtexError> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|index| format!("gtexquery-worker-{index}"))
        .build()
        .map_err(|err| GtexError::ThreadPool(err.to_string()))?;

    tracing::info!(jobs = config.jobs.len(), threads = config.threads, "starting batch");
    let results = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| {
                let transport = connect()?;
                run_job(&transport, config, lookup, job)
            })
            .collect::<Vec<_>>()
    });

    let mut report = BatchReport {
        items: Vec::new(),
        failures: Vec::new(),
    };
    for (job, result) in config.jobs.iter().zip(results) {
        match result {
            Ok(item) => report.items.push(item),
            Err(err) => {
                tracing::error!(gene = %job.gene, region = %job.region, error = %err, "job failed");
                report.failures.push(JobFailure {
                    gene: job.gene.clone(),
                    region: job.region.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(report)
}

fn run_job<T: Transport + ?Sized>(
    transport: &T,
    config: &ResolvedConfig,
    lookup: &LookupTable,
    job: &Job,
) -> Result<JobReport, GtexError> {
    let identifier = resolve(&job.gene, lookup);
    let expression_file = expression_path(&config.output_dir, job);
    let expression = fetch_expression_with(
        transport,
        &config.gtex,
        &job.region,
        &identifier,
        expression_file.as_std_path(),
    )?;

    let mut report = JobReport {
        gene: job.gene.clone(),
        region: job.region.clone(),
        identifier,
        expression,
        expression_path: None,
        annotation_rows: None,
        annotation_path: None,
    };
    match expression {
        ExpressionOutcome::Skipped => return Ok(report),
        ExpressionOutcome::Written { rows } => {
            report.expression_path = Some(expression_file.to_string());
            if rows == 0 {
                tracing::info!(gene = %job.gene, region = %job.region, "no expressed transcripts");
                return Ok(report);
            }
        }
    }

    let transcripts = read_transcripts(expression_file.as_std_path())?;
    let annotation_file = annotation_path(&config.output_dir, job);
    let rows = fetch_annotations_with(
        transport,
        &config.biomart,
        &transcripts,
        annotation_file.as_std_path(),
    )?;
    report.annotation_rows = Some(rows);
    report.annotation_path = Some(annotation_file.to_string());
    Ok(report)
}
