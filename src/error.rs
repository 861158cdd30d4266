use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GtexError {
    #[error("invalid transcript id: {0}")]
    InvalidTranscriptId(String),

    #[error("invalid session header: {0}")]
    InvalidHeader(String),

    #[error("missing config file gtexquery.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("GTEx returned status {status}: {message}")]
    GtexStatus { status: u16, message: String },

    #[error("BioMart returned status {status}: {message}")]
    BiomartStatus { status: u16, message: String },

    #[error("BioMart kept reporting a query error for {transcript} after {attempts} attempts")]
    #[diagnostic(help("the service reports failures inside a 200 response; try again later"))]
    BiomartTimeout { transcript: String, attempts: usize },

    #[error("BioMart returned no annotation for {0}")]
    MissingAnnotation(String),

    #[error("there are no transcripts to query in {0}")]
    EmptyInput(String),

    #[error("column {column} not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("failed to parse table: {0}")]
    Parse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("{failed} of {total} batch jobs failed")]
    Batch { failed: usize, total: usize },
}
