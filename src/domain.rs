use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::GtexError;

/// Prefix carried by every canonical Ensembl/GENCODE gene identifier.
pub const GENE_ID_PREFIX: &str = "ENSG";

pub const EXPRESSION_COLUMNS: [&str; 7] = [
    "gencodeId",
    "geneSymbol",
    "tissueSiteDetailId",
    "transcriptId",
    "median",
    "unit",
    "datasetId",
];

pub const ANNOTATION_COLUMNS: [&str; 4] = ["geneSymbol", "gencodeId", "transcriptId", "refseq"];

static TRANSCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ENS[A-Z]*T\d+$").expect("valid transcript regex"));

/// Drops the dotted version suffix, `ENSG00000144355.14` becomes `ENSG00000144355`.
pub fn strip_version(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

pub fn is_canonical_gene_id(id: &str) -> bool {
    id.starts_with(GENE_ID_PREFIX)
}

/// Version-less transcript identifier, the join key between GTEx and BioMart rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptId(String);

impl TranscriptId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TranscriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TranscriptId {
    type Err = GtexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = strip_version(value.trim()).to_uppercase();
        if !TRANSCRIPT_RE.is_match(&normalized) {
            return Err(GtexError::InvalidTranscriptId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// One row of the median transcript expression table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionRecord {
    pub gencode_id: String,
    pub gene_symbol: String,
    pub tissue_site_detail_id: String,
    pub transcript_id: String,
    pub median: f64,
    pub unit: String,
    pub dataset_id: String,
}

impl ExpressionRecord {
    pub fn strip_versions(&mut self) {
        self.gencode_id = strip_version(&self.gencode_id).to_string();
        self.transcript_id = strip_version(&self.transcript_id).to_string();
    }
}

/// One BioMart annotation row. An empty `refseq` means the transcript has no RefSeq mRNA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub gene_symbol: String,
    pub gencode_id: String,
    pub transcript_id: String,
    pub refseq: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationMode {
    /// One query per transcript, with in-band error retries.
    #[default]
    PerTranscript,
    /// A single query filtering on every transcript at once.
    Bulk,
}

impl fmt::Display for AnnotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationMode::PerTranscript => write!(f, "per-transcript"),
            AnnotationMode::Bulk => write!(f, "bulk"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn strips_dotted_version() {
        assert_eq!(strip_version("ENSG00000144355.14"), "ENSG00000144355");
        assert_eq!(strip_version("ENST00000341900"), "ENST00000341900");
    }

    #[test]
    fn canonical_prefix() {
        assert!(is_canonical_gene_id("ENSG00000139352.3"));
        assert!(!is_canonical_gene_id("NotAGene"));
    }

    #[test]
    fn parse_transcript_id_strips_version() {
        let id: TranscriptId = "enst00000341900.6".parse().unwrap();
        assert_eq!(id.as_str(), "ENST00000341900");
    }

    #[test]
    fn parse_transcript_id_invalid() {
        let err = "ENSG00000144355".parse::<TranscriptId>().unwrap_err();
        assert_matches!(err, GtexError::InvalidTranscriptId(_));
    }
}
