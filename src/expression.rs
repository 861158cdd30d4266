use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{EXPRESSION_COLUMNS, ExpressionRecord, is_canonical_gene_id};
use crate::error::GtexError;
use crate::session::{DEFAULT_HEADERS, Transport, get_session};
use crate::table::{parse_tsv, write_csv_atomic};

pub const GTEX_URL: &str = "https://gtexportal.org/rest/v1/expression/mediantranscriptexpression";
pub const GTEX_DATASET: &str = "gtex_v8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GtexEndpoint {
    pub url: String,
    pub dataset_id: String,
}

impl Default for GtexEndpoint {
    fn default() -> Self {
        Self {
            url: GTEX_URL.to_string(),
            dataset_id: GTEX_DATASET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ExpressionOutcome {
    /// The gene had no canonical identifier; nothing was requested or written.
    Skipped,
    Written { rows: usize },
}

/// Queries GTEx for `identifier` in `region` on this thread's session and writes the
/// normalized table to `output`.
pub fn fetch_expression(
    region: &str,
    identifier: &str,
    output: &Path,
) -> Result<ExpressionOutcome, GtexError> {
    let session = get_session(Some(DEFAULT_HEADERS), None)?;
    fetch_expression_with(&*session, &GtexEndpoint::default(), region, identifier, output)
}

pub fn fetch_expression_with<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &GtexEndpoint,
    region: &str,
    identifier: &str,
    output: &Path,
) -> Result<ExpressionOutcome, GtexError> {
    if !is_canonical_gene_id(identifier) {
        tracing::warn!(gene = identifier, region, "gene not found in gencode, skipping");
        return Ok(ExpressionOutcome::Skipped);
    }

    let response = transport.get(
        &endpoint.url,
        &[
            ("datasetId", endpoint.dataset_id.as_str()),
            ("tissueSiteDetailId", region),
            ("format", "tsv"),
            ("gencodeId", identifier),
        ],
    )?;
    if !response.is_success() {
        tracing::error!(
            url = %response.url,
            status = response.status,
            gene = identifier,
            region,
            body = %response.body,
            "GTEx request failed"
        );
        return Err(GtexError::GtexStatus {
            status: response.status,
            message: response.body,
        });
    }
    tracing::info!(gene = identifier, region, "GTEx request successful");

    let records = normalize_expression(parse_tsv(&response.body)?);
    write_csv_atomic(output, &EXPRESSION_COLUMNS, &records)?;
    Ok(ExpressionOutcome::Written {
        rows: records.len(),
    })
}

/// Keeps expressed transcripts, highest median first, with version suffixes removed.
pub fn normalize_expression(records: Vec<ExpressionRecord>) -> Vec<ExpressionRecord> {
    let mut records = records
        .into_iter()
        .filter(|record| record.median > 0.0)
        .collect::<Vec<_>>();
    records.sort_by(|a, b| b.median.total_cmp(&a.median));
    for record in &mut records {
        record.strip_versions();
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(transcript: &str, median: f64) -> ExpressionRecord {
        ExpressionRecord {
            gencode_id: "ENSG00000144355.14".to_string(),
            gene_symbol: "DLX1".to_string(),
            tissue_site_detail_id: "Brain_Hypothalamus".to_string(),
            transcript_id: transcript.to_string(),
            median,
            unit: "read count".to_string(),
            dataset_id: "gtex_v8".to_string(),
        }
    }

    #[test]
    fn drops_unexpressed_and_sorts_descending() {
        let records = normalize_expression(vec![
            record("ENST00000361609.4", 0.24),
            record("ENST00000469444.6", 0.0),
            record("ENST00000341900.6", 5.18),
            record("ENST00000361725.4", 3.16),
        ]);
        let ids = records
            .iter()
            .map(|record| record.transcript_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec!["ENST00000341900", "ENST00000361725", "ENST00000361609"]
        );
        assert!(records.iter().all(|record| record.gencode_id == "ENSG00000144355"));
    }
}
