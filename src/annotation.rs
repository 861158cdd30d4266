use std::path::Path;

use crate::domain::{ANNOTATION_COLUMNS, AnnotationMode, AnnotationRecord, TranscriptId};
use crate::error::GtexError;
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::session::{DEFAULT_HEADERS, TextResponse, Transport, get_session};
use crate::table::{parse_tsv_rows, write_csv_atomic};

pub const BIOMART_URL: &str = "http://www.ensembl.org/biomart/martservice";
pub const BIOMART_DATASET: &str = "hsapiens_gene_ensembl";
const BIOMART_ATTRIBUTES: [&str; 4] = [
    "hgnc_symbol",
    "ensembl_gene_id",
    "ensembl_transcript_id",
    "refseq_mrna",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiomartEndpoint {
    pub url: String,
    pub mode: AnnotationMode,
    pub retry: RetryPolicy,
}

impl Default for BiomartEndpoint {
    fn default() -> Self {
        Self {
            url: BIOMART_URL.to_string(),
            mode: AnnotationMode::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Builds the BioMart XML query asking for symbol, gene, transcript and RefSeq mRNA of
/// every transcript in `transcripts`.
pub fn biomart_query(transcripts: &[TranscriptId], header: bool) -> String {
    let mut query = String::new();
    write_biomart_query(&mut query, transcripts, header);
    query
}

fn write_biomart_query(buf: &mut String, transcripts: &[TranscriptId], header: bool) {
    let filter = transcripts
        .iter()
        .map(TranscriptId::as_str)
        .collect::<Vec<_>>()
        .join(",");
    buf.push_str("<?xml version='1.0' encoding='UTF-8'?><!DOCTYPE Query>");
    buf.push_str(&format!(
        "<Query  virtualSchemaName = 'default' formatter = 'TSV' header = '{}' \
         uniqueRows = '0' count = '' datasetConfigVersion = '0.6' >",
        u8::from(header)
    ));
    buf.push_str(&format!(
        "<Dataset name = '{BIOMART_DATASET}' interface = 'default' >\
         <Filter name = 'ensembl_transcript_id' value = '{filter}'/>"
    ));
    for attribute in BIOMART_ATTRIBUTES {
        buf.push_str(&format!("<Attribute name = '{attribute}' />"));
    }
    buf.push_str("</Dataset></Query>");
}

/// Queries BioMart for `transcripts` on this thread's session with the default
/// endpoint and writes the annotation table to `output`.
pub fn fetch_annotations(
    transcripts: &[TranscriptId],
    output: &Path,
) -> Result<usize, GtexError> {
    let session = get_session(Some(DEFAULT_HEADERS), None)?;
    fetch_annotations_with(&*session, &BiomartEndpoint::default(), transcripts, output)
}

/// Returns the number of annotation rows written.
pub fn fetch_annotations_with<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &BiomartEndpoint,
    transcripts: &[TranscriptId],
    output: &Path,
) -> Result<usize, GtexError> {
    if transcripts.is_empty() {
        tracing::error!(output = %output.display(), "no transcripts to query");
        return Err(GtexError::EmptyInput(output.display().to_string()));
    }

    let records = match endpoint.mode {
        AnnotationMode::Bulk => bulk_request(transport, endpoint, transcripts)?,
        AnnotationMode::PerTranscript => {
            let mut session = AnnotationSession::new(transport, endpoint);
            let mut records = Vec::with_capacity(transcripts.len());
            for transcript in transcripts {
                records.extend(session.request(transcript)?);
            }
            records
        }
    };

    write_csv_atomic(output, &ANNOTATION_COLUMNS, &records)?;
    tracing::info!(
        transcripts = transcripts.len(),
        rows = records.len(),
        mode = %endpoint.mode,
        "BioMart annotations written"
    );
    Ok(records.len())
}

fn bulk_request<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &BiomartEndpoint,
    transcripts: &[TranscriptId],
) -> Result<Vec<AnnotationRecord>, GtexError> {
    let query = biomart_query(transcripts, true);
    let response = transport.get(&endpoint.url, &[("query", query.as_str())])?;
    let response = check_status(response, &transcript_list(transcripts))?;
    parse_annotation_rows(&response.body, true)
}

/// One query per transcript against a reused query buffer.
///
/// BioMart only answers for the last value of a multi-value transcript filter, so each
/// transcript is asked for on its own.
pub struct AnnotationSession<'a, T: Transport + ?Sized> {
    transport: &'a T,
    endpoint: &'a BiomartEndpoint,
    query: String,
}

impl<'a, T: Transport + ?Sized> AnnotationSession<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a BiomartEndpoint) -> Self {
        Self {
            transport,
            endpoint,
            query: String::new(),
        }
    }

    pub fn request(
        &mut self,
        transcript: &TranscriptId,
    ) -> Result<Vec<AnnotationRecord>, GtexError> {
        self.query.clear();
        write_biomart_query(&mut self.query, std::slice::from_ref(transcript), false);

        let transport = self.transport;
        let url = self.endpoint.url.as_str();
        let query = self.query.as_str();
        let outcome = self.endpoint.retry.run(|_| {
            let response = transport.get(url, &[("query", query)])?;
            check_status(response, transcript.as_str()).map(|response| response.body)
        })?;

        let body = match outcome {
            RetryOutcome::Ready { body, .. } => body,
            RetryOutcome::Exhausted { attempts } => {
                tracing::error!(
                    transcript = transcript.as_str(),
                    attempts,
                    "BioMart query timed out"
                );
                return Err(GtexError::BiomartTimeout {
                    transcript: transcript.to_string(),
                    attempts,
                });
            }
        };

        let records = parse_annotation_rows(&body, false)?;
        match records.len() {
            0 => {
                tracing::error!(transcript = transcript.as_str(), "no BioMart annotation");
                Err(GtexError::MissingAnnotation(transcript.to_string()))
            }
            1 => Ok(records),
            rows => {
                tracing::warn!(
                    transcript = transcript.as_str(),
                    rows,
                    "several BioMart annotations for one transcript"
                );
                Ok(records)
            }
        }
    }
}

fn check_status(response: TextResponse, requested: &str) -> Result<TextResponse, GtexError> {
    if response.is_success() {
        tracing::info!(transcripts = requested, "BioMart request successful");
        return Ok(response);
    }
    tracing::error!(
        url = %response.url,
        status = response.status,
        transcripts = requested,
        body = %response.body,
        "BioMart request failed"
    );
    Err(GtexError::BiomartStatus {
        status: response.status,
        message: response.body,
    })
}

/// Maps BioMart's four positional columns onto the canonical annotation fields,
/// whatever the wire header calls them.
pub fn parse_annotation_rows(
    body: &str,
    has_header: bool,
) -> Result<Vec<AnnotationRecord>, GtexError> {
    parse_tsv_rows(body, has_header)?
        .into_iter()
        .map(|row| match <[String; 4]>::try_from(row) {
            Ok([gene_symbol, gencode_id, transcript_id, refseq]) => Ok(AnnotationRecord {
                gene_symbol,
                gencode_id,
                transcript_id,
                refseq,
            }),
            Err(row) => Err(GtexError::Parse(format!(
                "expected 4 BioMart columns, found {}: {}",
                row.len(),
                row.join("\t")
            ))),
        })
        .collect()
}

fn transcript_list(transcripts: &[TranscriptId]) -> String {
    transcripts
        .iter()
        .map(TranscriptId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
