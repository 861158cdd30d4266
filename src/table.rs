use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::TranscriptId;
use crate::error::GtexError;

/// Parses a tab-separated body with a header row, matching columns to fields by name.
pub fn parse_tsv<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, GtexError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(body.trim_start_matches(['\r', '\n']).as_bytes());
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|err| GtexError::Parse(err.to_string()))
}

/// Parses a tab-separated body positionally, optionally skipping a leading header row.
pub fn parse_tsv_rows(body: &str, has_header: bool) -> Result<Vec<Vec<String>>, GtexError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_header)
        .flexible(true)
        .from_reader(body.trim_start_matches(['\r', '\n']).as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| GtexError::Parse(err.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Writes `rows` under `header` as CSV. The file only appears once fully written.
pub fn write_csv_atomic<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: &[T],
) -> Result<(), GtexError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| GtexError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".gtexquery")
        .suffix(".csv.tmp")
        .tempfile_in(parent)
        .map_err(|err| GtexError::Filesystem(err.to_string()))?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file_mut());
        writer
            .write_record(header)
            .map_err(|err| GtexError::Filesystem(err.to_string()))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(|err| GtexError::Filesystem(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| GtexError::Filesystem(err.to_string()))?;
    }
    temp.as_file_mut()
        .flush()
        .map_err(|err| GtexError::Filesystem(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| GtexError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Reads the `transcriptId` column of a CSV file, version-less and de-duplicated in
/// first-seen order.
pub fn read_transcripts(path: &Path) -> Result<Vec<TranscriptId>, GtexError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| GtexError::Filesystem(format!("open {}: {err}", path.display())))?;
    let headers = reader
        .headers()
        .map_err(|err| GtexError::Parse(err.to_string()))?;
    let column = headers
        .iter()
        .position(|name| name == "transcriptId")
        .ok_or_else(|| GtexError::MissingColumn {
            column: "transcriptId".to_string(),
            source_name: path.display().to_string(),
        })?;

    let mut transcripts: Vec<TranscriptId> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| GtexError::Parse(err.to_string()))?;
        let Some(value) = record.get(column).filter(|value| !value.trim().is_empty()) else {
            continue;
        };
        let id: TranscriptId = value.parse()?;
        if !transcripts.contains(&id) {
            transcripts.push(id);
        }
    }
    Ok(transcripts)
}
