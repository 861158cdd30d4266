use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::GtexError;

#[derive(Debug, Deserialize)]
struct LookupRow {
    name: String,
    id: String,
}

/// Gene symbol to canonical gene identifier, read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    ids: HashMap<String, String>,
}

impl LookupTable {
    /// Builds the table from `(symbol, identifier)` pairs; the first pair wins for a
    /// repeated symbol.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut ids = HashMap::new();
        for (symbol, id) in pairs {
            ids.entry(symbol.into()).or_insert_with(|| id.into());
        }
        Self { ids }
    }

    /// Loads a CSV with `name` and `id` columns.
    pub fn from_csv_path(path: &Path) -> Result<Self, GtexError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|err| GtexError::Filesystem(format!("open {}: {err}", path.display())))?;
        let rows = reader
            .deserialize::<LookupRow>()
            .map(|row| row.map(|row| (row.name, row.id)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| GtexError::Parse(format!("{}: {err}", path.display())))?;
        let table = Self::from_pairs(rows);
        tracing::info!(path = %path.display(), genes = table.len(), "loaded gene lookup table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.ids.get(symbol).map(String::as_str)
    }
}

/// Maps `symbol` to its identifier, or hands `symbol` back unchanged when the table
/// does not know it. Callers tell the two apart by the identifier prefix.
pub fn resolve(symbol: &str, table: &LookupTable) -> String {
    table.get(symbol).unwrap_or(symbol).to_string()
}
