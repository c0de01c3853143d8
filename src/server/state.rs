//! Tables held in memory by the query service.

use std::path::Path;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::config::ServeConfig;
use crate::error::{Error, Result};

/// A persisted table kept as text, exactly as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Reads the whole CSV at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::StartupLoad`] if the file is missing, has no header row, or
    /// has a row whose length differs from the header.
    pub fn load(path: &Path) -> Result<Self> {
        let load_err = |message: String| Error::StartupLoad {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = csv::Reader::from_path(path).map_err(|e| load_err(e.to_string()))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| load_err(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(load_err("missing header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| load_err(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serializes as a list of objects keyed by header label, in column order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Row<'a>(&'a [String], &'a [String]);

        impl Serialize for Row<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (header, value) in self.0.iter().zip(self.1) {
                    map.serialize_entry(header, value)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Row(&self.headers, row))?;
        }
        seq.end()
    }
}

/// Snapshot shared by all handlers. Loaded once, never mutated.
#[derive(Clone)]
pub struct AppState {
    pub raw: Arc<Table>,
    pub stats: Arc<Table>,
}

impl AppState {
    pub fn new(raw: Table, stats: Table) -> Self {
        Self {
            raw: Arc::new(raw),
            stats: Arc::new(stats),
        }
    }

    pub fn load(config: &ServeConfig) -> Result<Self> {
        let raw = Table::load(&config.raw_path)?;
        let stats = Table::load(&config.stats_path)?;

        tracing::info!(
            raw_rows = raw.len(),
            stats_rows = stats.len(),
            "tables loaded"
        );
        Ok(Self::new(raw, stats))
    }
}
