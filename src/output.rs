//! CSV persistence for release events and aggregated counts.
//!
//! Column order and header labels come from a [`TableLayout`]. Tables are
//! written to a temporary file next to the destination and renamed into
//! place, so a reader sees either the previous table or the complete new one.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat};
use csv::WriterBuilder;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::release::{ReleaseEvent, UNKNOWN_AUTHOR};
use crate::stats::{Granularity, StatRow};

/// A persisted column: the record field it holds and its header label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub field: String,
    pub label: String,
}

/// Ordered field → label mapping for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    columns: Vec<Column>,
}

impl TableLayout {
    pub fn new<F, L>(columns: impl IntoIterator<Item = (F, L)>) -> Self
    where
        F: Into<String>,
        L: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(field, label)| Column {
                    field: field.into(),
                    label: label.into(),
                })
                .collect(),
        }
    }

    /// Layout of the raw release table.
    pub fn raw_events() -> Self {
        Self::new([
            ("repository", "레포지토리"),
            ("tag", "태그명"),
            ("name", "이름"),
            ("published_at", "배포일시"),
            ("author", "작성자"),
            ("draft", "draft"),
            ("prerelease", "prerelease"),
        ])
    }

    /// Layout of the aggregated stats table.
    pub fn stat_rows() -> Self {
        Self::new([
            ("repository", "레포지토리"),
            ("period", "기간"),
            ("year", "연도"),
            ("month", "월"),
            ("week", "주차"),
            ("day", "일자"),
            ("count", "배포수"),
        ])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.label.as_str())
    }

    fn field_for(&self, label: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.field.as_str())
    }
}

/// Cell values of one decoded row, keyed by field name.
pub struct Fields<'a> {
    values: HashMap<&'a str, &'a str>,
}

impl<'a> Fields<'a> {
    /// The cell for `field`, treating an empty cell as absent.
    pub fn get(&self, field: &str) -> Option<&'a str> {
        self.values.get(field).copied().filter(|v| !v.is_empty())
    }

    pub fn require(&self, field: &str) -> std::result::Result<&'a str, String> {
        self.get(field).ok_or_else(|| format!("missing {field}"))
    }

    pub fn parse<T>(&self, field: &str) -> std::result::Result<Option<T>, String>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(field)
            .map(|v| v.parse::<T>().map_err(|e| format!("invalid {field} {v:?}: {e}")))
            .transpose()
    }
}

/// A record that can be stored in a table.
pub trait TableRow: Sized {
    /// Rendered value of `field`; `None` renders as an empty cell.
    fn field(&self, field: &str) -> Option<String>;

    fn from_fields(fields: &Fields<'_>) -> std::result::Result<Self, String>;
}

impl TableRow for ReleaseEvent {
    fn field(&self, field: &str) -> Option<String> {
        match field {
            "repository" => Some(self.repository.clone()),
            "tag" => self.tag.clone(),
            "name" => Some(self.name.clone()),
            "published_at" => Some(
                self.published_at
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            "author" => Some(self.author.clone()),
            "draft" => Some(self.draft.to_string()),
            "prerelease" => Some(self.prerelease.to_string()),
            _ => None,
        }
    }

    fn from_fields(fields: &Fields<'_>) -> std::result::Result<Self, String> {
        let published = fields.require("published_at")?;
        let published_at = DateTime::parse_from_rfc3339(published)
            .map_err(|e| format!("invalid published_at {published:?}: {e}"))?;

        Ok(ReleaseEvent {
            repository: fields.require("repository")?.to_string(),
            published_at,
            tag: fields.get("tag").map(str::to_string),
            name: fields.get("name").unwrap_or_default().to_string(),
            author: fields.get("author").unwrap_or(UNKNOWN_AUTHOR).to_string(),
            draft: fields.parse("draft")?.unwrap_or(false),
            prerelease: fields.parse("prerelease")?.unwrap_or(false),
        })
    }
}

impl TableRow for StatRow {
    fn field(&self, field: &str) -> Option<String> {
        match field {
            "repository" => Some(self.repository.clone()),
            "period" => Some(self.granularity.to_string()),
            "year" => Some(self.year.to_string()),
            "month" => self.month.map(|m| m.to_string()),
            "week" => self.week.map(|w| w.to_string()),
            "day" => self.day.map(|d| d.format("%Y-%m-%d").to_string()),
            "count" => Some(self.count.to_string()),
            _ => None,
        }
    }

    fn from_fields(fields: &Fields<'_>) -> std::result::Result<Self, String> {
        let day = fields
            .get("day")
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|e| format!("invalid day {d:?}: {e}"))
            })
            .transpose()?;

        let row = StatRow {
            repository: fields.require("repository")?.to_string(),
            granularity: fields
                .parse::<Granularity>("period")?
                .ok_or("missing period")?,
            year: fields.parse("year")?.ok_or("missing year")?,
            month: fields.parse("month")?,
            week: fields.parse("week")?,
            day,
            count: fields.parse("count")?.ok_or("missing count")?,
        };

        if row.count == 0 {
            return Err("count must be positive".to_string());
        }
        if row.key().is_none() {
            return Err(format!("{} row is missing its calendar field", row.granularity));
        }
        Ok(row)
    }
}

/// Writes `rows` to `path` as CSV, replacing any existing table.
///
/// Parent directories are created as needed.
pub fn write_table<R: TableRow>(path: &Path, layout: &TableLayout, rows: &[R]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| Error::write(path, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::write(path, e))?;
    {
        let mut writer = WriterBuilder::new().from_writer(&mut tmp);
        writer
            .write_record(layout.labels())
            .map_err(|e| Error::write(path, e))?;

        for row in rows {
            let record = layout
                .columns()
                .iter()
                .map(|c| row.field(&c.field).unwrap_or_default());
            writer
                .write_record(record)
                .map_err(|e| Error::write(path, e))?;
        }
        writer.flush().map_err(|e| Error::write(path, e))?;
    }
    tmp.flush().map_err(|e| Error::write(path, e))?;
    tmp.as_file().sync_all().map_err(|e| Error::write(path, e))?;
    tmp.persist(path).map_err(|e| Error::write(path, e.error))?;

    debug!(path = %path.display(), rows = rows.len(), "Table written");
    Ok(())
}

/// Reads a table written by [`write_table`] with the same layout.
///
/// # Errors
///
/// [`Error::Read`] if the file cannot be read as CSV, [`Error::Table`] if the
/// header does not match `layout` or a row cannot be decoded. Header errors
/// are reported as row 0.
pub fn read_table<R: TableRow>(path: &Path, layout: &TableLayout) -> Result<Vec<R>> {
    let read_err = |source: csv::Error| Error::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    let headers = reader.headers().map_err(read_err)?.clone();

    let mut fields = Vec::with_capacity(headers.len());
    for label in headers.iter() {
        let field = layout.field_for(label).ok_or_else(|| Error::Table {
            row: 0,
            message: format!("unexpected column {label:?}"),
        })?;
        fields.push(field);
    }
    if let Some(missing) = layout.labels().find(|l| !headers.iter().any(|h| h == *l)) {
        return Err(Error::Table {
            row: 0,
            message: format!("missing column {missing:?}"),
        });
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(read_err)?;
        let values = Fields {
            values: fields.iter().copied().zip(record.iter()).collect(),
        };
        let row = R::from_fields(&values).map_err(|message| Error::Table { row: i + 1, message })?;
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "Table read");
    Ok(rows)
}
