//! Document source and sink.
//!
//! The runner reads `{id, text}` documents from a [`DocumentSource`] and
//! writes `{id, group_id, is_duplicate}` annotations to a [`DocumentSink`].
//! [`JsonlIndex`] implements both over a JSON Lines file, keeping every
//! original field of each record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Field written with the assigned group id.
pub const GROUP_ID_FIELD: &str = "group_id";

/// Field written with the duplicate flag. Records carrying it are annotated.
pub const IS_SIM_FIELD: &str = "is_sim";

/// Document handed to grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: String,
    /// Document text content.
    pub text: String,
}

impl Document {
    /// Create a new document.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Grouping result for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAnnotation {
    /// Document id.
    pub id: String,
    /// Representative of the document's group.
    pub group_id: String,
    /// True when the group is another document.
    pub is_duplicate: bool,
}

impl GroupAnnotation {
    /// Build an annotation, deriving the duplicate flag.
    #[must_use]
    pub fn new(id: impl Into<String>, group_id: impl Into<String>) -> Self {
        let id = id.into();
        let group_id = group_id.into();
        let is_duplicate = id != group_id;
        Self {
            id,
            group_id,
            is_duplicate,
        }
    }
}

/// Outcome of a bulk update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Range covering `from..=to`.
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Range covering a single day.
    #[must_use]
    pub fn day(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Errors that can occur during I/O operations.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Field '{field}' not found or not a string at line {line}")]
    MissingField { field: String, line: usize },

    #[error("Duplicate document id '{id}' at line {line}")]
    DuplicateId { id: String, line: usize },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Supplies documents that still need a group.
#[allow(async_fn_in_trait)]
pub trait DocumentSource {
    /// Number of unannotated documents in `range` (all dates when `None`).
    async fn count(&self, range: Option<&DateRange>) -> Result<usize>;

    /// Unannotated documents in `range`, in source order.
    async fn scan(&self, range: Option<&DateRange>) -> Result<Vec<Document>>;
}

/// Receives grouping results.
#[allow(async_fn_in_trait)]
pub trait DocumentSink {
    /// Apply annotations. Rejected items are counted in the report; only a
    /// failure of the sink itself is an `Err`.
    async fn bulk_update(&mut self, annotations: &[GroupAnnotation]) -> Result<UpdateReport>;
}

/// Names of the fields a [`JsonlIndex`] reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub id: String,
    pub text: String,
    pub date: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            text: "text".to_string(),
            date: "date".to_string(),
        }
    }
}

struct Record {
    id: String,
    date: Option<NaiveDate>,
    fields: Map<String, Value>,
}

impl Record {
    fn is_annotated(&self) -> bool {
        self.fields.contains_key(IS_SIM_FIELD)
    }

    fn in_range(&self, range: Option<&DateRange>) -> bool {
        match range {
            None => true,
            Some(range) => self.date.is_some_and(|d| range.contains(d)),
        }
    }
}

/// In-memory document index loaded from JSON Lines.
///
/// Every line must be an object with a string or integer id and a string
/// text. The date field is optional; it is read as `YYYY-MM-DD`, and longer
/// timestamps are cut to their first ten characters. Records without a
/// usable date only appear in unbounded scans.
pub struct JsonlIndex {
    fields: FieldNames,
    records: Vec<Record>,
    positions: HashMap<String, usize>,
}

impl JsonlIndex {
    /// Load a JSONL file.
    pub fn open<P: AsRef<Path>>(path: P, fields: FieldNames) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, fields)
    }

    /// Load JSONL from any reader.
    pub fn from_reader<R: Read>(reader: R, fields: FieldNames) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut index = Self {
            fields,
            records: Vec::new(),
            positions: HashMap::new(),
        };

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            index.push_line(&line, line_num + 1)?;
        }

        debug!(records = index.records.len(), "Loaded JSONL index");
        Ok(index)
    }

    fn push_line(&mut self, line: &str, line_num: usize) -> Result<()> {
        let value: Value = serde_json::from_str(line).map_err(|e| IoError::Parse {
            line: line_num,
            message: e.to_string(),
        })?;
        let Value::Object(fields) = value else {
            return Err(IoError::Parse {
                line: line_num,
                message: "expected a JSON object".to_string(),
            });
        };

        let id = match fields.get(&self.fields.id) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) if n.is_u64() || n.is_i64() => n.to_string(),
            _ => {
                return Err(IoError::MissingField {
                    field: self.fields.id.clone(),
                    line: line_num,
                })
            }
        };
        if !fields.get(&self.fields.text).is_some_and(Value::is_string) {
            return Err(IoError::MissingField {
                field: self.fields.text.clone(),
                line: line_num,
            });
        }
        if self.positions.contains_key(&id) {
            return Err(IoError::DuplicateId { id, line: line_num });
        }

        let date = fields
            .get(&self.fields.date)
            .and_then(Value::as_str)
            .and_then(parse_day);

        self.positions.insert(id.clone(), self.records.len());
        self.records.push(Record { id, date, fields });
        Ok(())
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Field names in use.
    #[must_use]
    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }

    /// Annotation stored for `id`, if the record has one.
    #[must_use]
    pub fn annotation(&self, id: &str) -> Option<GroupAnnotation> {
        let record = &self.records[*self.positions.get(id)?];
        let group_id = record.fields.get(GROUP_ID_FIELD)?.as_str()?;
        let is_duplicate = record.fields.get(IS_SIM_FIELD)?.as_bool()?;
        Some(GroupAnnotation {
            id: record.id.clone(),
            group_id: group_id.to_string(),
            is_duplicate,
        })
    }

    /// Write all records to a JSONL file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Write all records as JSONL, in load order.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for record in &self.records {
            serde_json::to_writer(&mut writer, &record.fields)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    fn pending<'a>(
        &'a self,
        range: Option<&'a DateRange>,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |r| !r.is_annotated() && r.in_range(range))
    }

    fn text_of(&self, record: &Record) -> String {
        record
            .fields
            .get(&self.fields.text)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl DocumentSource for JsonlIndex {
    async fn count(&self, range: Option<&DateRange>) -> Result<usize> {
        Ok(self.pending(range).count())
    }

    async fn scan(&self, range: Option<&DateRange>) -> Result<Vec<Document>> {
        Ok(self
            .pending(range)
            .map(|r| Document::new(r.id.clone(), self.text_of(r)))
            .collect())
    }
}

impl DocumentSink for JsonlIndex {
    async fn bulk_update(&mut self, annotations: &[GroupAnnotation]) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();

        for annotation in annotations {
            let Some(&pos) = self.positions.get(&annotation.id) else {
                warn!(id = %annotation.id, "Update rejected: unknown document id");
                report.failed += 1;
                continue;
            };
            let fields = &mut self.records[pos].fields;
            fields.insert(
                GROUP_ID_FIELD.to_string(),
                Value::String(annotation.group_id.clone()),
            );
            fields.insert(IS_SIM_FIELD.to_string(), Value::Bool(annotation.is_duplicate));
            report.succeeded += 1;
        }

        Ok(report)
    }
}
