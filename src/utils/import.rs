// src/utils/import.rs

//! Parsing of uploaded exam documents (CSV or JSON) into validated questions.
//!
//! Parsing is all-or-nothing: the first bad row or question rejects the
//! whole document, so nothing is written for a partially valid upload.

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use validator::Validate;

use crate::models::question::{Choice, NewQuestion};

/// Columns every CSV upload must carry (extra columns are ignored).
pub const REQUIRED_CSV_COLUMNS: [&str; 7] = [
    "order_index",
    "text",
    "choice_a",
    "choice_b",
    "choice_c",
    "choice_d",
    "correct",
];

pub const ACCEPTED_EXTENSIONS: [&str; 2] = [".csv", ".json"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("Unsupported file type. Use .csv or .json.")]
    UnsupportedType,

    #[error("CSV headers must be: {}", .expected.join(", "))]
    HeaderMismatch { expected: Vec<&'static str> },

    #[error("Failed to parse file: {0}")]
    Parse(String),
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Json,
}

impl UploadFormat {
    /// Picks the format from the uploaded file name's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, ImportError> {
        let name = filename.trim().to_ascii_lowercase();
        if name.ends_with(".csv") {
            Ok(UploadFormat::Csv)
        } else if name.ends_with(".json") {
            Ok(UploadFormat::Json)
        } else {
            Err(ImportError::UnsupportedType)
        }
    }
}

pub fn parse_upload(format: UploadFormat, data: &[u8]) -> Result<Vec<NewQuestion>, ImportError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    match format {
        UploadFormat::Csv => parse_csv(data),
        UploadFormat::Json => parse_json(data),
    }
}

/// Parses a CSV document whose header row contains at least [`REQUIRED_CSV_COLUMNS`].
/// Fields are trimmed; `correct` is matched case-insensitively; a blank `order_index` is 0.
pub fn parse_csv(data: &[u8]) -> Result<Vec<NewQuestion>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let columns = CsvColumns::locate(&headers)?;

    let mut questions = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // Line 1 is the header row.
        let label = format!("row {}", i + 2);

        let order_raw = columns.get(&record, "order_index");
        let order_index = if order_raw.is_empty() {
            0
        } else {
            order_raw.parse::<i64>().map_err(|_| {
                ImportError::Parse(format!("{}: invalid order_index '{}'", label, order_raw))
            })?
        };

        questions.push(build_question(
            &label,
            order_index,
            columns.get(&record, "text"),
            [
                columns.get(&record, "choice_a"),
                columns.get(&record, "choice_b"),
                columns.get(&record, "choice_c"),
                columns.get(&record, "choice_d"),
            ],
            columns.get(&record, "correct"),
        )?);
    }

    Ok(questions)
}

/// Header name -> column position for the required columns.
struct CsvColumns(HashMap<&'static str, usize>);

impl CsvColumns {
    fn locate(headers: &StringRecord) -> Result<Self, ImportError> {
        let mut positions = HashMap::new();
        for column in REQUIRED_CSV_COLUMNS {
            match headers.iter().position(|h| h.trim() == column) {
                Some(idx) => {
                    positions.insert(column, idx);
                }
                None => {
                    let mut expected = REQUIRED_CSV_COLUMNS.to_vec();
                    expected.sort_unstable();
                    return Err(ImportError::HeaderMismatch { expected });
                }
            }
        }
        Ok(CsvColumns(positions))
    }

    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.0
            .get(column)
            .and_then(|&idx| record.get(idx))
            .unwrap_or("")
            .trim()
    }
}

/// One question object of a JSON upload. Choices may be given directly
/// (`choice_a`..`choice_d`) or nested under `choices` keyed by symbol.
#[derive(Debug, Deserialize)]
struct JsonQuestion {
    #[serde(default)]
    order_index: Value,
    text: String,
    #[serde(default)]
    choice_a: Option<String>,
    #[serde(default)]
    choice_b: Option<String>,
    #[serde(default)]
    choice_c: Option<String>,
    #[serde(default)]
    choice_d: Option<String>,
    #[serde(default)]
    choices: HashMap<String, String>,
    #[serde(default)]
    correct: Option<String>,
}

impl JsonQuestion {
    fn choice(&self, direct: &Option<String>, symbol: Choice) -> String {
        direct
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.choices.get(symbol.as_str()).map(String::as_str))
            .unwrap_or("")
            .to_string()
    }
}

/// Resolves a JSON `order_index`. Absent, null, `0` and `""` fall back to the
/// question's 1-based position; integers and numeric strings are taken as given.
fn json_order_index(value: &Value, position: i64, label: &str) -> Result<i64, ImportError> {
    let invalid = || ImportError::Parse(format!("{}: invalid order_index '{}'", label, value));

    match value {
        Value::Null => Ok(position),
        Value::Number(n) => {
            let n = match n.as_i64() {
                Some(n) => n,
                None => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
                    .ok_or_else(invalid)?,
            };
            Ok(if n == 0 { position } else { n })
        }
        Value::String(s) if s.trim().is_empty() => Ok(position),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Parses either a bare list of question objects or `{"questions": [...]}`.
pub fn parse_json(data: &[u8]) -> Result<Vec<NewQuestion>, ImportError> {
    let payload: Value = serde_json::from_slice(data)?;

    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ImportError::Parse("`questions` must be a list".to_string()));
            }
            None => {
                return Err(ImportError::Parse("missing `questions` list".to_string()));
            }
        },
        _ => {
            return Err(ImportError::Parse(
                "expected a list of questions or an object with a `questions` list".to_string(),
            ));
        }
    };

    let mut questions = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let position = i + 1;
        let label = format!("question {}", position);
        let raw: JsonQuestion = serde_json::from_value(item)
            .map_err(|e| ImportError::Parse(format!("{}: {}", label, e)))?;

        let choices = [
            raw.choice(&raw.choice_a, Choice::A),
            raw.choice(&raw.choice_b, Choice::B),
            raw.choice(&raw.choice_c, Choice::C),
            raw.choice(&raw.choice_d, Choice::D),
        ];

        questions.push(build_question(
            &label,
            json_order_index(&raw.order_index, position as i64, &label)?,
            &raw.text,
            [
                choices[0].as_str(),
                choices[1].as_str(),
                choices[2].as_str(),
                choices[3].as_str(),
            ],
            raw.correct.as_deref().unwrap_or(""),
        )?);
    }

    Ok(questions)
}

fn build_question(
    label: &str,
    order_index: i64,
    text: &str,
    choices: [&str; 4],
    correct: &str,
) -> Result<NewQuestion, ImportError> {
    let correct = Choice::parse_lenient(correct).ok_or_else(|| {
        ImportError::Parse(format!(
            "{}: correct must be one of A, B, C, D (got '{}')",
            label,
            correct.trim()
        ))
    })?;

    let [a, b, c, d] = choices;
    let question = NewQuestion {
        order_index,
        text: text.trim().to_string(),
        choice_a: a.trim().to_string(),
        choice_b: b.trim().to_string(),
        choice_c: c.trim().to_string(),
        choice_d: d.trim().to_string(),
        correct,
    };

    question
        .validate()
        .map_err(|e| ImportError::Parse(format!("{}: {}", label, e)))?;

    Ok(question)
}
