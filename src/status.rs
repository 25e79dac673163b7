use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

/// Outcome of one package build as written by sbuild.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuildStatus {
    Attempted,
    Skipped,
    Successful,
    GivenBack,
    Other(String),
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BuildStatus::Attempted => "attempted",
            BuildStatus::Skipped => "skipped",
            BuildStatus::Successful => "successful",
            BuildStatus::GivenBack => "given-back",
            BuildStatus::Other(s) => s,
        }
    }

    pub fn is_success(&self) -> bool { matches!(self, BuildStatus::Successful) }
}

// Case-sensitive: "Successful" is an unknown status.
impl From<&str> for BuildStatus {
    fn from(s: &str) -> Self {
        match s {
            "attempted" => BuildStatus::Attempted,
            "skipped" => BuildStatus::Skipped,
            "successful" => BuildStatus::Successful,
            "given-back" => BuildStatus::GivenBack,
            other => BuildStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusRecord {
    pub name: String,
    pub version: String,
    pub status: BuildStatus,
    pub built_at: DateTime<FixedOffset>,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum RecordError {
    #[error("line is not valid UTF-8: {source}")]
    InvalidUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("expected 4 fields (name version status timestamp), found {found}")]
    MissingFields { found: usize },
    #[error("invalid RFC3339 timestamp {value:?}: {source}")]
    BadTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Clone, Debug)]
pub struct SkippedLine {
    pub line_no: usize,
    pub text: String,
    pub error: RecordError,
}

/// Parsed status log: good records in file order plus the lines that were dropped.
#[derive(Debug, Default)]
pub struct StatusLog {
    pub records: Vec<StatusRecord>,
    pub skipped: Vec<SkippedLine>,
}

/// Parses `<name> <version> <status> <timestamp>`; trailing fields are ignored.
pub fn parse_record(line: &str) -> Result<StatusRecord, RecordError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 { return Err(RecordError::MissingFields { found: fields.len() }); }
    let built_at = DateTime::parse_from_rfc3339(fields[3])
        .map_err(|source| RecordError::BadTimestamp { value: fields[3].to_string(), source })?;
    Ok(StatusRecord {
        name: fields[0].to_string(),
        version: fields[1].to_string(),
        status: BuildStatus::from(fields[2]),
        built_at,
    })
}

/// Splits raw log bytes into lines; encoding problems are confined to the line they occur on.
pub fn parse_status_log(data: &[u8]) -> StatusLog {
    let mut out = StatusLog::default();
    for (idx, raw) in data.split(|b| *b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let parsed = std::str::from_utf8(raw)
            .map_err(|source| RecordError::InvalidUtf8 { source })
            .and_then(|line| if line.trim().is_empty() { Ok(None) } else { parse_record(line).map(Some) });
        match parsed {
            Ok(Some(r)) => out.records.push(r),
            Ok(None) => {}
            Err(error) => {
                let text = String::from_utf8_lossy(raw).into_owned();
                log::warn!("Skipping status line {}: {} ({:?})", idx + 1, error, text);
                out.skipped.push(SkippedLine { line_no: idx + 1, text, error });
            }
        }
    }
    log::debug!("Parsed {} status records, skipped {}", out.records.len(), out.skipped.len());
    out
}

pub fn load_status_log(path: &Path) -> anyhow::Result<StatusLog> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read status log {}", path.display()))?;
    Ok(parse_status_log(&data))
}
