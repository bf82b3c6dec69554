use std::fmt;
use std::path::PathBuf;

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Input that cannot be processed at all. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML fixture: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON fixture: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Unsupported fixture extension: {0}")]
    UnsupportedExtension(String),

    #[error("Item {index}: unknown model '{model}'")]
    UnknownModel { index: usize, model: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl FixtureError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Other,
}

impl ConstraintKind {
    /// Classify a database error message. `None` when it is not a constraint failure.
    pub fn classify(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("unique constraint") {
            Some(Self::Unique)
        } else if lower.contains("foreign key") {
            Some(Self::ForeignKey)
        } else if lower.contains("not null constraint") || lower.contains("not-null constraint")
        {
            Some(Self::NotNull)
        } else if lower.contains("constraint") {
            Some(Self::Other)
        } else {
            None
        }
    }
}

// Renders as the prefix of the error line; `Other` carries no prefix.
impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique => f.write_str("Unique constraint violation - "),
            Self::ForeignKey => f.write_str("Foreign key constraint violation - "),
            Self::NotNull => f.write_str("Not-null constraint violation - "),
            Self::Other => Ok(()),
        }
    }
}

/// Failure of a single fixture record. The batch continues past these.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{kind}{message}")]
    Constraint { kind: ConstraintKind, message: String },

    #[error("[InvalidValue] {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("[Validation] {0}")]
    Validation(String),

    #[error("[Schema] {0}")]
    Schema(String),

    #[error("[Database] {0}")]
    Database(DbErr),
}

impl From<DbErr> for RecordError {
    fn from(err: DbErr) -> Self {
        let message = err.to_string();
        let kind = match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Some(ConstraintKind::Unique),
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => Some(ConstraintKind::ForeignKey),
            _ => ConstraintKind::classify(&message),
        };
        match kind {
            Some(kind) => Self::Constraint { kind, message },
            None => Self::Database(err),
        }
    }
}

/// A single reference whose target row did not exist at import time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRef {
    pub field: String,
    pub model: &'static str,
    pub pk: i64,
}

impl fmt::Display for UnresolvedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} pk={}", self.field, self.model, self.pk)
    }
}

#[derive(Debug)]
pub struct RecordFailure {
    pub error: RecordError,
    pub unresolved: Vec<UnresolvedRef>,
}

impl RecordFailure {
    pub fn new(error: impl Into<RecordError>, unresolved: Vec<UnresolvedRef>) -> Self {
        Self {
            error: error.into(),
            unresolved,
        }
    }

    /// One line of the import error list
    pub fn describe(&self, index: usize, model: &str, pk: i64) -> String {
        let mut line = format!("Item {index} ({model} pk={pk}): {}", self.error);
        if !self.unresolved.is_empty() {
            let refs = self
                .unresolved
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            line.push_str(&format!(" (unresolved references: {refs})"));
        }
        line
    }
}

impl From<RecordError> for RecordFailure {
    fn from(error: RecordError) -> Self {
        Self::new(error, Vec::new())
    }
}

impl From<DbErr> for RecordFailure {
    fn from(err: DbErr) -> Self {
        Self::new(RecordError::from(err), Vec::new())
    }
}
