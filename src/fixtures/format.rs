use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::FixtureError;

/// One stored entity in fixture form
///
/// ```yaml
/// - model: sources.Product
///   pk: 3
///   fields:
///     name: JV-1080
///     company: 1
///     notes: ''
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureRecord {
    /// `category.Entity`, optionally with a leading project segment
    pub model: String,
    pub pk: i64,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl FixtureRecord {
    pub fn new(model: impl Into<String>, pk: i64, fields: Map<String, Value>) -> Self {
        Self {
            model: model.into(),
            pk,
            fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FixtureFormat {
    #[default]
    Yaml,
    Json,
}

impl FixtureFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// Parse a batch. Blank or `null` content is an empty batch; anything other
/// than a list of records is malformed.
pub fn parse(content: &str, format: FixtureFormat) -> Result<Vec<FixtureRecord>, FixtureError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Option<Vec<FixtureRecord>> = match format {
        FixtureFormat::Yaml => serde_yaml::from_str(content)?,
        FixtureFormat::Json => serde_json::from_str(content)?,
    };
    Ok(records.unwrap_or_default())
}

pub fn read_file(path: &Path) -> Result<Vec<FixtureRecord>, FixtureError> {
    let format = FixtureFormat::from_path(path).ok_or_else(|| {
        FixtureError::UnsupportedExtension(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        )
    })?;
    let content = std::fs::read_to_string(path).map_err(|e| FixtureError::io(path, e))?;
    parse(&content, format)
}

pub fn render(records: &[FixtureRecord], format: FixtureFormat) -> Result<String, FixtureError> {
    Ok(match format {
        FixtureFormat::Yaml => serde_yaml::to_string(records)?,
        FixtureFormat::Json => {
            let mut text = serde_json::to_string_pretty(records)?;
            text.push('\n');
            text
        }
    })
}

pub fn write_file(
    path: &Path,
    records: &[FixtureRecord],
    format: FixtureFormat,
) -> Result<(), FixtureError> {
    let text = render(records, format)?;
    std::fs::write(path, text).map_err(|e| FixtureError::io(path, e))
}
