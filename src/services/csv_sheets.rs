use std::path::{Path, PathBuf};

use crate::fixtures::classify::tag_name;
use crate::fixtures::error::FixtureError;
use crate::ports::sheets::{Sheet, SheetRow, SheetSource};

/// Reads one CSV file, or every `*.csv` directly inside a directory sorted
/// by file name. Each file becomes one sheet named after its stem.
pub struct CsvSheetSource {
    input: PathBuf,
    file_prefix: String,
}

impl CsvSheetSource {
    pub fn new(input: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            file_prefix: file_prefix.into(),
        }
    }

    fn csv_files(&self) -> Result<Vec<PathBuf>, FixtureError> {
        if !self.input.is_dir() {
            if !self.input.exists() {
                return Err(FixtureError::io(
                    &self.input,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
                ));
            }
            return Ok(vec![self.input.clone()]);
        }

        let files = walkdir::WalkDir::new(&self.input)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| {
                e.file_type().is_file()
                    && e.path()
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .map(|e| e.into_path())
            .collect();
        Ok(files)
    }

    fn read_sheet(&self, path: &Path) -> Result<Option<Sheet>, FixtureError> {
        let csv_error = |source: csv::Error| FixtureError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        if headers.iter().all(|h| h.is_empty()) {
            log::warn!("No headers found in {}, skipping it", file_name);
            return Ok(None);
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record.map_err(csv_error)?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            let cells = headers
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| (header.clone(), String::from_utf8_lossy(cell).to_string()))
                .collect();
            rows.push(SheetRow::new(line, cells));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        log::debug!("Read {} rows from {}", rows.len(), file_name);
        Ok(Some(Sheet {
            name: tag_name(&stem, &self.file_prefix),
            source: file_name,
            rows,
        }))
    }
}

impl SheetSource for CsvSheetSource {
    fn sheets(&self) -> Result<Vec<Sheet>, FixtureError> {
        let mut sheets = Vec::new();
        for path in self.csv_files()? {
            if let Some(sheet) = self.read_sheet(&path)? {
                sheets.push(sheet);
            }
        }
        Ok(sheets)
    }
}
