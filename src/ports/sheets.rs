use crate::fixtures::error::FixtureError;

/// One row of a sheet with its 1-based line number in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub line: usize,
    /// Header name and raw cell text, in column order
    pub cells: Vec<(String, String)>,
}

impl SheetRow {
    pub fn new(line: usize, cells: Vec<(String, String)>) -> Self {
        Self { line, cells }
    }

    /// Trimmed value of a column, empty when the column is missing
    pub fn get(&self, column: &str) -> &str {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.trim())
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| value.trim().is_empty())
    }
}

/// A spreadsheet tab or CSV file. Each one maps to a single game tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    /// Tag name the rows belong to
    pub name: String,
    /// Where the rows came from, as shown in the skip report
    pub source: String,
    pub rows: Vec<SheetRow>,
}

/// Port for anything that yields ordered sheets of named-column rows.
///
/// Implementations live in `services::csv_sheets` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
pub trait SheetSource {
    fn sheets(&self) -> Result<Vec<Sheet>, FixtureError>;
}
