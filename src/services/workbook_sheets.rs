use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, open_workbook_auto};

use crate::fixtures::error::FixtureError;
use crate::ports::sheets::{Sheet, SheetRow, SheetSource};

/// Tab holding the spreadsheet's editing rules rather than sound sources
const RULES_SHEET: &str = "rules";

/// Extensions handled by [`WorkbookSheetSource`]
pub const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Reads every tab of a spreadsheet workbook except the rules tab. Each tab
/// becomes one sheet named after the tab.
pub struct WorkbookSheetSource {
    path: PathBuf,
}

impl WorkbookSheetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn workbook_error(&self, source: calamine::Error) -> FixtureError {
        FixtureError::Workbook {
            path: self.path.clone(),
            source,
        }
    }
}

impl SheetSource for WorkbookSheetSource {
    fn sheets(&self) -> Result<Vec<Sheet>, FixtureError> {
        if !self.path.is_file() {
            return Err(FixtureError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            ));
        }
        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| self.workbook_error(e))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            if !is_data_sheet(&name) {
                log::debug!("Skipping '{}' tab", name);
                continue;
            }
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| self.workbook_error(e))?;
            match sheet_from_range(&name, &range) {
                Some(sheet) => {
                    log::debug!("Read {} rows from tab '{}'", sheet.rows.len(), name);
                    sheets.push(sheet);
                }
                None => log::warn!("No headers found in tab '{}', skipping it", name),
            }
        }
        Ok(sheets)
    }
}

fn is_data_sheet(name: &str) -> bool {
    !name.trim().eq_ignore_ascii_case(RULES_SHEET)
}

fn cell_text(range: &Range<Data>, row: u32, col: u32) -> String {
    range
        .get_value((row, col))
        .map(|cell| cell.to_string().trim().to_string())
        .unwrap_or_default()
}

/// Headers come from the first spreadsheet row and stop at the first blank
/// cell. Data rows start at line 2. Positions are absolute, so leading blank
/// rows or columns keep their line numbers.
fn sheet_from_range(name: &str, range: &Range<Data>) -> Option<Sheet> {
    let (last_row, last_col) = range.end()?;

    let headers: Vec<String> = (0..=last_col)
        .map(|col| cell_text(range, 0, col))
        .take_while(|header| !header.is_empty())
        .collect();
    if headers.is_empty() {
        return None;
    }

    let rows = (1..=last_row)
        .map(|row| {
            let cells = headers
                .iter()
                .enumerate()
                .map(|(col, header)| (header.clone(), cell_text(range, row, col as u32)))
                .collect();
            SheetRow::new(row as usize + 1, cells)
        })
        .collect();

    Some(Sheet {
        name: name.trim().to_string(),
        source: name.to_string(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(cells: &[&[&str]]) -> Range<Data> {
        let rows = cells.len() as u32;
        let cols = cells.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (rows - 1, cols - 1));
        for (r, row) in cells.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(value.to_string()));
                }
            }
        }
        range
    }

    #[test]
    fn rows_are_numbered_from_the_header() {
        let range = range(&[
            &["Company/Manufacturer", "Product", "Notes"],
            &["Zelda: Ocarina of Time", "", ""],
            &["", "", ""],
            &["Roland", "JV-1080", "  strings  "],
        ]);

        let sheet = sheet_from_range("Zelda", &range).unwrap();

        assert_eq!(sheet.name, "Zelda");
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0].line, 2);
        assert!(sheet.rows[1].is_blank());
        assert_eq!(sheet.rows[2].line, 4);
        assert_eq!(sheet.rows[2].get("Product"), "JV-1080");
        assert_eq!(sheet.rows[2].get("Notes"), "strings");
    }

    #[test]
    fn headers_stop_at_first_blank() {
        let range = range(&[&["Company/Manufacturer", "", "Stray"], &["Korg", "x", "y"]]);

        let sheet = sheet_from_range("Mario", &range).unwrap();

        assert_eq!(sheet.rows[0].cells.len(), 1);
        assert_eq!(sheet.rows[0].get("Stray"), "");
    }

    #[test]
    fn numeric_cells_read_as_text() {
        let mut range = range(&[&["Company/Manufacturer", "Product"], &["Yamaha", ""]]);
        range.set_value((1, 1), Data::Int(1986));

        let sheet = sheet_from_range("Yamaha", &range).unwrap();
        assert_eq!(sheet.rows[0].get("Product"), "1986");
    }

    #[test]
    fn blank_header_row_yields_nothing() {
        let range = range(&[&["", "Product"], &["Korg", "M1"]]);
        assert!(sheet_from_range("Empty", &range).is_none());
        assert!(sheet_from_range("Empty", &Range::empty()).is_none());
    }

    #[test]
    fn rules_tab_is_not_data() {
        assert!(!is_data_sheet("rules"));
        assert!(!is_data_sheet(" Rules "));
        assert!(is_data_sheet("Zelda"));
        assert!(is_data_sheet("rules of thumb"));
    }

    #[test]
    fn workbook_extensions() {
        assert!(is_workbook(Path::new("NEWER VGM Sound Sources.xlsx")));
        assert!(is_workbook(Path::new("book.ODS")));
        assert!(!is_workbook(Path::new("sheet.csv")));
        assert!(!is_workbook(Path::new("exports")));
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkbookSheetSource::new(dir.path().join("nope.xlsx"))
            .sheets()
            .unwrap_err();
        assert!(matches!(err, FixtureError::Io { .. }));
    }
}
