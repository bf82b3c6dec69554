pub mod csv_sheets;
pub mod fixture_build;
pub mod fixture_export;
pub mod fixture_import;
pub mod slug_repair;
pub mod workbook_sheets;
