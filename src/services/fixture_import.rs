use std::path::{Path, PathBuf};
use std::sync::Arc;

use color_eyre::{Result, eyre::Context};

use crate::database::Database;
use crate::fixtures::format::read_file;
use crate::fixtures::importer::{ImportOptions, ImportStats, import_records, resolve_models};
use crate::fixtures::models::IMPORT_ORDER;

const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Known fixture files present in `dir`, in dependency order
pub fn fixture_files(dir: &Path) -> Vec<PathBuf> {
    IMPORT_ORDER
        .iter()
        .filter_map(|kind| {
            let found = EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{}.{}", kind.file_stem(), ext)))
                .find(|path| path.is_file());
            if found.is_none() {
                log::warn!("Fixture file not found: {}.*, skipping", kind.file_stem());
            }
            found
        })
        .collect()
}

pub struct ImportService {
    db: Arc<Database>,
}

impl ImportService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Import one fixture file. A dry run parses and validates labels only.
    pub async fn import_file(
        &self,
        path: &Path,
        options: ImportOptions,
        dry_run: bool,
    ) -> Result<ImportStats> {
        log::info!("Importing {}", path.display());
        let records =
            read_file(path).wrap_err_with(|| format!("Failed to load {}", path.display()))?;

        if dry_run {
            resolve_models(&records)
                .wrap_err_with(|| format!("Invalid fixture {}", path.display()))?;
            return Ok(ImportStats {
                total: records.len(),
                ..Default::default()
            });
        }

        import_records(&self.db.conn, &records, options)
            .await
            .wrap_err_with(|| format!("Failed to import {}", path.display()))
    }

    /// Import every known fixture file of a directory in dependency order
    pub async fn import_directory(
        &self,
        dir: &Path,
        options: ImportOptions,
        dry_run: bool,
    ) -> Result<Vec<(PathBuf, ImportStats)>> {
        if !dir.is_dir() {
            return Err(color_eyre::eyre::eyre!(
                "Fixture directory not found: {}",
                dir.display()
            ));
        }

        let mut results = Vec::new();
        for path in fixture_files(dir) {
            let stats = self.import_file(&path, options, dry_run).await?;
            results.push((path, stats));
        }
        Ok(results)
    }
}
