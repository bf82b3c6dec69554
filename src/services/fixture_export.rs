use std::path::{Path, PathBuf};
use std::sync::Arc;

use color_eyre::{Result, eyre::Context};

use crate::database::Database;
use crate::fixtures::exporter::{export_model, export_order};
use crate::fixtures::format::{FixtureFormat, write_file};
use crate::fixtures::models::{Category, ModelKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub model: ModelKind,
    pub path: PathBuf,
    pub count: usize,
}

pub struct ExportService {
    db: Arc<Database>,
}

impl ExportService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Dump stored entities to one fixture file per non-empty collection
    pub async fn export(
        &self,
        output_dir: &Path,
        category: Option<Category>,
        format: FixtureFormat,
    ) -> Result<Vec<ExportedFile>> {
        std::fs::create_dir_all(output_dir)
            .wrap_err_with(|| format!("Failed to create {}", output_dir.display()))?;

        let mut written = Vec::new();
        for kind in export_order(category) {
            let records = export_model(&self.db.conn, kind)
                .await
                .wrap_err_with(|| format!("Failed to export {}", kind))?;
            if records.is_empty() {
                log::warn!("No {} rows to export, skipping", kind);
                continue;
            }

            let path = output_dir.join(format!("{}.{}", kind.file_stem(), format.extension()));
            write_file(&path, &records, format)?;
            log::info!(
                "Exported {} {} rows to {}",
                records.len(),
                kind,
                path.display()
            );

            written.push(ExportedFile {
                model: kind,
                path,
                count: records.len(),
            });
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{company, product};
    use crate::test_utils::test_db;
    use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ActiveValue::Set};

    #[tokio::test]
    async fn writes_only_non_empty_collections() {
        let db = test_db().await;
        company::ActiveModel {
            id: Set(1),
            name: Set("Yamaha".to_string()),
            notes: Set(String::new()),
            ..company::ActiveModel::new()
        }
        .insert(&db.conn)
        .await
        .unwrap();
        product::ActiveModel {
            id: Set(1),
            name: Set("DX7".to_string()),
            company_id: Set(1),
            notes: Set(String::new()),
            ..product::ActiveModel::new()
        }
        .insert(&db.conn)
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = ExportService::new(db)
            .export(dir.path(), None, FixtureFormat::Json)
            .await
            .unwrap();

        let models: Vec<_> = written.iter().map(|f| f.model).collect();
        assert_eq!(models, vec![ModelKind::Company, ModelKind::Product]);
        assert!(dir.path().join("sources_companies.json").is_file());
        assert!(!dir.path().join("games_games.json").exists());
    }

    #[tokio::test]
    async fn category_filter_limits_output() {
        let db = test_db().await;
        company::ActiveModel {
            id: Set(1),
            name: Set("Yamaha".to_string()),
            notes: Set(String::new()),
            ..company::ActiveModel::new()
        }
        .insert(&db.conn)
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = ExportService::new(db)
            .export(dir.path(), Some(Category::Games), FixtureFormat::Yaml)
            .await
            .unwrap();

        assert!(written.is_empty());
    }
}
