use std::path::{Path, PathBuf};

use color_eyre::{Result, eyre::Context};

use crate::fixtures::builder::{self, render_skip_report};
use crate::fixtures::classify::ClassifierRules;
use crate::fixtures::format::{FixtureFormat, write_file};
use crate::fixtures::models::ModelKind;
use crate::ports::sheets::SheetSource;

pub const SKIP_REPORT_FILE: &str = "skipped_lines_report.txt";

#[derive(Debug)]
pub struct BuildSummary {
    pub written: Vec<(ModelKind, PathBuf, usize)>,
    pub skipped: usize,
    pub skip_report: Option<PathBuf>,
}

pub struct BuildService<S: SheetSource> {
    source: S,
    rules: ClassifierRules,
}

impl<S: SheetSource> BuildService<S> {
    pub fn new(source: S, rules: ClassifierRules) -> Self {
        Self { source, rules }
    }

    /// Build fixtures from every sheet and write them into `output_dir`
    pub fn run(&self, output_dir: &Path, format: FixtureFormat) -> Result<BuildSummary> {
        let sheets = self
            .source
            .sheets()
            .wrap_err("Failed to read source sheets")?;
        if sheets.is_empty() {
            log::warn!("No sheets found, writing empty fixtures");
        }

        let output = builder::build(&self.rules, &sheets);

        std::fs::create_dir_all(output_dir).context(format!(
            "Failed to create output directory: {}",
            output_dir.display()
        ))?;

        let mut written = Vec::new();
        for (kind, records) in output.collections() {
            let path = output_dir.join(format!("{}.{}", kind.file_stem(), format.extension()));
            write_file(&path, records, format)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            log::info!("Generated: {} ({} entries)", path.display(), records.len());
            written.push((kind, path, records.len()));
        }

        let skip_report = if output.skipped.is_empty() {
            None
        } else {
            let path = output_dir.join(SKIP_REPORT_FILE);
            std::fs::write(&path, render_skip_report(&output.skipped))
                .context(format!("Failed to write {}", path.display()))?;
            Some(path)
        };

        Ok(BuildSummary {
            written,
            skipped: output.skipped.len(),
            skip_report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::error::FixtureError;
    use crate::fixtures::format::read_file;
    use crate::ports::sheets::{MockSheetSource, Sheet, SheetRow};

    fn row(line: usize, primary: &str, product: &str, program: &str) -> SheetRow {
        SheetRow::new(
            line,
            vec![
                ("Company/Manufacturer".into(), primary.into()),
                ("Product".into(), product.into()),
                ("Program".into(), program.into()),
            ],
        )
    }

    #[test]
    fn writes_all_collections_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MockSheetSource::new();
        source.expect_sheets().times(1).returning(|| {
            Ok(vec![Sheet {
                name: "Zelda".into(),
                source: "Zelda.csv".into(),
                rows: vec![
                    row(2, "SOURCES", "", ""),
                    row(3, "Zelda: Link's Awakening (1993)", "", ""),
                    row(4, "Roland", "D-50", "Digital Native Dance"),
                ],
            }])
        });

        let service = BuildService::new(source, ClassifierRules::default());
        let summary = service.run(dir.path(), FixtureFormat::Json).unwrap();

        assert_eq!(summary.written.len(), 6);
        assert_eq!(summary.skipped, 1);

        let products = read_file(&dir.path().join("sources_products.json")).unwrap();
        assert_eq!(products.len(), 1);
        let sources = read_file(&dir.path().join("sources_soundsources.json")).unwrap();
        assert_eq!(sources[0].fields["name"], "Digital Native Dance");

        let report_path = summary.skip_report.unwrap();
        let report = std::fs::read_to_string(report_path).unwrap();
        assert!(report.contains("Row 2: SOURCES"));
    }

    #[test]
    fn no_report_when_nothing_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MockSheetSource::new();
        source.expect_sheets().returning(|| Ok(Vec::new()));

        let summary = BuildService::new(source, ClassifierRules::default())
            .run(dir.path(), FixtureFormat::Yaml)
            .unwrap();

        assert!(summary.skip_report.is_none());
        assert!(!dir.path().join(SKIP_REPORT_FILE).exists());
        assert!(dir.path().join("games_gametags.yaml").exists());
    }

    #[test]
    fn source_errors_abort() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MockSheetSource::new();
        source
            .expect_sheets()
            .returning(|| Err(FixtureError::UnsupportedExtension("xlsx".into())));

        let err = BuildService::new(source, ClassifierRules::default())
            .run(dir.path(), FixtureFormat::Yaml)
            .unwrap_err();

        assert!(err.to_string().contains("Failed to read source sheets"));
    }
}
