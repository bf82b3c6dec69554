use std::collections::BTreeSet;
use std::sync::Arc;

use color_eyre::{Result, eyre::Context};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel, QueryOrder};

use crate::database::Database;
use crate::entities::game_tag;
use crate::slug::{is_variant_of, tag_slug_base, unique_slug};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugChange {
    pub name: String,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlugRepairReport {
    pub changes: Vec<SlugChange>,
    pub updated: usize,
    pub unchanged: usize,
}

pub struct SlugRepairService {
    db: Arc<Database>,
}

impl SlugRepairService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Recompute GameTag slugs from their names. A slug that is already the
    /// name's base or a numbered variant of it is left alone. A dry run only
    /// reports.
    pub async fn run(&self, dry_run: bool) -> Result<SlugRepairReport> {
        let tags = game_tag::Entity::find()
            .order_by_asc(game_tag::Column::Id)
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to load game tags")?;

        let mut taken: BTreeSet<String> = tags.iter().map(|t| t.slug.clone()).collect();
        let mut report = SlugRepairReport::default();
        for tag in tags {
            let base = tag_slug_base(&tag.name, tag.id);
            if is_variant_of(&tag.slug, &base) {
                report.unchanged += 1;
                continue;
            }

            taken.remove(&tag.slug);
            let slug = unique_slug(&base, |s| taken.contains(s));
            taken.insert(slug.clone());

            log::info!("'{}': {} -> {}", tag.name, tag.slug, slug);
            report.changes.push(SlugChange {
                name: tag.name.clone(),
                old: tag.slug.clone(),
                new: slug.clone(),
            });

            if !dry_run {
                let name = tag.name.clone();
                let mut active = tag.into_active_model();
                active.slug = Set(slug);
                active
                    .update(&self.db.conn)
                    .await
                    .wrap_err_with(|| format!("Failed to update slug of '{}'", name))?;
            }
            report.updated += 1;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_db;
    use sea_orm::ActiveModelBehavior;

    async fn insert_tag(db: &Database, id: i64, name: &str, slug: &str) {
        game_tag::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            description: Set(String::new()),
            ..game_tag::ActiveModel::new()
        }
        .insert(&db.conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn rewrites_non_ascii_slugs() {
        let db = test_db().await;
        insert_tag(&db, 1, "Pokémon", "pokémon").await;
        insert_tag(&db, 2, "Mother", "mother").await;

        let report = SlugRepairService::new(db.clone())
            .run(false)
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.changes[0].new, "pokemon");
        let stored = game_tag::Entity::find_by_id(1)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.slug, "pokemon");
    }

    #[tokio::test]
    async fn dry_run_leaves_rows_alone() {
        let db = test_db().await;
        insert_tag(&db, 1, "Ōkami", "ōkami").await;

        let report = SlugRepairService::new(db.clone()).run(true).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.changes[0].old, "ōkami");
        let stored = game_tag::Entity::find_by_id(1)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.slug, "ōkami");
    }

    #[tokio::test]
    async fn built_and_imported_slugs_are_kept() {
        use crate::fixtures::builder::build;
        use crate::fixtures::classify::ClassifierRules;
        use crate::fixtures::importer::{ImportOptions, import_records};
        use crate::ports::sheets::Sheet;

        let sheets: Vec<Sheet> = ["Pokémon", "Pokemon", "★"]
            .into_iter()
            .map(|name| Sheet {
                name: name.to_string(),
                source: format!("{name}.csv"),
                rows: Vec::new(),
            })
            .collect();
        let output = build(&ClassifierRules::default(), &sheets);
        let db = test_db().await;
        let stats = import_records(&db.conn, &output.game_tags, ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(stats.created, 3);

        let service = SlugRepairService::new(db.clone());
        let preview = service.run(true).await.unwrap();
        assert!(preview.changes.is_empty());

        let report = service.run(false).await.unwrap();
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 3);
        let stored = game_tag::Entity::find_by_id(3)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.slug, "tag-3");
    }

    #[tokio::test]
    async fn repaired_slug_skips_one_in_use() {
        let db = test_db().await;
        insert_tag(&db, 1, "Pokemon", "pokemon").await;
        insert_tag(&db, 2, "Pokémon", "pokémon").await;
        insert_tag(&db, 3, "★", "").await;

        let report = SlugRepairService::new(db.clone())
            .run(false)
            .await
            .unwrap();

        let new: Vec<_> = report.changes.iter().map(|c| c.new.as_str()).collect();
        assert_eq!(new, vec!["pokemon-2", "tag-3"]);
        assert_eq!(report.unchanged, 1);
    }
}
