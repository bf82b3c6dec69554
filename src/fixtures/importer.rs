//! Reconciles fixture records with the database.
//!
//! Records are written one at a time, each inside its own transaction.
//! Per-record failures are collected as error lines and never stop the batch.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IntoActiveModel, QueryFilter, QuerySelect, TransactionTrait,
    Value,
};
use serde_json::Value as JsonValue;

use super::error::{ConstraintKind, FixtureError, RecordError, RecordFailure, UnresolvedRef};
use super::format::FixtureRecord;
use super::models::{FieldKind, Junction, ModelKind, column, with_entity, with_junction};
use crate::entities::game_tag;
use crate::slug::{tag_slug_base, unique_slug};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DuplicatePolicy {
    /// Leave existing rows untouched
    #[default]
    Skip,
    /// Update existing rows in place
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub policy: DuplicatePolicy,
    /// 0 minimal, 1 per-record errors, 2 duplicate skips, 3 everything
    pub verbosity: u8,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            policy: DuplicatePolicy::Skip,
            verbosity: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ImportStats {
    pub fn merge(&mut self, other: ImportStats) {
        self.total += other.total;
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created,
    Updated,
    Duplicate,
}

/// Resolve every model label up front so a bad batch is rejected before any write
pub fn resolve_models(records: &[FixtureRecord]) -> Result<Vec<ModelKind>, FixtureError> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            ModelKind::from_label(&record.model).ok_or_else(|| FixtureError::UnknownModel {
                index: idx + 1,
                model: record.model.clone(),
            })
        })
        .collect()
}

pub async fn import_records(
    db: &DatabaseConnection,
    records: &[FixtureRecord],
    options: ImportOptions,
) -> Result<ImportStats, FixtureError> {
    let kinds = resolve_models(records)?;
    let mut stats = ImportStats {
        total: records.len(),
        ..Default::default()
    };

    for (idx, (record, kind)) in records.iter().zip(kinds).enumerate() {
        let index = idx + 1;
        match import_record(db, kind, record, options.policy).await {
            Ok(Outcome::Created) => stats.created += 1,
            Ok(Outcome::Updated) => stats.updated += 1,
            Ok(Outcome::Duplicate) => {
                stats.skipped += 1;
                if options.verbosity >= 2 {
                    log::info!("Skipped duplicate: {} pk={}", record.model, record.pk);
                }
            }
            Err(failure) => {
                stats.skipped += 1;
                let line = failure.describe(index, &record.model, record.pk);
                if options.verbosity >= 1 {
                    log::warn!("Error processing {}", line);
                }
                stats.errors.push(line);
            }
        }
    }

    log::debug!(
        "Imported {} records: {} created, {} updated, {} skipped",
        stats.total,
        stats.created,
        stats.updated,
        stats.skipped
    );
    Ok(stats)
}

async fn import_record(
    db: &DatabaseConnection,
    kind: ModelKind,
    record: &FixtureRecord,
    policy: DuplicatePolicy,
) -> Result<Outcome, RecordFailure> {
    let txn = db.begin().await?;

    let result = with_entity!(kind, E => write_record::<E>(&txn, kind, record, policy).await);

    match result {
        Ok(outcome) => {
            txn.commit().await?;
            log::trace!("{} pk={}: {:?}", record.model, record.pk, outcome);
            Ok(outcome)
        }
        Err(failure) => {
            if let Err(e) = txn.rollback().await {
                log::debug!(
                    "Rollback of {} pk={} failed: {}",
                    record.model,
                    record.pk,
                    e
                );
            }
            Err(failure)
        }
    }
}

/// A fixture field ready to be written
struct PlannedValue<C> {
    field: &'static str,
    column: C,
    value: Value,
}

struct Plan<C> {
    values: Vec<PlannedValue<C>>,
    links: Vec<(Junction, Vec<i64>)>,
    unresolved: Vec<UnresolvedRef>,
}

async fn write_record<E>(
    txn: &DatabaseTransaction,
    kind: ModelKind,
    record: &FixtureRecord,
    policy: DuplicatePolicy,
) -> Result<Outcome, RecordFailure>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelBehavior + Send + Sync,
{
    let id = entity_column::<E>(kind, "id")?;
    let existing = E::find().filter(id.eq(record.pk)).one(txn).await?;

    if existing.is_some() && policy == DuplicatePolicy::Skip {
        return Ok(Outcome::Duplicate);
    }

    let mut plan = plan_fields::<E>(txn, kind, record).await?;
    let unresolved = std::mem::take(&mut plan.unresolved);
    let fail = |error: RecordError| RecordFailure::new(error, unresolved.clone());

    if kind == ModelKind::GameTag {
        fill_missing_slug::<E>(txn, &mut plan, record.pk, existing.is_none())
            .await
            .map_err(fail)?;
    }

    let (mut model, outcome) = match existing {
        Some(model) => (model.into_active_model(), Outcome::Updated),
        None => {
            let mut model = <E::ActiveModel as ActiveModelBehavior>::new();
            model
                .try_set(id, Value::from(record.pk))
                .map_err(|e| fail(invalid("pk", e)))?;
            (model, Outcome::Created)
        }
    };

    for planned in plan.values {
        model
            .try_set(planned.column, planned.value)
            .map_err(|e| fail(invalid(planned.field, e)))?;
    }

    if kind == ModelKind::SoundSource {
        check_bank_or_product::<E>(&model).map_err(fail)?;
    }

    let written = match outcome {
        Outcome::Created => model.insert(txn).await,
        _ => model.update(txn).await,
    };
    written.map_err(|e| fail(RecordError::from(e)))?;

    // An empty list never clears existing links
    for (junction, targets) in &plan.links {
        let linked = with_junction!(*junction, J => {
            replace_links::<J>(txn, *junction, record.pk, targets).await
        });
        linked.map_err(|e| fail(RecordError::from(e)))?;
    }

    Ok(outcome)
}

fn entity_column<E: EntityTrait>(kind: ModelKind, name: &str) -> Result<E::Column, RecordError> {
    column::<E>(name)
        .ok_or_else(|| RecordError::Schema(format!("{} has no column '{}'", kind, name)))
}

fn invalid(field: &str, err: impl std::fmt::Display) -> RecordError {
    RecordError::InvalidValue {
        field: field.to_string(),
        message: err.to_string(),
    }
}

fn not_null(kind: ModelKind, column: &str) -> RecordError {
    RecordError::Constraint {
        kind: ConstraintKind::NotNull,
        message: format!("NOT NULL constraint failed: {}.{}", kind.table(), column),
    }
}

fn as_key(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

async fn plan_fields<E: EntityTrait>(
    txn: &DatabaseTransaction,
    kind: ModelKind,
    record: &FixtureRecord,
) -> Result<Plan<E::Column>, RecordError> {
    let mut plan = Plan {
        values: Vec::new(),
        links: Vec::new(),
        unresolved: Vec::new(),
    };

    for (name, raw) in &record.fields {
        let Some(spec) = kind.field(name) else {
            log::debug!("{} has no field '{}', ignoring it", kind, name);
            continue;
        };

        let value = match spec.kind {
            FieldKind::Text => match raw {
                JsonValue::Null => return Err(not_null(kind, spec.column)),
                JsonValue::String(s) => Value::from(s.clone()),
                JsonValue::Number(n) => Value::from(n.to_string()),
                JsonValue::Bool(b) => Value::from(b.to_string()),
                _ => return Err(invalid(spec.name, "expected text")),
            },
            FieldKind::Integer => match raw {
                JsonValue::Null => Value::Int(None),
                JsonValue::String(s) if s.trim().is_empty() => Value::Int(None),
                other => {
                    let n = as_key(other)
                        .and_then(|n| i32::try_from(n).ok())
                        .ok_or_else(|| {
                            invalid(spec.name, format!("expected an integer, got {other}"))
                        })?;
                    Value::from(n)
                }
            },
            FieldKind::Date => match raw {
                JsonValue::Null => Value::ChronoDate(None),
                JsonValue::String(s) if s.trim().is_empty() => Value::ChronoDate(None),
                JsonValue::String(s) => {
                    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                        .map_err(|e| invalid(spec.name, format!("'{s}' is not YYYY-MM-DD: {e}")))?;
                    Value::from(date)
                }
                other => return Err(invalid(spec.name, format!("expected a date, got {other}"))),
            },
            FieldKind::Reference { target, nullable } => match raw {
                JsonValue::Null if nullable => Value::BigInt(None),
                JsonValue::Null => return Err(not_null(kind, spec.column)),
                other => {
                    let key = as_key(other).ok_or_else(|| {
                        invalid(spec.name, format!("expected a {} key, got {other}", target))
                    })?;
                    if !exists(txn, target, key).await? {
                        plan.unresolved.push(UnresolvedRef {
                            field: spec.name.to_string(),
                            model: target.label(),
                            pk: key,
                        });
                    }
                    Value::from(key)
                }
            },
            FieldKind::Many { target, junction } => {
                let keys = match raw {
                    JsonValue::Null => Vec::new(),
                    JsonValue::Array(items) => items
                        .iter()
                        .map(|item| {
                            as_key(item).ok_or_else(|| {
                                invalid(spec.name, format!("expected {} keys, got {item}", target))
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    other => {
                        return Err(invalid(spec.name, format!("expected a list, got {other}")));
                    }
                };
                if !keys.is_empty() {
                    let unique: BTreeSet<i64> = keys.into_iter().collect();
                    plan.links.push((junction, unique.into_iter().collect()));
                }
                continue;
            }
        };

        plan.values.push(PlannedValue {
            field: spec.name,
            column: entity_column::<E>(kind, spec.column)?,
            value,
        });
    }

    Ok(plan)
}

async fn exists(txn: &DatabaseTransaction, kind: ModelKind, pk: i64) -> Result<bool, RecordError> {
    with_entity!(kind, T => row_exists::<T>(txn, kind, pk).await)
}

async fn row_exists<E: EntityTrait>(
    db: &impl ConnectionTrait,
    kind: ModelKind,
    pk: i64,
) -> Result<bool, RecordError> {
    let id = entity_column::<E>(kind, "id")?;
    Ok(E::find().filter(id.eq(pk)).one(db).await?.is_some())
}

/// A tag written without a slug (or with an empty one) gets one from its name,
/// numbered past any slug another tag already holds
async fn fill_missing_slug<E: EntityTrait>(
    txn: &DatabaseTransaction,
    plan: &mut Plan<E::Column>,
    pk: i64,
    creating: bool,
) -> Result<(), RecordError> {
    let text = |value: &Value| match value {
        Value::String(Some(s)) => Some(s.to_string()),
        _ => None,
    };
    let name = plan
        .values
        .iter()
        .find(|v| v.field == "name")
        .and_then(|v| text(&v.value));
    let Some(name) = name else {
        return Ok(());
    };

    let slot = plan.values.iter().position(|v| v.field == "slug");
    let missing = match slot {
        Some(i) => text(&plan.values[i].value).is_none_or(|s| s.is_empty()),
        None => creating,
    };
    if !missing {
        return Ok(());
    }

    let base = tag_slug_base(&name, pk);
    let taken: BTreeSet<String> = game_tag::Entity::find()
        .select_only()
        .column(game_tag::Column::Slug)
        .filter(game_tag::Column::Id.ne(pk))
        .filter(game_tag::Column::Slug.starts_with(base.as_str()))
        .into_tuple::<String>()
        .all(txn)
        .await?
        .into_iter()
        .collect();
    let slug = Value::from(unique_slug(&base, |s| taken.contains(s)));

    match slot {
        Some(i) => plan.values[i].value = slug,
        None => plan.values.push(PlannedValue {
            field: "slug",
            column: entity_column::<E>(ModelKind::GameTag, "slug")?,
            value: slug,
        }),
    }
    Ok(())
}

fn is_null(value: Option<Value>) -> bool {
    matches!(value, None | Some(Value::BigInt(None)) | Some(Value::Int(None)))
}

fn check_bank_or_product<E: EntityTrait>(model: &E::ActiveModel) -> Result<(), RecordError> {
    let bank = entity_column::<E>(ModelKind::SoundSource, "bank_id")?;
    let product = entity_column::<E>(ModelKind::SoundSource, "product_id")?;
    if is_null(model.get(bank).into_value()) && is_null(model.get(product).into_value()) {
        return Err(RecordError::Validation(
            "a sound source must reference a bank or a product".to_string(),
        ));
    }
    Ok(())
}

async fn replace_links<J>(
    txn: &DatabaseTransaction,
    junction: Junction,
    owner: i64,
    targets: &[i64],
) -> Result<(), sea_orm::DbErr>
where
    J: EntityTrait,
    J::Model: IntoActiveModel<J::ActiveModel> + Send + Sync,
    J::ActiveModel: ActiveModelBehavior + Send + Sync,
{
    let missing = |name: &str| sea_orm::DbErr::Custom(format!("junction has no column '{name}'"));
    let owner_col = column::<J>(junction.owner_column())
        .ok_or_else(|| missing(junction.owner_column()))?;
    let target_col = column::<J>(junction.target_column())
        .ok_or_else(|| missing(junction.target_column()))?;

    J::delete_many()
        .filter(owner_col.eq(owner))
        .exec(txn)
        .await?;

    for target in targets {
        let mut link = <J::ActiveModel as ActiveModelTrait>::default();
        link.try_set(owner_col, Value::from(owner))?;
        link.try_set(target_col, Value::from(*target))?;
        J::insert(link).exec_without_returning(txn).await?;
    }
    Ok(())
}
