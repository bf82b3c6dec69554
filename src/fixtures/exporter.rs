use std::collections::BTreeMap;

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, ModelTrait, QueryOrder, Value};
use serde_json::{Map, Value as JsonValue, json};

use super::format::FixtureRecord;
use super::models::{
    Category, FieldKind, IMPORT_ORDER, Junction, ModelKind, column, with_entity, with_junction,
};

/// Models to export, in dependency order
pub fn export_order(category: Option<Category>) -> Vec<ModelKind> {
    IMPORT_ORDER
        .into_iter()
        .filter(|kind| category.is_none_or(|c| kind.category() == c))
        .collect()
}

/// Every stored row of one model as fixture records, ordered by key
pub async fn export_model(
    db: &impl ConnectionTrait,
    kind: ModelKind,
) -> Result<Vec<FixtureRecord>, DbErr> {
    with_entity!(kind, E => export_rows::<E>(db, kind).await)
}

fn schema_error(kind: ModelKind, name: &str) -> DbErr {
    DbErr::Custom(format!("{} has no column '{}'", kind, name))
}

fn to_json(value: Value) -> JsonValue {
    match value {
        Value::Int(v) => json!(v),
        Value::BigInt(v) => json!(v),
        Value::String(v) => v.map_or(JsonValue::Null, |s| JsonValue::String(s.to_string())),
        Value::ChronoDate(v) => v.map_or(JsonValue::Null, |d| {
            JsonValue::String(d.format("%Y-%m-%d").to_string())
        }),
        other => {
            log::warn!("Unexpected column value {:?}, exporting null", other);
            JsonValue::Null
        }
    }
}

fn as_i64(value: Value) -> Option<i64> {
    match value {
        Value::BigInt(v) => v,
        Value::Int(v) => v.map(i64::from),
        _ => None,
    }
}

async fn export_rows<E: EntityTrait>(
    db: &impl ConnectionTrait,
    kind: ModelKind,
) -> Result<Vec<FixtureRecord>, DbErr> {
    let id = column::<E>("id").ok_or_else(|| schema_error(kind, "id"))?;
    let rows = E::find().order_by_asc(id).all(db).await?;

    let mut links = BTreeMap::new();
    for spec in kind.fields() {
        if let FieldKind::Many { junction, .. } = spec.kind {
            let grouped = with_junction!(junction, J => load_links::<J>(db, junction).await)?;
            links.insert(spec.name, grouped);
        }
    }

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let pk = as_i64(row.get(id)).ok_or_else(|| schema_error(kind, "id"))?;
        let mut fields = Map::new();
        for spec in kind.fields() {
            let value = match spec.kind {
                FieldKind::Many { .. } => {
                    let targets = links
                        .get(spec.name)
                        .and_then(|grouped: &BTreeMap<i64, Vec<i64>>| grouped.get(&pk))
                        .cloned()
                        .unwrap_or_default();
                    json!(targets)
                }
                _ => {
                    let col =
                        column::<E>(spec.column).ok_or_else(|| schema_error(kind, spec.column))?;
                    to_json(row.get(col))
                }
            };
            fields.insert(spec.name.to_string(), value);
        }
        records.push(FixtureRecord::new(kind.label(), pk, fields));
    }
    Ok(records)
}

/// Junction rows grouped by owner, targets sorted
async fn load_links<J: EntityTrait>(
    db: &impl ConnectionTrait,
    junction: Junction,
) -> Result<BTreeMap<i64, Vec<i64>>, DbErr> {
    let missing = |name: &str| DbErr::Custom(format!("junction has no column '{name}'"));
    let owner_col = column::<J>(junction.owner_column())
        .ok_or_else(|| missing(junction.owner_column()))?;
    let target_col = column::<J>(junction.target_column())
        .ok_or_else(|| missing(junction.target_column()))?;

    let mut grouped: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for row in J::find().all(db).await? {
        if let (Some(owner), Some(target)) =
            (as_i64(row.get(owner_col)), as_i64(row.get(target_col)))
        {
            grouped.entry(owner).or_default().push(target);
        }
    }
    for targets in grouped.values_mut() {
        targets.sort_unstable();
    }
    Ok(grouped)
}
