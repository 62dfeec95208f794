//! Append-only log of payments recorded against a settlement.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementHistoryEntry {
    pub id: Uuid,
    pub settlement_id: Uuid,
    pub amount: MoneyCents,
    pub note: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlement_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub settlement_id: String,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::settlements::Entity",
        from = "Column::SettlementId",
        to = "super::settlements::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Settlements,
}

impl Related<super::settlements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settlements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SettlementHistoryEntry> for ActiveModel {
    fn from(entry: &SettlementHistoryEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            settlement_id: ActiveValue::Set(entry.settlement_id.to_string()),
            amount_minor: ActiveValue::Set(entry.amount.cents()),
            note: ActiveValue::Set(entry.note.clone()),
            recorded_by: ActiveValue::Set(entry.recorded_by.clone()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for SettlementHistoryEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "settlement history")?,
            settlement_id: parse_uuid(&model.settlement_id, "settlement")?,
            amount: MoneyCents::new(model.amount_minor),
            note: model.note,
            recorded_by: model.recorded_by,
            created_at: model.created_at,
        })
    }
}
