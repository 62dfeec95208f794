//! Expense ledger entries.
//!
//! An [`Expense`] is immutable once stored. Corrections never touch the
//! original row: they append a reversal (negated amount and splits) and a
//! correction, both pointing at the original through `parent_id`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, SplitPolicy, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Original,
    Adjustment,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Adjustment => "adjustment",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "original" => Ok(Self::Original),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(EngineError::InvalidId(format!("invalid entry kind: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: String,
    pub payer_id: String,
    /// Positive for originals and corrections, negative for reversals.
    pub amount: MoneyCents,
    pub description: String,
    pub policy: SplitPolicy,
    pub kind: EntryKind,
    /// The original expense an adjustment belongs to.
    pub parent_id: Option<Uuid>,
    /// For reversals: the entry whose effect is cancelled.
    pub reversal_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        group_id: String,
        payer_id: String,
        amount: MoneyCents,
        description: String,
        policy: SplitPolicy,
        kind: EntryKind,
        parent_id: Option<Uuid>,
        reversal_of: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            payer_id,
            amount,
            description,
            policy,
            kind,
            parent_id,
            reversal_of,
            created_at,
        }
    }

    #[must_use]
    pub fn is_reversal(&self) -> bool {
        self.reversal_of.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub amount_minor: i64,
    pub description: String,
    pub split_policy: String,
    pub entry_kind: String,
    pub parent_id: Option<String>,
    pub reversal_of: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_splits::Entity")]
    ExpenseSplits,
}

impl Related<super::expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseSplits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            payer_id: ActiveValue::Set(expense.payer_id.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            description: ActiveValue::Set(expense.description.clone()),
            split_policy: ActiveValue::Set(expense.policy.as_str().to_string()),
            entry_kind: ActiveValue::Set(expense.kind.as_str().to_string()),
            parent_id: ActiveValue::Set(expense.parent_id.map(|id| id.to_string())),
            reversal_of: ActiveValue::Set(expense.reversal_of.map(|id| id.to_string())),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            group_id: model.group_id,
            payer_id: model.payer_id,
            amount: MoneyCents::new(model.amount_minor),
            description: model.description,
            policy: SplitPolicy::try_from(model.split_policy.as_str())?,
            kind: EntryKind::try_from(model.entry_kind.as_str())?,
            parent_id: model
                .parent_id
                .as_deref()
                .map(|id| parse_uuid(id, "parent expense"))
                .transpose()?,
            reversal_of: model
                .reversal_of
                .as_deref()
                .map(|id| parse_uuid(id, "reversed expense"))
                .transpose()?,
            created_at: model.created_at,
        })
    }
}
