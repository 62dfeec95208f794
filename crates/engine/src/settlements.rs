//! Settlements: tracked payment intents between two group members.
//!
//! A settlement moves through `pending -> partial -> settled` as payments are
//! recorded against it. The status is never stored independently of the
//! amounts: it is always [`SettlementStatus::from_amounts`] of the row.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Partial,
    Settled,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Settled => "settled",
        }
    }

    /// Status implied by how much of `amount` has been paid.
    #[must_use]
    pub fn from_amounts(settled: MoneyCents, amount: MoneyCents) -> Self {
        if settled >= amount {
            Self::Settled
        } else if settled.is_positive() {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

impl TryFrom<&str> for SettlementStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "settled" => Ok(Self::Settled),
            other => Err(EngineError::InvalidInput(format!(
                "invalid settlement status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub group_id: String,
    /// Debtor: the member sending money.
    pub payer_id: String,
    /// Creditor: the member receiving money.
    pub payee_id: String,
    pub amount: MoneyCents,
    pub settled_amount: MoneyCents,
    pub idempotency_key: String,
    pub payment_link: Option<String>,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Settlement {
    pub(crate) fn new(
        group_id: String,
        payer_id: String,
        payee_id: String,
        amount: MoneyCents,
        idempotency_key: String,
        payment_link: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            payer_id,
            payee_id,
            amount,
            settled_amount: MoneyCents::ZERO,
            idempotency_key,
            payment_link,
            status: SettlementStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> MoneyCents {
        self.amount - self.settled_amount
    }

    /// `true` when `user_id` is either side of the settlement.
    #[must_use]
    pub fn involves(&self, user_id: &str) -> bool {
        self.payer_id == user_id || self.payee_id == user_id
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount_minor: i64,
    pub settled_minor: i64,
    #[sea_orm(unique)]
    pub idempotency_key: String,
    pub payment_link: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::settlement_history::Entity")]
    SettlementHistory,
}

impl Related<super::settlement_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SettlementHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Settlement> for ActiveModel {
    fn from(settlement: &Settlement) -> Self {
        Self {
            id: ActiveValue::Set(settlement.id.to_string()),
            group_id: ActiveValue::Set(settlement.group_id.clone()),
            payer_id: ActiveValue::Set(settlement.payer_id.clone()),
            payee_id: ActiveValue::Set(settlement.payee_id.clone()),
            amount_minor: ActiveValue::Set(settlement.amount.cents()),
            settled_minor: ActiveValue::Set(settlement.settled_amount.cents()),
            idempotency_key: ActiveValue::Set(settlement.idempotency_key.clone()),
            payment_link: ActiveValue::Set(settlement.payment_link.clone()),
            status: ActiveValue::Set(settlement.status.as_str().to_string()),
            created_at: ActiveValue::Set(settlement.created_at),
            updated_at: ActiveValue::Set(settlement.updated_at),
        }
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "settlement")?,
            group_id: model.group_id,
            payer_id: model.payer_id,
            payee_id: model.payee_id,
            amount: MoneyCents::new(model.amount_minor),
            settled_amount: MoneyCents::new(model.settled_minor),
            idempotency_key: model.idempotency_key,
            payment_link: model.payment_link,
            status: SettlementStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
