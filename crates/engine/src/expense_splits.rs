//! Per-member shares of an [`Expense`](crate::Expense).
//!
//! Amounts are signed: reversal entries carry the negation of the shares they
//! cancel. For any expense the split amounts sum to the expense amount.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub id: Uuid,
    pub expense_id: Uuid,
    /// Zero-based participant order within the expense.
    pub position: i32,
    pub member_id: String,
    pub amount: MoneyCents,
}

impl ExpenseSplit {
    pub(crate) fn new(
        expense_id: Uuid,
        position: i32,
        member_id: String,
        amount: MoneyCents,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            expense_id,
            position,
            member_id,
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub position: i32,
    pub member_id: String,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExpenseSplit> for ActiveModel {
    fn from(split: &ExpenseSplit) -> Self {
        Self {
            id: ActiveValue::Set(split.id.to_string()),
            expense_id: ActiveValue::Set(split.expense_id.to_string()),
            position: ActiveValue::Set(split.position),
            member_id: ActiveValue::Set(split.member_id.clone()),
            amount_minor: ActiveValue::Set(split.amount.cents()),
        }
    }
}

impl TryFrom<Model> for ExpenseSplit {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "split")?,
            expense_id: parse_uuid(&model.expense_id, "expense")?,
            position: model.position,
            member_id: model.member_id,
            amount: MoneyCents::new(model.amount_minor),
        })
    }
}
