use sea_orm::{JoinType, QueryFilter, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    BalanceSheet, EngineError, Expense, ExpenseSplit, MemberBalance, ResultEngine, Settlement,
    SuggestedTransfer, expense_splits, expenses, settlements, suggest_transfers,
};

use super::{Engine, with_tx};

impl Engine {
    /// Computes every member's net balance in a group from the full ledger.
    ///
    /// - Sums originals and adjustments alike (reversals carry negative
    ///   amounts and splits).
    /// - Applies the paid part of every settlement.
    /// - Reports group members and anyone who appears in the ledger, ordered
    ///   by name.
    ///
    /// The result is a snapshot: concurrent writes may make it stale.
    pub async fn group_balances(&self, group_id: &str) -> ResultEngine<Vec<MemberBalance>> {
        with_tx!(self, |db_tx| {
            let mut sheet = BalanceSheet::new();
            for member_id in self.group_member_ids(&db_tx, group_id).await? {
                sheet.include_member(&member_id);
            }

            let expense_models: Vec<expenses::Model> = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .all(&db_tx)
                .await?;
            for model in expense_models {
                sheet.apply_expense(&Expense::try_from(model)?);
            }

            let split_models: Vec<expense_splits::Model> = expense_splits::Entity::find()
                .join(JoinType::InnerJoin, expense_splits::Relation::Expenses.def())
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .all(&db_tx)
                .await?;
            for model in split_models {
                sheet.apply_split(&ExpenseSplit::try_from(model)?);
            }

            if !sheet.total().is_zero() {
                tracing::warn!(
                    "ledger of group {group_id} does not net to zero: {}",
                    sheet.total()
                );
            }

            let settlement_models: Vec<settlements::Model> = settlements::Entity::find()
                .filter(settlements::Column::GroupId.eq(group_id.to_string()))
                .all(&db_tx)
                .await?;
            for model in settlement_models {
                sheet.apply_settlement(&Settlement::try_from(model)?);
            }

            let names = self
                .user_names(&db_tx, sheet.iter().map(|(id, _)| id))
                .await?;
            let mut balances: Vec<MemberBalance> = sheet
                .iter()
                .map(|(member_id, net_balance)| MemberBalance {
                    member_id: member_id.to_string(),
                    name: names.get(member_id).cloned().unwrap_or_default(),
                    net_balance,
                })
                .collect();
            balances.sort_by(|a, b| {
                a.name
                    .cmp(&b.name)
                    .then_with(|| a.member_id.cmp(&b.member_id))
            });

            Ok::<_, EngineError>(balances)
        })
    }

    /// Suggests transfers that settle every balance of the group.
    ///
    /// Built on a [`group_balances`](Self::group_balances) snapshot; the
    /// suggestions are advisory and are not re-checked when a settlement is
    /// later created from them.
    pub async fn optimal_settlements(
        &self,
        group_id: &str,
    ) -> ResultEngine<Vec<SuggestedTransfer>> {
        let balances = self.group_balances(group_id).await?;
        let transfers = suggest_transfers(&balances);
        tracing::debug!(
            "group {group_id}: {} balances netted into {} transfers",
            balances.len(),
            transfers.len()
        );
        Ok(transfers)
    }
}
