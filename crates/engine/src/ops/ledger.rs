//! Ledger store: append-only expense entries with their splits.

use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, EntryKind, Expense, ExpenseSplit, MoneyCents, ResultEngine, SplitPolicy,
    SplitShare, expense_splits, expenses, splits::checked_total,
};

use super::{Engine, with_tx};

const MAX_PAGE_SIZE: u64 = 100;

/// An expense together with its splits, as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub expense: Expense,
    pub splits: Vec<ExpenseSplit>,
}

/// The two entries appended by an adjustment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub reversal: LedgerEntry,
    pub correction: LedgerEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDetail {
    pub expense: Expense,
    pub splits: Vec<ExpenseSplit>,
    /// Entries whose `parent_id` is this expense, in creation order.
    pub adjustments: Vec<Expense>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpensePage {
    pub expenses: Vec<Expense>,
    pub total: u64,
}

/// Everything needed to append one ledger entry.
pub(super) struct NewEntry {
    pub group_id: String,
    pub payer_id: String,
    pub amount: MoneyCents,
    pub description: String,
    pub policy: SplitPolicy,
    pub kind: EntryKind,
    pub parent_id: Option<Uuid>,
    pub reversal_of: Option<Uuid>,
    pub shares: Vec<SplitShare>,
}

impl Engine {
    /// Persists an expense and all of its splits inside `db_tx`.
    ///
    /// Nothing is visible until the caller commits, so an expense is never
    /// observable without its splits.
    pub(super) async fn append_expense(
        &self,
        db_tx: &DatabaseTransaction,
        entry: NewEntry,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<LedgerEntry> {
        if entry.shares.is_empty() {
            return Err(EngineError::InvalidSplit(
                "ledger entry must have at least one split".to_string(),
            ));
        }
        let split_total = checked_total(entry.shares.iter().map(|s| s.amount))?;
        if split_total != entry.amount {
            return Err(EngineError::InvalidSplit(format!(
                "split amounts ({split_total}) must equal the entry amount ({})",
                entry.amount
            )));
        }

        let expense = Expense::new(
            entry.group_id,
            entry.payer_id,
            entry.amount,
            entry.description,
            entry.policy,
            entry.kind,
            entry.parent_id,
            entry.reversal_of,
            created_at,
        );
        expenses::ActiveModel::from(&expense).insert(db_tx).await?;

        let mut splits = Vec::with_capacity(entry.shares.len());
        for (position, share) in (0..).zip(entry.shares) {
            let split = ExpenseSplit::new(expense.id, position, share.member_id, share.amount);
            expense_splits::ActiveModel::from(&split)
                .insert(db_tx)
                .await?;
            splits.push(split);
        }

        Ok(LedgerEntry { expense, splits })
    }

    pub(super) async fn find_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        expense_id: Uuid,
    ) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        Expense::try_from(model)
    }

    pub(super) async fn find_splits<C: ConnectionTrait>(
        &self,
        db: &C,
        expense_id: Uuid,
    ) -> ResultEngine<Vec<ExpenseSplit>> {
        expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id.to_string()))
            .order_by_asc(expense_splits::Column::Position)
            .all(db)
            .await?
            .into_iter()
            .map(ExpenseSplit::try_from)
            .collect()
    }

    pub(super) async fn find_adjustments<C: ConnectionTrait>(
        &self,
        db: &C,
        expense_id: Uuid,
    ) -> ResultEngine<Vec<Expense>> {
        let mut adjustments = expenses::Entity::find()
            .filter(expenses::Column::ParentId.eq(expense_id.to_string()))
            .order_by_asc(expenses::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        // A reversal and its correction share a timestamp; the reversal comes first.
        adjustments.sort_by_key(|e| (e.created_at, !e.is_reversal()));
        Ok(adjustments)
    }

    /// Returns a stored expense.
    pub async fn expense(&self, expense_id: Uuid) -> ResultEngine<Expense> {
        self.find_expense(&self.database, expense_id).await
    }

    /// Returns the splits of an expense.
    pub async fn expense_splits(&self, expense_id: Uuid) -> ResultEngine<Vec<ExpenseSplit>> {
        with_tx!(self, |db_tx| {
            self.find_expense(&db_tx, expense_id).await?;
            self.find_splits(&db_tx, expense_id).await
        })
    }

    /// Returns the adjustment entries (reversals and corrections) of an
    /// original expense, oldest first.
    pub async fn adjustments_of(&self, expense_id: Uuid) -> ResultEngine<Vec<Expense>> {
        self.find_adjustments(&self.database, expense_id).await
    }

    /// Expense, splits and adjustments in one consistent read.
    pub async fn expense_detail(&self, expense_id: Uuid) -> ResultEngine<ExpenseDetail> {
        with_tx!(self, |db_tx| {
            let expense = self.find_expense(&db_tx, expense_id).await?;
            let splits = self.find_splits(&db_tx, expense_id).await?;
            let adjustments = self.find_adjustments(&db_tx, expense_id).await?;
            Ok::<_, EngineError>(ExpenseDetail {
                expense,
                splits,
                adjustments,
            })
        })
    }

    /// Lists a group's ledger entries, newest first.
    ///
    /// `page` starts at 1, `limit` must be within `1..=100`.
    pub async fn list_expenses(
        &self,
        group_id: &str,
        page: u64,
        limit: u64,
    ) -> ResultEngine<ExpensePage> {
        if page == 0 {
            return Err(EngineError::InvalidInput("page must be >= 1".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(EngineError::InvalidInput(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let paginator = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_asc(expenses::Column::Id)
            .paginate(&self.database, limit);
        let total = paginator.num_items().await?;
        let expenses = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(ExpensePage { expenses, total })
    }
}
