//! Ledger and settlement engine for shared group expenses.
//!
//! The engine turns expenses and settlement payments into per-member net
//! balances and suggests transfers that zero them out:
//!
//! - [`compute_splits`] divides an expense according to a [`SplitRequest`].
//! - [`Engine`] persists immutable ledger entries (expenses + splits) and
//!   appends reversal/correction pairs instead of editing history.
//! - [`BalanceSheet`] folds the ledger into [`MemberBalance`]s.
//! - [`suggest_transfers`] nets debts greedily.
//! - Settlements are created idempotently and paid off incrementally.

pub use balances::{BalanceSheet, MemberBalance};
pub use collaborators::{
    AuditEntity, AuditEvent, AuditSink, CollaboratorError, LedgerEvent, NoPaymentLinks,
    NoopNotifier, Notifier, PaymentLinkGenerator, TracingAuditSink,
};
pub use commands::{AdjustExpenseCmd, CreateExpenseCmd, CreateSettlementCmd, RecordPaymentCmd};
pub use error::EngineError;
pub use expense_splits::ExpenseSplit;
pub use expenses::{EntryKind, Expense};
pub use money::{MoneyCents, Percent, TOLERANCE};
pub use netting::{SETTLED_THRESHOLD, SuggestedTransfer, suggest_transfers};
pub use ops::{
    Adjustment, Engine, EngineBuilder, ExpenseDetail, ExpensePage, LedgerEntry, SettlementDetail,
};
pub use settlement_history::SettlementHistoryEntry;
pub use settlements::{Settlement, SettlementStatus};
pub use splits::{
    ShareAmount, SharePercent, SplitPolicy, SplitRequest, SplitShare, compute_splits,
};

mod balances;
mod collaborators;
mod commands;
mod error;
mod expense_splits;
mod expenses;
mod group_members;
mod money;
mod netting;
mod ops;
mod settlement_history;
mod settlements;
mod splits;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
