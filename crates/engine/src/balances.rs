//! Net balances derived from a group's full ledger.
//!
//! `net = paid - owed + settled as payer - settled as payee`.
//!
//! Adjustments need no special handling: a reversal carries negated amounts
//! and splits, a correction carries positive ones, and both are folded in
//! exactly like originals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Expense, ExpenseSplit, MoneyCents, Settlement};

/// A member's aggregate position in a group.
///
/// Positive means the member is owed money, negative means the member owes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member_id: String,
    pub name: String,
    pub net_balance: MoneyCents,
}

/// Running per-member totals, keyed by member id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceSheet {
    balances: BTreeMap<String, MoneyCents>,
}

impl BalanceSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `member_id` is reported even with no ledger activity.
    pub fn include_member(&mut self, member_id: &str) {
        self.balances.entry(member_id.to_string()).or_default();
    }

    /// Credits the payer with the expense amount.
    pub fn apply_expense(&mut self, expense: &Expense) {
        *self.balances.entry(expense.payer_id.clone()).or_default() += expense.amount;
    }

    /// Debits a participant with the share they owe.
    pub fn apply_split(&mut self, split: &ExpenseSplit) {
        *self.balances.entry(split.member_id.clone()).or_default() -= split.amount;
    }

    /// Moves the paid part of a settlement from the payee to the payer.
    pub fn apply_settlement(&mut self, settlement: &Settlement) {
        let paid = settlement.settled_amount;
        *self.balances.entry(settlement.payer_id.clone()).or_default() += paid;
        *self.balances.entry(settlement.payee_id.clone()).or_default() -= paid;
    }

    #[must_use]
    pub fn net(&self, member_id: &str) -> MoneyCents {
        self.balances.get(member_id).copied().unwrap_or_default()
    }

    /// Sum over every member. Zero for any consistent ledger.
    #[must_use]
    pub fn total(&self) -> MoneyCents {
        self.balances.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MoneyCents)> {
        self.balances.iter().map(|(id, amount)| (id.as_str(), *amount))
    }
}
