//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expenses, adjustments,
//! settlements, payments), keeping call sites readable and avoiding long
//! argument lists.

use uuid::Uuid;

use crate::{MoneyCents, SplitRequest};

/// Record a new shared expense.
#[derive(Clone, Debug)]
pub struct CreateExpenseCmd {
    pub group_id: String,
    pub payer_id: String,
    pub amount: MoneyCents,
    pub description: String,
    pub split: SplitRequest,
    /// Who performs the action (audit). Defaults to the payer.
    pub actor_id: String,
}

impl CreateExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        payer_id: impl Into<String>,
        amount: MoneyCents,
        description: impl Into<String>,
        split: SplitRequest,
    ) -> Self {
        let payer_id = payer_id.into();
        Self {
            group_id: group_id.into(),
            actor_id: payer_id.clone(),
            payer_id,
            amount,
            description: description.into(),
            split,
        }
    }

    #[must_use]
    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }
}

/// Correct an original expense by appending a reversal and a correction.
#[derive(Clone, Debug)]
pub struct AdjustExpenseCmd {
    pub group_id: String,
    pub expense_id: Uuid,
    pub payer_id: String,
    pub amount: MoneyCents,
    pub description: String,
    pub split: SplitRequest,
    pub actor_id: String,
}

impl AdjustExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        expense_id: Uuid,
        payer_id: impl Into<String>,
        amount: MoneyCents,
        description: impl Into<String>,
        split: SplitRequest,
    ) -> Self {
        let payer_id = payer_id.into();
        Self {
            group_id: group_id.into(),
            expense_id,
            actor_id: payer_id.clone(),
            payer_id,
            amount,
            description: description.into(),
            split,
        }
    }

    #[must_use]
    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }
}

/// Create (or replay) a settlement from `payer_id` to `payee_id`.
#[derive(Clone, Debug)]
pub struct CreateSettlementCmd {
    pub group_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: MoneyCents,
    pub idempotency_key: String,
}

impl CreateSettlementCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        payer_id: impl Into<String>,
        payee_id: impl Into<String>,
        amount: MoneyCents,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            payer_id: payer_id.into(),
            payee_id: payee_id.into(),
            amount,
            idempotency_key: idempotency_key.into(),
        }
    }
}

/// Record a (partial) payment against a settlement.
#[derive(Clone, Debug)]
pub struct RecordPaymentCmd {
    pub settlement_id: Uuid,
    pub requester_id: String,
    pub amount: MoneyCents,
    pub note: Option<String>,
}

impl RecordPaymentCmd {
    #[must_use]
    pub fn new(settlement_id: Uuid, requester_id: impl Into<String>, amount: MoneyCents) -> Self {
        Self {
            settlement_id,
            requester_id: requester_id.into(),
            amount,
            note: None,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
