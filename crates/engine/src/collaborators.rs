//! Side channels the engine talks to but does not own.
//!
//! - [`PaymentLinkGenerator`]: builds a deep link a debtor can open to pay.
//! - [`AuditSink`]: receives fire-and-forget audit events.
//! - [`Notifier`]: is told about committed ledger changes.
//!
//! All of them are invoked only after the database transaction committed, and
//! their failures are logged and swallowed: ledger state never depends on
//! them.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{MoneyCents, Settlement};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

/// Builds payment deep links for a payee.
pub trait PaymentLinkGenerator: Send + Sync {
    /// `Ok(None)` when no link is offered for this payee. Fails when
    /// `payee_handle` is malformed or `amount` is not positive.
    fn payment_link(
        &self,
        payee_handle: &str,
        payee_name: &str,
        amount: MoneyCents,
        note: &str,
    ) -> Result<Option<String>, CollaboratorError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Expense,
    Settlement,
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Expense => "expense",
            Self::Settlement => "settlement",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditEvent {
    pub actor: String,
    pub entity_type: AuditEntity,
    pub entity_id: Uuid,
    pub action: &'static str,
    pub metadata: Value,
}

/// Receives audit events. Implementations must not block for long.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), CollaboratorError>;
}

/// Committed changes a real-time channel may want to broadcast.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    ExpenseCreated {
        group_id: String,
        expense_id: Uuid,
    },
    ExpenseAdjusted {
        group_id: String,
        original_id: Uuid,
        reversal_id: Uuid,
        correction_id: Uuid,
    },
    SettlementCreated {
        group_id: String,
        settlement: Settlement,
    },
    SettlementPaid {
        group_id: String,
        settlement: Settlement,
        amount: MoneyCents,
    },
    SettlementCancelled {
        group_id: String,
        settlement_id: Uuid,
    },
}

/// Best-effort delivery of [`LedgerEvent`]s.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: LedgerEvent) -> Result<(), CollaboratorError>;
}

/// Payment links disabled: settlements are created without one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPaymentLinks;

impl PaymentLinkGenerator for NoPaymentLinks {
    fn payment_link(
        &self,
        _payee_handle: &str,
        _payee_name: &str,
        _amount: MoneyCents,
        _note: &str,
    ) -> Result<Option<String>, CollaboratorError> {
        Ok(None)
    }
}

/// Writes audit events as structured log records under the `audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), CollaboratorError> {
        tracing::info!(
            target: "audit",
            actor = %event.actor,
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            action = event.action,
            metadata = %event.metadata,
            "audit event"
        );
        Ok(())
    }
}

/// Drops every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: LedgerEvent) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_links_are_not_an_error() {
        let link = NoPaymentLinks.payment_link("bob@bank", "Bob", MoneyCents::new(10_00), "note");
        assert_eq!(link, Ok(None));
    }
}
