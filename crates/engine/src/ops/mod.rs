use std::{fmt, sync::Arc};

use sea_orm::DatabaseConnection;

use crate::{
    AuditEvent, AuditSink, LedgerEvent, NoPaymentLinks, NoopNotifier, Notifier,
    PaymentLinkGenerator, TracingAuditSink,
};

mod balances;
mod expenses;
mod ledger;
mod members;
mod settlements;

pub use ledger::{Adjustment, ExpenseDetail, ExpensePage, LedgerEntry};
pub use settlements::SettlementDetail;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    payment_links: Arc<dyn PaymentLinkGenerator>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Hands an audit event to the sink. Failures are logged, never returned.
    fn audit(&self, event: AuditEvent) {
        let action = event.action;
        if let Err(err) = self.audit.record(event) {
            tracing::warn!("audit sink failed for {action}: {err}");
        }
    }

    /// Best-effort real-time notification after a committed write.
    fn notify(&self, event: LedgerEvent) {
        if let Err(err) = self.notifier.notify(event) {
            tracing::warn!("notifier failed: {err}");
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    payment_links: Option<Arc<dyn PaymentLinkGenerator>>,
    audit: Option<Arc<dyn AuditSink>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Payment-link generator used for new settlements (default: none).
    pub fn payment_links(mut self, generator: Arc<dyn PaymentLinkGenerator>) -> EngineBuilder {
        self.payment_links = Some(generator);
        self
    }

    /// Audit sink (default: [`TracingAuditSink`]).
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> EngineBuilder {
        self.audit = Some(sink);
        self
    }

    /// Real-time notifier (default: drop every event).
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> crate::ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            payment_links: self
                .payment_links
                .unwrap_or_else(|| Arc::new(NoPaymentLinks)),
            audit: self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink)),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
        })
    }
}
