#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    AuditEvent, AuditSink, CollaboratorError, Engine, LedgerEvent, MoneyCents, Notifier,
    PaymentLinkGenerator,
};
use migration::MigratorTrait;

pub const GROUP: &str = "trip";

#[derive(Default)]
pub struct RecordingAudit {
    pub events: Mutex<Vec<AuditEvent>>,
}

impl AuditSink for RecordingAudit {
    fn record(&self, event: AuditEvent) -> Result<(), CollaboratorError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

pub struct FailingAudit;

impl AuditSink for FailingAudit {
    fn record(&self, _event: AuditEvent) -> Result<(), CollaboratorError> {
        Err(CollaboratorError("audit store offline".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<LedgerEvent>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: LedgerEvent) -> Result<(), CollaboratorError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Builds `upi://` style links and rejects handles without an `@`.
pub struct FakeLinks;

impl PaymentLinkGenerator for FakeLinks {
    fn payment_link(
        &self,
        payee_handle: &str,
        payee_name: &str,
        amount: MoneyCents,
        note: &str,
    ) -> Result<Option<String>, CollaboratorError> {
        if !payee_handle.contains('@') || !amount.is_positive() {
            return Err(CollaboratorError("invalid payee handle".to_string()));
        }
        Ok(Some(format!(
            "upi://pay?pa={payee_handle}&pn={payee_name}&am={amount}&tn={note}"
        )))
    }
}

pub struct Harness {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub audit: Arc<RecordingAudit>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn harness() -> Harness {
    let db = database().await;
    let audit = Arc::new(RecordingAudit::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::builder()
        .database(db.clone())
        .payment_links(Arc::new(FakeLinks))
        .audit_sink(audit.clone())
        .notifier(notifier.clone())
        .build()
        .await
        .unwrap();
    Harness {
        engine,
        db,
        audit,
        notifier,
    }
}

/// Registers users and adds them to [`GROUP`], returning their ids.
pub async fn members<const N: usize>(engine: &Engine, names: [&str; N]) -> [String; N] {
    let mut ids = Vec::with_capacity(N);
    for name in names {
        let handle = format!("{}@bank", name.to_lowercase());
        let id = engine
            .register_user(name, Some(handle.as_str()))
            .await
            .unwrap()
            .to_string();
        engine.add_group_member(GROUP, &id).await.unwrap();
        ids.push(id);
    }
    ids.try_into().unwrap()
}

pub async fn execute(db: &DatabaseConnection, sql: &str) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(backend, sql.to_string()))
        .await
        .unwrap();
}

pub fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    db.query_one(Statement::from_string(
        backend,
        format!("SELECT COUNT(*) AS n FROM {table};"),
    ))
    .await
    .unwrap()
    .and_then(|row| row.try_get("", "n").ok())
    .unwrap_or(0)
}
