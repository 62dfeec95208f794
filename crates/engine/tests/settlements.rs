use std::sync::{Arc, Mutex};

use engine::{
    CollaboratorError, CreateExpenseCmd, CreateSettlementCmd, Engine, EngineError, LedgerEvent,
    MoneyCents, PaymentLinkGenerator, RecordPaymentCmd, Settlement, SettlementStatus,
    SplitRequest,
};

mod common;

use common::{GROUP, RecordingNotifier, cents, count_rows, database, harness, members};

/// Lets a second engine create the same settlement after the key lookup
/// but before the insert, the window a concurrent retry can hit.
struct RivalWriter {
    rival: Engine,
    cmd: CreateSettlementCmd,
    created: Mutex<Option<Settlement>>,
}

impl PaymentLinkGenerator for RivalWriter {
    fn payment_link(
        &self,
        _payee_handle: &str,
        _payee_name: &str,
        _amount: MoneyCents,
        _note: &str,
    ) -> Result<Option<String>, CollaboratorError> {
        let settlement = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.rival.create_settlement(self.cmd.clone()))
        })
        .map_err(|err| CollaboratorError(err.to_string()))?;
        *self.created.lock().unwrap() = Some(settlement);
        Ok(None)
    }
}

#[tokio::test]
async fn replayed_key_returns_the_same_settlement() {
    let h = harness().await;
    let [a, b] = members(&h.engine, ["Alice", "Bob"]).await;

    let first = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(25_00), "req-1"))
        .await
        .unwrap();
    let replay = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(25_00), "req-1"))
        .await
        .unwrap();

    assert_eq!(first.id, replay.id);
    assert_eq!(first.payment_link, replay.payment_link);
    assert_eq!(first.status, SettlementStatus::Pending);
    assert_eq!(first.settled_amount, MoneyCents::ZERO);
    assert_eq!(count_rows(&h.db, "settlements").await, 1);

    let created = h
        .notifier
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, LedgerEvent::SettlementCreated { .. }))
        .count();
    assert_eq!(created, 1);
    assert_eq!(h.audit.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn payment_link_is_generated_for_payee_handle() {
    let h = harness().await;
    let [a, b] = members(&h.engine, ["Alice", "Bob"]).await;
    let no_handle = h
        .engine
        .register_user("Dave", None)
        .await
        .unwrap()
        .to_string();
    let bad_handle = h
        .engine
        .register_user("Erin", Some("erin"))
        .await
        .unwrap()
        .to_string();

    let linked = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(10_00), "k-1"))
        .await
        .unwrap();
    let link = linked.payment_link.unwrap();
    assert!(link.contains("pa=bob@bank"));
    assert!(link.contains("am=10.00"));

    let unlinked = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &no_handle, cents(10_00), "k-2"))
        .await
        .unwrap();
    assert_eq!(unlinked.payment_link, None);

    // Generator failures never block the settlement.
    let failed = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &bad_handle, cents(10_00), "k-3"))
        .await
        .unwrap();
    assert_eq!(failed.payment_link, None);
}

#[tokio::test]
async fn invalid_settlements_are_rejected() {
    let h = harness().await;
    let [a, b] = members(&h.engine, ["Alice", "Bob"]).await;

    let err = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &a, cents(10_00), "self"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::SelfSettlement);

    let err = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, MoneyCents::ZERO, "zero"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, "ghost", cents(10_00), "ghost"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("payee not exists".to_string()));

    let err = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(10_00), "  "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    assert_eq!(count_rows(&h.db, "settlements").await, 0);
}

#[tokio::test]
async fn partial_payments_until_settled() {
    let h = harness().await;
    let [a, b] = members(&h.engine, ["Alice", "Bob"]).await;
    let settlement = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(100_00), "pay"))
        .await
        .unwrap();

    let partial = h
        .engine
        .record_payment(RecordPaymentCmd::new(settlement.id, &a, cents(60_00)).note("first half"))
        .await
        .unwrap();
    assert_eq!(partial.status, SettlementStatus::Partial);
    assert_eq!(partial.settled_amount, cents(60_00));

    let err = h
        .engine
        .record_payment(RecordPaymentCmd::new(settlement.id, &b, cents(50_00)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Overpayment {
            amount: cents(50_00),
            remaining: cents(40_00),
        }
    );

    let settled = h
        .engine
        .record_payment(RecordPaymentCmd::new(settlement.id, &b, cents(40_00)))
        .await
        .unwrap();
    assert_eq!(settled.status, SettlementStatus::Settled);
    assert_eq!(settled.settled_amount, settled.amount);

    let err = h
        .engine
        .record_payment(RecordPaymentCmd::new(settlement.id, &a, cents(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SettlementClosed(_)));

    let detail = h.engine.settlement(settlement.id).await.unwrap();
    assert_eq!(detail.settlement, settled);
    let amounts: Vec<MoneyCents> = detail.history.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, [cents(60_00), cents(40_00)]);
    assert_eq!(detail.history[0].note.as_deref(), Some("first half"));
    assert_eq!(detail.history[0].recorded_by, a);
}

#[tokio::test]
async fn only_parties_can_record_payments() {
    let h = harness().await;
    let [a, b, c] = members(&h.engine, ["Alice", "Bob", "Carol"]).await;
    let settlement = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(30_00), "auth"))
        .await
        .unwrap();

    let err = h
        .engine
        .record_payment(RecordPaymentCmd::new(settlement.id, &c, cents(10_00)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = h
        .engine
        .record_payment(RecordPaymentCmd::new(uuid::Uuid::new_v4(), &a, cents(10_00)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = h
        .engine
        .record_payment(RecordPaymentCmd::new(settlement.id, &a, MoneyCents::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    assert_eq!(count_rows(&h.db, "settlement_history").await, 0);
}

#[tokio::test]
async fn concurrent_payments_never_overpay() {
    let h = harness().await;
    let [a, b] = members(&h.engine, ["Alice", "Bob"]).await;
    let settlement = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(100_00), "race"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        h.engine
            .record_payment(RecordPaymentCmd::new(settlement.id, &a, cents(60_00))),
        h.engine
            .record_payment(RecordPaymentCmd::new(settlement.id, &b, cents(60_00))),
    );

    let succeeded = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    let failure = [first, second].into_iter().find_map(Result::err).unwrap();
    assert!(matches!(failure, EngineError::Overpayment { .. }));

    let detail = h.engine.settlement(settlement.id).await.unwrap();
    assert_eq!(detail.settlement.settled_amount, cents(60_00));
    assert_eq!(detail.history.len(), 1);
}

#[tokio::test]
async fn only_paid_amounts_move_balances() {
    let h = harness().await;
    let [a, b] = members(&h.engine, ["Alice", "Bob"]).await;
    h.engine
        .create_expense(CreateExpenseCmd::new(
            GROUP,
            &a,
            cents(100_00),
            "Rent",
            SplitRequest::equal([a.as_str(), b.as_str()]),
        ))
        .await
        .unwrap();

    let suggestions = h.engine.optimal_settlements(GROUP).await.unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].from, b);
    assert_eq!(suggestions[0].to, a);
    assert_eq!(suggestions[0].amount, cents(50_00));
    assert_eq!(suggestions[0].from_name, "Bob");

    // Debtor pays creditor.
    let settlement = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &b, &a, cents(50_00), "rent"))
        .await
        .unwrap();
    let before = h.engine.group_balances(GROUP).await.unwrap();
    assert_eq!(before[1].net_balance, cents(-50_00));

    h.engine
        .record_payment(RecordPaymentCmd::new(settlement.id, &b, cents(20_00)))
        .await
        .unwrap();
    let after = h.engine.group_balances(GROUP).await.unwrap();
    assert_eq!(after[0].member_id, a);
    assert_eq!(after[0].net_balance, cents(30_00));
    assert_eq!(after[1].net_balance, cents(-30_00));

    let suggestions = h.engine.optimal_settlements(GROUP).await.unwrap();
    assert_eq!(suggestions[0].amount, cents(30_00));

    h.engine
        .record_payment(RecordPaymentCmd::new(settlement.id, &a, cents(30_00)))
        .await
        .unwrap();
    assert!(h.engine.optimal_settlements(GROUP).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_only_unpaid_settlements() {
    let h = harness().await;
    let [a, b, c] = members(&h.engine, ["Alice", "Bob", "Carol"]).await;
    let pending = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(10_00), "c-1"))
        .await
        .unwrap();
    let partial = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(10_00), "c-2"))
        .await
        .unwrap();
    h.engine
        .record_payment(RecordPaymentCmd::new(partial.id, &a, cents(5_00)))
        .await
        .unwrap();

    let err = h
        .engine
        .cancel_settlement(pending.id, &c)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = h
        .engine
        .cancel_settlement(partial.id, &a)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SettlementClosed(_)));

    h.engine.cancel_settlement(pending.id, &b).await.unwrap();
    assert!(matches!(
        h.engine.settlement(pending.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(h.notifier.events.lock().unwrap().contains(
        &LedgerEvent::SettlementCancelled {
            group_id: GROUP.to_string(),
            settlement_id: pending.id,
        }
    ));
}

#[tokio::test]
async fn settlements_are_listed_by_group_and_status() {
    let h = harness().await;
    let [a, b] = members(&h.engine, ["Alice", "Bob"]).await;
    let open = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(10_00), "l-1"))
        .await
        .unwrap();
    let paid = h
        .engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &b, &a, cents(5_00), "l-2"))
        .await
        .unwrap();
    h.engine
        .create_settlement(CreateSettlementCmd::new("elsewhere", &a, &b, cents(1_00), "l-3"))
        .await
        .unwrap();
    h.engine
        .record_payment(RecordPaymentCmd::new(paid.id, &b, cents(5_00)))
        .await
        .unwrap();

    let all = h.engine.settlements(GROUP, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let pending = h
        .engine
        .settlements(GROUP, Some(SettlementStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, open.id);

    let history = h.engine.settlement_history(GROUP).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].settlement_id, paid.id);
    assert!(h.engine.settlement_history("elsewhere").await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lost_key_race_returns_the_winning_settlement() {
    let db = database().await;
    let rival = Engine::builder().database(db.clone()).build().await.unwrap();
    let [a, b] = members(&rival, ["Alice", "Bob"]).await;
    let cmd = CreateSettlementCmd::new(GROUP, &a, &b, cents(25_00), "retry-1");

    let writer = Arc::new(RivalWriter {
        rival,
        cmd: cmd.clone(),
        created: Mutex::new(None),
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::builder()
        .database(db.clone())
        .payment_links(writer.clone())
        .notifier(notifier.clone())
        .build()
        .await
        .unwrap();

    let settlement = engine.create_settlement(cmd).await.unwrap();

    let winner = writer.created.lock().unwrap().clone().unwrap();
    assert_eq!(settlement.id, winner.id);
    assert_eq!(settlement.idempotency_key, "retry-1");
    assert_eq!(count_rows(&db, "settlements").await, 1);
    assert!(notifier.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn default_engine_creates_settlements_without_links() {
    let db = database().await;
    let engine = Engine::builder().database(db).build().await.unwrap();
    let [a, b] = members(&engine, ["Alice", "Bob"]).await;

    let settlement = engine
        .create_settlement(CreateSettlementCmd::new(GROUP, &a, &b, cents(5_00), "plain"))
        .await
        .unwrap();
    assert_eq!(settlement.payment_link, None);
}
