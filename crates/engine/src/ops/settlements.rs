use chrono::Utc;
use sea_orm::{
    JoinType, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AuditEntity, AuditEvent, CreateSettlementCmd, EngineError, LedgerEvent, MoneyCents,
    RecordPaymentCmd, ResultEngine, Settlement, SettlementHistoryEntry, SettlementStatus,
    settlement_history, settlements,
    util::{normalize_optional_text, normalize_required_id},
};

use super::{Engine, with_tx};

/// A settlement with every payment recorded against it, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDetail {
    pub settlement: Settlement,
    pub history: Vec<SettlementHistoryEntry>,
}

/// Why a guarded payment update matched no row.
fn payment_conflict(settlement: &Settlement, amount: MoneyCents) -> EngineError {
    if settlement.status == SettlementStatus::Settled {
        EngineError::SettlementClosed("settlement is already settled".to_string())
    } else {
        EngineError::Overpayment {
            amount,
            remaining: settlement.remaining(),
        }
    }
}

impl Engine {
    async fn find_settlement<C: ConnectionTrait>(
        &self,
        db: &C,
        settlement_id: Uuid,
    ) -> ResultEngine<Settlement> {
        let model = settlements::Entity::find_by_id(settlement_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
        Settlement::try_from(model)
    }

    async fn find_by_idempotency_key<C: ConnectionTrait>(
        &self,
        db: &C,
        idempotency_key: &str,
    ) -> ResultEngine<Option<Settlement>> {
        settlements::Entity::find()
            .filter(settlements::Column::IdempotencyKey.eq(idempotency_key.to_string()))
            .one(db)
            .await?
            .map(Settlement::try_from)
            .transpose()
    }

    /// Creates a pending settlement from `payer_id` (debtor) to `payee_id`.
    ///
    /// Idempotent on `idempotency_key`: a replay returns the settlement first
    /// created with that key, whatever the other parameters are, and runs no
    /// side effects.
    pub async fn create_settlement(&self, cmd: CreateSettlementCmd) -> ResultEngine<Settlement> {
        let group_id = normalize_required_id(&cmd.group_id, "group id")?;
        let payer_id = normalize_required_id(&cmd.payer_id, "payer id")?;
        let payee_id = normalize_required_id(&cmd.payee_id, "payee id")?;
        let idempotency_key = normalize_required_id(&cmd.idempotency_key, "idempotency key")?;
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
        }
        if payer_id == payee_id {
            return Err(EngineError::SelfSettlement);
        }

        if let Some(existing) = self
            .find_by_idempotency_key(&self.database, &idempotency_key)
            .await?
        {
            tracing::debug!(
                "settlement {} replayed for key {idempotency_key}",
                existing.id
            );
            return Ok(existing);
        }

        self.require_user(&self.database, &payer_id).await?;
        let payee = as_missing_payee(self.require_user(&self.database, &payee_id).await)?;

        let payment_link = match payee.payment_handle.as_deref() {
            Some(handle) => match self.payment_links.payment_link(
                handle,
                &payee.name,
                cmd.amount,
                &format!("Settlement {group_id}"),
            ) {
                Ok(link) => link,
                Err(err) => {
                    tracing::warn!("payment link for payee {payee_id} not generated: {err}");
                    None
                }
            },
            None => None,
        };

        let settlement = Settlement::new(
            group_id.clone(),
            payer_id,
            payee_id,
            cmd.amount,
            idempotency_key,
            payment_link,
            Utc::now(),
        );
        if let Err(err) = settlements::ActiveModel::from(&settlement)
            .insert(&self.database)
            .await
        {
            // A concurrent request with the same key won the unique index.
            if let Some(existing) = self
                .find_by_idempotency_key(&self.database, &settlement.idempotency_key)
                .await?
            {
                return Ok(existing);
            }
            return Err(err.into());
        }

        tracing::info!(
            "settlement {} created in group {group_id}: {} from {} to {}",
            settlement.id,
            settlement.amount,
            settlement.payer_id,
            settlement.payee_id
        );
        self.audit(AuditEvent {
            actor: settlement.payer_id.clone(),
            entity_type: AuditEntity::Settlement,
            entity_id: settlement.id,
            action: "created",
            metadata: json!({
                "payee_id": settlement.payee_id,
                "amount": settlement.amount,
            }),
        });
        self.notify(LedgerEvent::SettlementCreated {
            group_id,
            settlement: settlement.clone(),
        });

        Ok(settlement)
    }

    /// Records a payment of `cmd.amount` against a settlement.
    ///
    /// Only the payer or the payee may record. The amount may not exceed what
    /// is still owed. The check and the increment happen in one guarded
    /// `UPDATE`, so concurrent payments can never push `settled_amount` past
    /// `amount`.
    pub async fn record_payment(&self, cmd: RecordPaymentCmd) -> ResultEngine<Settlement> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
        }
        let requester_id = cmd.requester_id.trim().to_string();
        let note = normalize_optional_text(cmd.note.as_deref());

        let settlement = with_tx!(self, |db_tx| {
            let current = self.find_settlement(&db_tx, cmd.settlement_id).await?;
            if !current.involves(&requester_id) {
                return Err(EngineError::Forbidden(
                    "only the payer or payee can record payments".to_string(),
                ));
            }
            if current.status == SettlementStatus::Settled || cmd.amount > current.remaining() {
                return Err(payment_conflict(&current, cmd.amount));
            }

            let now = Utc::now();
            let backend = self.database.get_database_backend();
            let result = db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "UPDATE settlements \
                     SET settled_minor = settled_minor + ?, \
                         status = CASE WHEN settled_minor + ? >= amount_minor THEN ? ELSE ? END, \
                         updated_at = ? \
                     WHERE id = ? AND status <> ? AND settled_minor + ? <= amount_minor;",
                    vec![
                        cmd.amount.cents().into(),
                        cmd.amount.cents().into(),
                        SettlementStatus::Settled.as_str().into(),
                        SettlementStatus::Partial.as_str().into(),
                        now.into(),
                        cmd.settlement_id.to_string().into(),
                        SettlementStatus::Settled.as_str().into(),
                        cmd.amount.cents().into(),
                    ],
                ))
                .await?;
            if result.rows_affected() == 0 {
                let latest = self.find_settlement(&db_tx, cmd.settlement_id).await?;
                return Err(payment_conflict(&latest, cmd.amount));
            }

            let entry = SettlementHistoryEntry {
                id: Uuid::new_v4(),
                settlement_id: cmd.settlement_id,
                amount: cmd.amount,
                note,
                recorded_by: requester_id.clone(),
                created_at: now,
            };
            settlement_history::ActiveModel::from(&entry)
                .insert(&db_tx)
                .await?;

            self.find_settlement(&db_tx, cmd.settlement_id).await
        })?;

        tracing::info!(
            "payment of {} recorded on settlement {}: {} of {} settled",
            cmd.amount,
            settlement.id,
            settlement.settled_amount,
            settlement.amount
        );
        self.audit(AuditEvent {
            actor: requester_id,
            entity_type: AuditEntity::Settlement,
            entity_id: settlement.id,
            action: "payment_recorded",
            metadata: json!({
                "amount": cmd.amount,
                "settled_amount": settlement.settled_amount,
                "status": settlement.status,
            }),
        });
        self.notify(LedgerEvent::SettlementPaid {
            group_id: settlement.group_id.clone(),
            settlement: settlement.clone(),
            amount: cmd.amount,
        });

        Ok(settlement)
    }

    /// Deletes a settlement nobody has paid anything against yet.
    ///
    /// Only the payer or the payee may cancel. A settlement with recorded
    /// payments is part of the balances and cannot be cancelled.
    pub async fn cancel_settlement(
        &self,
        settlement_id: Uuid,
        requester_id: &str,
    ) -> ResultEngine<()> {
        let requester_id = requester_id.trim().to_string();
        let settlement = with_tx!(self, |db_tx| {
            let current = self.find_settlement(&db_tx, settlement_id).await?;
            if !current.involves(&requester_id) {
                return Err(EngineError::Forbidden(
                    "only the payer or payee can cancel a settlement".to_string(),
                ));
            }
            if current.status != SettlementStatus::Pending {
                return Err(EngineError::SettlementClosed(
                    "only pending settlements can be cancelled".to_string(),
                ));
            }

            let result = settlements::Entity::delete_many()
                .filter(settlements::Column::Id.eq(settlement_id.to_string()))
                .filter(settlements::Column::Status.eq(SettlementStatus::Pending.as_str()))
                .filter(settlements::Column::SettledMinor.eq(0_i64))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::SettlementClosed(
                    "only pending settlements can be cancelled".to_string(),
                ));
            }
            Ok::<_, EngineError>(current)
        })?;

        tracing::info!("settlement {settlement_id} cancelled by {requester_id}");
        self.audit(AuditEvent {
            actor: requester_id,
            entity_type: AuditEntity::Settlement,
            entity_id: settlement_id,
            action: "cancelled",
            metadata: json!({ "amount": settlement.amount }),
        });
        self.notify(LedgerEvent::SettlementCancelled {
            group_id: settlement.group_id,
            settlement_id,
        });

        Ok(())
    }

    /// Lists a group's settlements, newest first, optionally by status.
    pub async fn settlements(
        &self,
        group_id: &str,
        status: Option<SettlementStatus>,
    ) -> ResultEngine<Vec<Settlement>> {
        let mut query =
            settlements::Entity::find().filter(settlements::Column::GroupId.eq(group_id.to_string()));
        if let Some(status) = status {
            query = query.filter(settlements::Column::Status.eq(status.as_str()));
        }
        query
            .order_by_desc(settlements::Column::CreatedAt)
            .order_by_asc(settlements::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Settlement::try_from)
            .collect()
    }

    /// Returns a settlement and its payment history.
    pub async fn settlement(&self, settlement_id: Uuid) -> ResultEngine<SettlementDetail> {
        with_tx!(self, |db_tx| {
            let settlement = self.find_settlement(&db_tx, settlement_id).await?;
            let history = settlement_history::Entity::find()
                .filter(settlement_history::Column::SettlementId.eq(settlement_id.to_string()))
                .order_by_asc(settlement_history::Column::CreatedAt)
                .order_by_asc(settlement_history::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(SettlementHistoryEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok::<_, EngineError>(SettlementDetail {
                settlement,
                history,
            })
        })
    }

    /// Every payment recorded in a group, newest first.
    pub async fn settlement_history(
        &self,
        group_id: &str,
    ) -> ResultEngine<Vec<SettlementHistoryEntry>> {
        settlement_history::Entity::find()
            .join(
                JoinType::InnerJoin,
                settlement_history::Relation::Settlements.def(),
            )
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(settlement_history::Column::CreatedAt)
            .order_by_asc(settlement_history::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(SettlementHistoryEntry::try_from)
            .collect()
    }
}

/// Reports a missing payee as such instead of as a generic missing user.
fn as_missing_payee<T>(result: ResultEngine<T>) -> ResultEngine<T> {
    result.map_err(|err| match err {
        EngineError::KeyNotFound(_) => EngineError::KeyNotFound("payee not exists".to_string()),
        other => other,
    })
}
