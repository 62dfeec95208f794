use std::collections::HashSet;

use chrono::Utc;
use sea_orm::TransactionTrait;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AdjustExpenseCmd, AuditEntity, AuditEvent, CreateExpenseCmd, EngineError, EntryKind, Expense,
    LedgerEvent, MoneyCents, ResultEngine, SplitShare, compute_splits,
    util::normalize_required_id,
};

use super::{
    Engine,
    ledger::{Adjustment, LedgerEntry, NewEntry},
    with_tx,
};

const REVERSAL_PREFIX: &str = "[REVERSAL] ";
const CORRECTION_PREFIX: &str = "[CORRECTION] ";
const MAX_DESCRIPTION_LEN: usize = 255;
const MAX_AMOUNT: MoneyCents = MoneyCents::new(10_000_000_00);

fn validate_amount(amount: MoneyCents) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
    }
    if amount > MAX_AMOUNT {
        return Err(EngineError::InvalidAmount(format!(
            "amount exceeds limit of {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

fn normalize_description(value: &str) -> ResultEngine<String> {
    let description = normalize_required_id(value, "description")?;
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(EngineError::InvalidInput(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(description)
}

/// The entry currently in effect for an original: the latest correction that
/// has not been reversed, or the original itself.
fn effective_entry<'a>(original: &'a Expense, adjustments: &'a [Expense]) -> &'a Expense {
    let reversed: HashSet<Uuid> = adjustments.iter().filter_map(|e| e.reversal_of).collect();
    adjustments
        .iter()
        .rev()
        .filter(|e| !e.is_reversal())
        .chain(std::iter::once(original))
        .find(|e| !reversed.contains(&e.id))
        .unwrap_or(original)
}

impl Engine {
    /// Records a new expense and its splits as one ledger entry.
    pub async fn create_expense(&self, cmd: CreateExpenseCmd) -> ResultEngine<LedgerEntry> {
        let group_id = normalize_required_id(&cmd.group_id, "group id")?;
        let payer_id = normalize_required_id(&cmd.payer_id, "payer id")?;
        let description = normalize_description(&cmd.description)?;
        validate_amount(cmd.amount)?;
        let shares = compute_splits(cmd.amount, &payer_id, &cmd.split)?;

        let entry = with_tx!(self, |db_tx| {
            let mut user_ids = cmd.split.member_ids();
            user_ids.push(payer_id.as_str());
            self.require_users(&db_tx, &user_ids).await?;

            self.append_expense(
                &db_tx,
                NewEntry {
                    group_id: group_id.clone(),
                    payer_id: payer_id.clone(),
                    amount: cmd.amount,
                    description,
                    policy: cmd.split.policy(),
                    kind: EntryKind::Original,
                    parent_id: None,
                    reversal_of: None,
                    shares,
                },
                Utc::now(),
            )
            .await
        })?;

        tracing::info!(
            "expense {} created in group {group_id}: {} paid by {payer_id}",
            entry.expense.id,
            entry.expense.amount
        );
        self.audit(AuditEvent {
            actor: cmd.actor_id,
            entity_type: AuditEntity::Expense,
            entity_id: entry.expense.id,
            action: "created",
            metadata: json!({
                "amount": entry.expense.amount,
                "description": entry.expense.description,
                "split_policy": entry.expense.policy,
            }),
        });
        self.notify(LedgerEvent::ExpenseCreated {
            group_id,
            expense_id: entry.expense.id,
        });

        Ok(entry)
    }

    /// Corrects an original expense without touching it.
    ///
    /// Appends, in one DB transaction, a reversal cancelling the entry
    /// currently in effect (the original or its latest correction) and a
    /// correction carrying the new values. Both point at the original via
    /// `parent_id`.
    pub async fn adjust_expense(&self, cmd: AdjustExpenseCmd) -> ResultEngine<Adjustment> {
        let group_id = normalize_required_id(&cmd.group_id, "group id")?;
        let payer_id = normalize_required_id(&cmd.payer_id, "payer id")?;
        let description = normalize_description(&cmd.description)?;
        validate_amount(cmd.amount)?;
        let shares = compute_splits(cmd.amount, &payer_id, &cmd.split)?;

        let adjustment = with_tx!(self, |db_tx| {
            let original = self.find_expense(&db_tx, cmd.expense_id).await?;
            if original.group_id != group_id {
                return Err(EngineError::KeyNotFound("expense not exists".to_string()));
            }
            if original.kind != EntryKind::Original {
                return Err(EngineError::InvalidInput(
                    "only original expenses can be adjusted".to_string(),
                ));
            }

            let mut user_ids = cmd.split.member_ids();
            user_ids.push(payer_id.as_str());
            self.require_users(&db_tx, &user_ids).await?;

            let adjustments = self.find_adjustments(&db_tx, original.id).await?;
            let current = effective_entry(&original, &adjustments);
            let current_splits = self.find_splits(&db_tx, current.id).await?;
            let base_description = current
                .description
                .strip_prefix(CORRECTION_PREFIX)
                .unwrap_or(&current.description);

            let now = Utc::now();
            let reversal = self
                .append_expense(
                    &db_tx,
                    NewEntry {
                        group_id: group_id.clone(),
                        payer_id: current.payer_id.clone(),
                        amount: -current.amount,
                        description: format!("{REVERSAL_PREFIX}{base_description}"),
                        policy: current.policy,
                        kind: EntryKind::Adjustment,
                        parent_id: Some(original.id),
                        reversal_of: Some(current.id),
                        shares: current_splits
                            .into_iter()
                            .map(|s| SplitShare {
                                member_id: s.member_id,
                                amount: -s.amount,
                            })
                            .collect(),
                    },
                    now,
                )
                .await?;
            let correction = self
                .append_expense(
                    &db_tx,
                    NewEntry {
                        group_id: group_id.clone(),
                        payer_id: payer_id.clone(),
                        amount: cmd.amount,
                        description: format!("{CORRECTION_PREFIX}{description}"),
                        policy: cmd.split.policy(),
                        kind: EntryKind::Adjustment,
                        parent_id: Some(original.id),
                        reversal_of: None,
                        shares,
                    },
                    now,
                )
                .await?;

            Ok::<_, EngineError>(Adjustment {
                reversal,
                correction,
            })
        })?;

        tracing::info!(
            "expense {} adjusted in group {group_id}: reversal {}, correction {}",
            cmd.expense_id,
            adjustment.reversal.expense.id,
            adjustment.correction.expense.id
        );
        self.audit(AuditEvent {
            actor: cmd.actor_id,
            entity_type: AuditEntity::Expense,
            entity_id: cmd.expense_id,
            action: "adjusted",
            metadata: json!({
                "reversal_id": adjustment.reversal.expense.id,
                "correction_id": adjustment.correction.expense.id,
                "amount": adjustment.correction.expense.amount,
            }),
        });
        self.notify(LedgerEvent::ExpenseAdjusted {
            group_id,
            original_id: cmd.expense_id,
            reversal_id: adjustment.reversal.expense.id,
            correction_id: adjustment.correction.expense.id,
        });

        Ok(adjustment)
    }
}
