use std::collections::HashMap;

use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, group_members, users,
    util::{normalize_optional_text, normalize_required_id},
};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a user that can pay, owe and settle in groups.
    ///
    /// `payment_handle` is what the payment-link generator needs to address
    /// the user as a payee (e.g. a UPI VPA).
    pub async fn register_user(
        &self,
        name: &str,
        payment_handle: Option<&str>,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_id(name, "user name")?;
        let id = Uuid::new_v4();
        users::ActiveModel {
            id: ActiveValue::Set(id.to_string()),
            name: ActiveValue::Set(name),
            payment_handle: ActiveValue::Set(normalize_optional_text(payment_handle)),
        }
        .insert(&self.database)
        .await?;
        Ok(id)
    }

    /// Adds `user_id` to `group_id`. Adding an existing member is a no-op.
    pub async fn add_group_member(&self, group_id: &str, user_id: &str) -> ResultEngine<()> {
        let group_id = normalize_required_id(group_id, "group id")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let existing =
                group_members::Entity::find_by_id((group_id.clone(), user_id.to_string()))
                    .one(&db_tx)
                    .await?;
            if existing.is_none() {
                group_members::ActiveModel {
                    group_id: ActiveValue::Set(group_id.clone()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                }
                .insert(&db_tx)
                .await?;
            }
            Ok(())
        })
    }

    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Fails with `KeyNotFound` unless every id belongs to a registered user.
    pub(super) async fn require_users<C: ConnectionTrait>(
        &self,
        db: &C,
        user_ids: &[&str],
    ) -> ResultEngine<()> {
        let names = self.user_names(db, user_ids.iter().copied()).await?;
        match user_ids.iter().find(|id| !names.contains_key(**id)) {
            Some(missing) => Err(EngineError::KeyNotFound(format!(
                "user {missing} not exists"
            ))),
            None => Ok(()),
        }
    }

    pub(super) async fn group_member_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: &str,
    ) -> ResultEngine<Vec<String>> {
        Ok(group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .all(db)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect())
    }

    pub(super) async fn user_names<'a, C: ConnectionTrait>(
        &self,
        db: &C,
        user_ids: impl IntoIterator<Item = &'a str>,
    ) -> ResultEngine<HashMap<String, String>> {
        let ids: Vec<String> = user_ids.into_iter().map(ToString::to_string).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect())
    }
}
