use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Account, AccountKind, Currency, EngineError, ResultEngine, accounts,
    money::add_minor,
    transactions,
    util::{name_key, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

/// An account with its balance: opening balance plus income minus expenses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountBalance {
    pub account: Account,
    pub balance_minor: i64,
}

#[derive(Clone, Debug, Default)]
pub struct NewAccount {
    pub name: String,
    pub kind: Option<AccountKind>,
    pub currency: Option<Currency>,
    pub opening_balance_minor: i64,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub kind: Option<AccountKind>,
    pub currency: Option<Currency>,
    pub opening_balance_minor: Option<i64>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl Engine {
    /// Net effect of transactions per account for `user_id`.
    async fn account_movements<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<HashMap<String, i64>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .all(db)
            .await?;
        let mut movements: HashMap<String, i64> = HashMap::new();
        for model in models {
            let kind = crate::TransactionKind::try_from(model.kind.as_str())?;
            let moved = movements.entry(model.account_id).or_default();
            *moved = add_minor(*moved, kind.signed(model.amount_minor))?;
        }
        Ok(movements)
    }

    async fn with_balances<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        accounts: Vec<Account>,
    ) -> ResultEngine<Vec<AccountBalance>> {
        let movements = self.account_movements(db, user_id).await?;
        accounts
            .into_iter()
            .map(|account| {
                let moved = movements
                    .get(&account.id.to_string())
                    .copied()
                    .unwrap_or_default();
                Ok(AccountBalance {
                    balance_minor: add_minor(account.opening_balance_minor, moved)?,
                    account,
                })
            })
            .collect()
    }

    /// Accounts of the user, oldest first, with balances.
    pub async fn accounts(&self, user_id: &str) -> ResultEngine<Vec<AccountBalance>> {
        let accounts = self.ordered_accounts(&self.database, user_id).await?;
        self.with_balances(&self.database, user_id, accounts).await
    }

    async fn ensure_unique_account_name<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        name: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let key = name_key(name);
        let taken = self
            .ordered_accounts(db, user_id)
            .await?
            .into_iter()
            .any(|a| Some(a.id) != except && name_key(&a.name) == key);
        if taken {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }

    pub async fn new_account(
        &self,
        user_id: &str,
        input: NewAccount,
    ) -> ResultEngine<AccountBalance> {
        let name = normalize_required_name(&input.name, "account")?;
        with_tx!(self, |db_tx| {
            self.ensure_unique_account_name(&db_tx, user_id, &name, None)
                .await?;
            let account = Account {
                id: Uuid::new_v4(),
                name,
                kind: input.kind.unwrap_or_default(),
                currency: input.currency.unwrap_or_default(),
                opening_balance_minor: input.opening_balance_minor,
                color: normalize_optional_text(input.color.as_deref()),
                icon: normalize_optional_text(input.icon.as_deref()),
                created_at: Utc::now(),
            };
            account.to_active(user_id).insert(&db_tx).await?;
            let balance_minor = account.opening_balance_minor;
            Ok(AccountBalance {
                account,
                balance_minor,
            })
        })
    }

    pub async fn update_account(
        &self,
        user_id: &str,
        account_id: Uuid,
        update: AccountUpdate,
    ) -> ResultEngine<AccountBalance> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let mut active: accounts::ActiveModel = model.into();
            if let Some(name) = update.name.as_deref() {
                let name = normalize_required_name(name, "account")?;
                self.ensure_unique_account_name(&db_tx, user_id, &name, Some(account_id))
                    .await?;
                active.name = ActiveValue::Set(name);
            }
            if let Some(kind) = update.kind {
                active.kind = ActiveValue::Set(kind.as_str().to_string());
            }
            if let Some(currency) = update.currency {
                active.currency = ActiveValue::Set(currency.code().to_string());
            }
            if let Some(opening) = update.opening_balance_minor {
                active.opening_balance_minor = ActiveValue::Set(opening);
            }
            if let Some(color) = update.color.as_deref() {
                active.color = ActiveValue::Set(normalize_optional_text(Some(color)));
            }
            if let Some(icon) = update.icon.as_deref() {
                active.icon = ActiveValue::Set(normalize_optional_text(Some(icon)));
            }
            let account = Account::try_from(active.update(&db_tx).await?)?;
            let mut views = self.with_balances(&db_tx, user_id, vec![account]).await?;
            views
                .pop()
                .ok_or_else(|| EngineError::KeyNotFound("account".to_string()))
        })
    }

    /// Delete an account together with its transactions.
    pub async fn delete_account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id, user_id).await?;
            let removed = transactions::Entity::delete_many()
                .filter(transactions::Column::AccountId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?
                .rows_affected;
            accounts::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            tracing::info!(%account_id, removed, "account deleted");
            Ok(())
        })
    }
}
