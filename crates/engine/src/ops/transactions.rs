use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine, Transaction, TransactionKind, categories, transactions,
    util::normalize_optional_text,
};

use super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// `start` and `end` are both inclusive, in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub limit: Option<u64>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(start), Some(end)) = (filter.start, filter.end)
        && start > end
    {
        return Err(EngineError::Validation(
            "invalid range: start must be <= end".to_string(),
        ));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::Validation("limit must be > 0".to_string()));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(start) = filter.start {
            self = self.filter(transactions::Column::OccurredAt.gte(start));
        }
        if let Some(end) = filter.end {
            self = self.filter(transactions::Column::OccurredAt.lte(end));
        }
        if let Some(account_id) = filter.account_id {
            self = self.filter(transactions::Column::AccountId.eq(account_id.to_string()));
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id.to_string()));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        self
    }
}

#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    /// Defaults to the account currency.
    pub currency: Option<Currency>,
    pub category_id: Option<Uuid>,
    pub method: Option<String>,
    pub note: Option<String>,
    /// Defaults to now.
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdate {
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
    /// `Some(None)` clears the category.
    pub category_id: Option<Option<Uuid>>,
    pub method: Option<String>,
    pub note: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl Engine {
    /// List transactions of the user, newest first.
    pub async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .apply_tx_filters(filter)
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::CreatedAt);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        query
            .find_also_related(categories::Entity)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    /// The `limit` most recent transactions of the user.
    pub(super) async fn recent_transactions<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::CreatedAt)
            .limit(limit)
            .find_also_related(categories::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    /// Checks that `category_id` belongs to the user and fits `kind`.
    async fn check_category(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        category_id: Uuid,
        kind: TransactionKind,
    ) -> ResultEngine<categories::Model> {
        let model = self.require_category(db_tx, category_id, user_id).await?;
        let category_kind = crate::CategoryKind::try_from(model.kind.as_str())?;
        if !category_kind.accepts(kind) {
            return Err(EngineError::Validation(format!(
                "category '{}' cannot be used for {} transactions",
                model.name,
                kind.as_str()
            )));
        }
        Ok(model)
    }

    pub async fn new_transaction(
        &self,
        user_id: &str,
        input: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let account = self
                .require_account(&db_tx, input.account_id, user_id)
                .await?;
            let currency = match input.currency {
                Some(currency) => currency,
                None => Currency::try_from(account.currency.as_str()).unwrap_or_default(),
            };
            let mut tx = Transaction::new(
                input.account_id,
                input.kind,
                input.amount_minor,
                currency,
                input.occurred_at.unwrap_or(now),
            )?;
            if let Some(category_id) = input.category_id {
                let category = self
                    .check_category(&db_tx, user_id, category_id, input.kind)
                    .await?;
                tx.category_id = Some(category_id);
                tx.category_name = Some(category.name);
            }
            tx.method = normalize_optional_text(input.method.as_deref());
            tx.note = normalize_optional_text(input.note.as_deref());
            tx.to_active(user_id, now).insert(&db_tx).await?;
            Ok(tx)
        })
    }

    async fn require_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction".to_string()))
    }

    pub async fn update_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
        update: TransactionUpdate,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, user_id)
                .await?;
            let kind = match update.kind {
                Some(kind) => kind,
                None => TransactionKind::try_from(model.kind.as_str())?,
            };
            let category_id = match update.category_id {
                Some(category_id) => category_id,
                None => model.category_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
            };
            let mut active: transactions::ActiveModel = model.into();

            if let Some(account_id) = update.account_id {
                self.require_account(&db_tx, account_id, user_id).await?;
                active.account_id = ActiveValue::Set(account_id.to_string());
            }
            if let Some(amount_minor) = update.amount_minor {
                if amount_minor <= 0 {
                    return Err(EngineError::InvalidAmount(
                        "amount_minor must be > 0".to_string(),
                    ));
                }
                active.amount_minor = ActiveValue::Set(amount_minor);
            }
            if let Some(currency) = update.currency {
                active.currency = ActiveValue::Set(currency.code().to_string());
            }
            let category = match category_id {
                Some(id) => Some(self.check_category(&db_tx, user_id, id, kind).await?),
                None => None,
            };
            active.kind = ActiveValue::Set(kind.as_str().to_string());
            active.category_id = ActiveValue::Set(category_id.map(|id| id.to_string()));
            if let Some(method) = update.method.as_deref() {
                active.method = ActiveValue::Set(normalize_optional_text(Some(method)));
            }
            if let Some(note) = update.note.as_deref() {
                active.note = ActiveValue::Set(normalize_optional_text(Some(note)));
            }
            if let Some(occurred_at) = update.occurred_at {
                active.occurred_at = ActiveValue::Set(occurred_at);
            }

            let model = active.update(&db_tx).await?;
            Transaction::try_from((model, category))
        })
    }

    pub async fn delete_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, user_id)
                .await?;
            transactions::Entity::delete_by_id(model.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
