use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetPeriod, BudgetStatus, Currency, EngineError, ResultEngine, TransactionKind,
    budgets,
    money::total_minor,
    transactions,
    util::{name_key, normalize_required_name},
};

use super::{Engine, with_tx};

#[derive(Clone, Debug, Default)]
pub struct NewBudget {
    pub name: String,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    /// Defaults to USD.
    pub currency: Option<Currency>,
    /// Defaults to monthly.
    pub period: Option<BudgetPeriod>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default)]
pub struct BudgetUpdate {
    pub name: Option<String>,
    /// `Some(None)` detaches the budget from its category.
    pub category_id: Option<Option<Uuid>>,
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
    pub period: Option<BudgetPeriod>,
}

fn check_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor < 0 {
        return Err(EngineError::InvalidAmount(
            "amount_minor must be >= 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    pub async fn budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_asc(budgets::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Budget::try_from)
            .collect()
    }

    pub async fn new_budget(&self, user_id: &str, input: NewBudget) -> ResultEngine<Budget> {
        let name = normalize_required_name(&input.name, "budget")?;
        check_amount(input.amount_minor)?;
        with_tx!(self, |db_tx| {
            if let Some(category_id) = input.category_id {
                self.require_category(&db_tx, category_id, user_id).await?;
            }
            let budget = Budget {
                id: Uuid::new_v4(),
                name,
                category_id: input.category_id,
                amount_minor: input.amount_minor,
                currency: input.currency.unwrap_or_default(),
                period: input.period.unwrap_or_default(),
                created_at: Utc::now(),
            };
            budget.to_active(user_id).insert(&db_tx).await?;
            Ok(budget)
        })
    }

    async fn require_budget(
        &self,
        db_tx: &DatabaseTransaction,
        budget_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<budgets::Model> {
        budgets::Entity::find_by_id(budget_id.to_string())
            .filter(budgets::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("budget".to_string()))
    }

    pub async fn update_budget(
        &self,
        user_id: &str,
        budget_id: Uuid,
        update: BudgetUpdate,
    ) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id, user_id).await?;
            let mut active: budgets::ActiveModel = model.into();
            if let Some(name) = update.name.as_deref() {
                active.name = ActiveValue::Set(normalize_required_name(name, "budget")?);
            }
            if let Some(category_id) = update.category_id {
                if let Some(id) = category_id {
                    self.require_category(&db_tx, id, user_id).await?;
                }
                active.category_id = ActiveValue::Set(category_id.map(|id| id.to_string()));
            }
            if let Some(amount_minor) = update.amount_minor {
                check_amount(amount_minor)?;
                active.amount_minor = ActiveValue::Set(amount_minor);
            }
            if let Some(currency) = update.currency {
                active.currency = ActiveValue::Set(currency.code().to_string());
            }
            if let Some(period) = update.period {
                active.period = ActiveValue::Set(period.as_str().to_string());
            }
            Budget::try_from(active.update(&db_tx).await?)
        })
    }

    pub async fn delete_budget(&self, user_id: &str, budget_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, budget_id, user_id).await?;
            budgets::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(())
        })
    }

    /// Spending against every budget in its current period.
    ///
    /// A budget with a category counts the expenses of that category; one
    /// without counts expenses whose note equals the budget name.
    pub async fn budget_status(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<BudgetStatus>> {
        let budgets = self.budgets(user_id).await?;
        let mut statuses = Vec::with_capacity(budgets.len());
        for budget in budgets {
            let (period_start, period_end) = budget.period.current_range(now)?;
            let expenses = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
                .filter(transactions::Column::OccurredAt.gte(period_start))
                .filter(transactions::Column::OccurredAt.lte(period_end))
                .all(&self.database)
                .await?;
            let budget_key = name_key(&budget.name);
            let spent_minor = total_minor(
                expenses
                    .iter()
                    .filter(|tx| match budget.category_id {
                        Some(category_id) => {
                            tx.category_id.as_deref() == Some(category_id.to_string().as_str())
                        }
                        None => tx
                            .note
                            .as_deref()
                            .is_some_and(|note| name_key(note) == budget_key),
                    })
                    .map(|tx| tx.amount_minor),
            )?;
            statuses.push(BudgetStatus {
                budget,
                spent_minor,
                period_start,
                period_end,
            });
        }
        Ok(statuses)
    }
}
