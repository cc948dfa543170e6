//! Budgets API endpoints.

use api_types::budget::{
    BudgetNew, BudgetPeriod as ApiPeriod, BudgetStatusView, BudgetUpdate, BudgetView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, auth::AuthUser, engine_currency, map_currency, server::ServerState};

fn map_period(period: engine::BudgetPeriod) -> ApiPeriod {
    match period {
        engine::BudgetPeriod::Weekly => ApiPeriod::Weekly,
        engine::BudgetPeriod::Monthly => ApiPeriod::Monthly,
        engine::BudgetPeriod::Yearly => ApiPeriod::Yearly,
    }
}

fn engine_period(period: ApiPeriod) -> engine::BudgetPeriod {
    match period {
        ApiPeriod::Weekly => engine::BudgetPeriod::Weekly,
        ApiPeriod::Monthly => engine::BudgetPeriod::Monthly,
        ApiPeriod::Yearly => engine::BudgetPeriod::Yearly,
    }
}

fn map_budget(budget: engine::Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        name: budget.name,
        category_id: budget.category_id,
        amount_minor: budget.amount_minor,
        currency: map_currency(budget.currency),
        period: map_period(budget.period),
    }
}

pub async fn list(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<BudgetView>>, ServerError> {
    let budgets = state
        .engine
        .budgets(&caller.id)
        .await?
        .into_iter()
        .map(map_budget)
        .collect();
    Ok(Json(budgets))
}

pub async fn create(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let budget = state
        .engine
        .new_budget(
            &caller.id,
            engine::NewBudget {
                name: payload.name,
                category_id: payload.category_id,
                amount_minor: payload.amount_minor,
                currency: payload.currency.map(engine_currency),
                period: payload.period.map(engine_period),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_budget(budget))))
}

pub async fn update(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let category_id = if payload.clear_category {
        Some(None)
    } else {
        payload.category_id.map(Some)
    };
    let budget = state
        .engine
        .update_budget(
            &caller.id,
            budget_id,
            engine::BudgetUpdate {
                name: payload.name,
                category_id,
                amount_minor: payload.amount_minor,
                currency: payload.currency.map(engine_currency),
                period: payload.period.map(engine_period),
            },
        )
        .await?;
    Ok(Json(map_budget(budget)))
}

pub async fn remove(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_budget(&caller.id, budget_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Spending against each budget in its current period.
pub async fn status(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<BudgetStatusView>>, ServerError> {
    let statuses = state
        .engine
        .budget_status(&caller.id, Utc::now())
        .await?
        .into_iter()
        .map(|status| {
            let remaining_minor = status.remaining_minor();
            BudgetStatusView {
                budget: map_budget(status.budget),
                spent_minor: status.spent_minor,
                remaining_minor,
                period_start: status.period_start,
                period_end: status.period_end,
            }
        })
        .collect();
    Ok(Json(statuses))
}
