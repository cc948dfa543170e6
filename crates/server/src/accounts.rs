//! Accounts API endpoints.

use api_types::account::{AccountKind as ApiKind, AccountNew, AccountUpdate, AccountView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, auth::AuthUser, engine_currency, map_currency, server::ServerState};

fn map_kind(kind: engine::AccountKind) -> ApiKind {
    match kind {
        engine::AccountKind::Bank => ApiKind::Bank,
        engine::AccountKind::Cash => ApiKind::Cash,
        engine::AccountKind::CreditCard => ApiKind::CreditCard,
        engine::AccountKind::Other => ApiKind::Other,
    }
}

fn engine_kind(kind: ApiKind) -> engine::AccountKind {
    match kind {
        ApiKind::Bank => engine::AccountKind::Bank,
        ApiKind::Cash => engine::AccountKind::Cash,
        ApiKind::CreditCard => engine::AccountKind::CreditCard,
        ApiKind::Other => engine::AccountKind::Other,
    }
}

fn map_account(view: engine::AccountBalance) -> AccountView {
    let account = view.account;
    AccountView {
        id: account.id,
        name: account.name,
        kind: map_kind(account.kind),
        currency: map_currency(account.currency),
        opening_balance_minor: account.opening_balance_minor,
        balance_minor: view.balance_minor,
        color: account.color,
        icon: account.icon,
        created_at: account.created_at,
    }
}

pub async fn list(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<AccountView>>, ServerError> {
    let accounts = state
        .engine
        .accounts(&caller.id)
        .await?
        .into_iter()
        .map(map_account)
        .collect();
    Ok(Json(accounts))
}

pub async fn create(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let account = state
        .engine
        .new_account(
            &caller.id,
            engine::NewAccount {
                name: payload.name,
                kind: payload.kind.map(engine_kind),
                currency: payload.currency.map(engine_currency),
                opening_balance_minor: payload.opening_balance_minor,
                color: payload.color,
                icon: payload.icon,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_account(account))))
}

pub async fn update(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state
        .engine
        .update_account(
            &caller.id,
            account_id,
            engine::AccountUpdate {
                name: payload.name,
                kind: payload.kind.map(engine_kind),
                currency: payload.currency.map(engine_currency),
                opening_balance_minor: payload.opening_balance_minor,
                color: payload.color,
                icon: payload.icon,
            },
        )
        .await?;
    Ok(Json(map_account(account)))
}

pub async fn remove(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_account(&caller.id, account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
