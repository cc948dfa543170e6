//! Transactions API endpoints

use api_types::transaction::{
    ImportResult, TransactionKind as ApiKind, TransactionList, TransactionNew, TransactionQuery,
    TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use engine::EngineError;
use uuid::Uuid;

use crate::{ServerError, auth::AuthUser, engine_currency, map_currency, server::ServerState};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Income => ApiKind::Income,
        engine::TransactionKind::Expense => ApiKind::Expense,
        engine::TransactionKind::Transfer => ApiKind::Transfer,
    }
}

fn engine_kind(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Income => engine::TransactionKind::Income,
        ApiKind::Expense => engine::TransactionKind::Expense,
        ApiKind::Transfer => engine::TransactionKind::Transfer,
    }
}

fn map_transaction(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind),
        amount_minor: tx.amount_minor,
        currency: map_currency(tx.currency),
        account_id: tx.account_id,
        category_id: tx.category_id,
        category_name: tx.category_name,
        method: tx.method,
        note: tx.note,
        occurred_at: tx.occurred_at,
    }
}

pub async fn list(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionList>, ServerError> {
    let start = query
        .start
        .as_deref()
        .map(|s| engine::parse_range_bound(s, false))
        .transpose()?;
    let end = query
        .end
        .as_deref()
        .map(|s| engine::parse_range_bound(s, true))
        .transpose()?;
    let filter = engine::TransactionListFilter {
        start,
        end,
        account_id: query.account_id,
        category_id: query.category_id,
        kind: query.kind.map(engine_kind),
        limit: query.limit,
    };
    let transactions = state
        .engine
        .transactions(&caller.id, &filter)
        .await?
        .into_iter()
        .map(map_transaction)
        .collect();
    Ok(Json(TransactionList { transactions }))
}

pub async fn create(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let tx = state
        .engine
        .new_transaction(
            &caller.id,
            engine::NewTransaction {
                account_id: payload.account_id,
                kind: engine_kind(payload.kind),
                amount_minor: payload.amount_minor,
                currency: payload.currency.map(engine_currency),
                category_id: payload.category_id,
                method: payload.method,
                note: payload.note,
                occurred_at: payload.occurred_at,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn update(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let category_id = if payload.clear_category {
        Some(None)
    } else {
        payload.category_id.map(Some)
    };
    let tx = state
        .engine
        .update_transaction(
            &caller.id,
            transaction_id,
            engine::TransactionUpdate {
                account_id: payload.account_id,
                kind: payload.kind.map(engine_kind),
                amount_minor: payload.amount_minor,
                currency: payload.currency.map(engine_currency),
                category_id,
                method: payload.method,
                note: payload.note,
                occurred_at: payload.occurred_at,
            },
        )
        .await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn remove(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(&caller.id, transaction_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Import a bank statement sent as the multipart field `file`.
pub async fn import(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResult>, ServerError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::Generic(err.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|err| ServerError::Generic(err.body_text()))?;
            upload = Some(bytes);
            break;
        }
    }
    let Some(bytes) = upload else {
        return Err(EngineError::Validation("no file supplied".to_string()).into());
    };

    let text = String::from_utf8_lossy(&bytes);
    let outcome = state.engine.import_transactions(&caller.id, &text).await?;
    Ok(Json(ImportResult {
        imported: outcome.imported,
        transactions: outcome
            .transactions
            .into_iter()
            .map(map_transaction)
            .collect(),
    }))
}
