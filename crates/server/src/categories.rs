//! Categories API endpoints.

use api_types::category::{CategoryKind as ApiKind, CategoryNew, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, auth::AuthUser, server::ServerState};

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: match category.kind {
            engine::CategoryKind::Income => ApiKind::Income,
            engine::CategoryKind::Expense => ApiKind::Expense,
        },
    }
}

pub async fn list(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state
        .engine
        .categories(&caller.id)
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(Json(categories))
}

pub async fn create(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let kind = match payload.kind.unwrap_or_default() {
        ApiKind::Income => engine::CategoryKind::Income,
        ApiKind::Expense => engine::CategoryKind::Expense,
    };
    let category = state
        .engine
        .new_category(&caller.id, &payload.name, kind)
        .await?;
    Ok((StatusCode::CREATED, Json(map_category(category))))
}

pub async fn remove(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(&caller.id, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
