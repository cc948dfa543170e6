use api_types::stats::Statistic;
use axum::{Extension, Json, extract::State};

use crate::{ServerError, auth::AuthUser, server::ServerState};

pub async fn get_stats(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Statistic>, ServerError> {
    let stats = state.engine.stats(&caller.id).await?;
    Ok(Json(Statistic {
        income_minor: stats.income_minor,
        expense_minor: stats.expense_minor,
        balance_minor: stats.balance_minor,
    }))
}
