//! Report endpoints: summary and file export.

use api_types::report::{CategoryTotal, ReportQuery, Summary};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};

use crate::{ServerError, auth::AuthUser, server::ServerState};

type Range = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

fn range(query: &ReportQuery) -> Result<Range, ServerError> {
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
    Ok((start, end))
}

pub async fn summary(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Summary>, ServerError> {
    let (start, end) = range(&query)?;
    let summary = state.engine.summary(&caller.id, start, end).await?;
    Ok(Json(Summary {
        income_minor: summary.income_minor,
        expense_minor: summary.expense_minor,
        net_minor: summary.net_minor(),
        by_category: summary
            .by_category
            .into_iter()
            .map(|total| CategoryTotal {
                category_id: total.category_id,
                name: total.name,
                expense_minor: total.expense_minor,
            })
            .collect(),
    }))
}

/// Download the user's transactions as `report.csv` or `report.pdf`.
/// The format defaults to CSV.
pub async fn export(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let format = engine::ExportFormat::try_from(query.format.as_deref().unwrap_or("csv"))?;
    let (start, end) = range(&query)?;
    let body = state.engine.export(&caller.id, format, start, end).await?;
    let disposition = format!("attachment; filename={}", format.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
