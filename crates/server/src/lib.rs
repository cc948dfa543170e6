use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use assistant::{GeminiGenerator, GeneratorError, TextGenerator};
pub use auth::{GoogleTokenInfo, Identity, IdentityVerifier, TokenKeys, TokenKind, VerifyError};
pub use server::{ServerConfig, ServerState, router, run_with_listener, spawn_with_listener};

mod accounts;
mod assistant;
mod auth;
mod budgets;
mod categories;
mod reports;
mod server;
mod statistics;
mod transactions;

pub mod types {
    pub use api_types::Currency;

    pub mod auth {
        pub use api_types::auth::{
            AccessToken, Forgot, Google, Login, Ok, Refresh, Register, Role, Session, UserView,
        };
    }

    pub mod account {
        pub use api_types::account::{AccountKind, AccountNew, AccountUpdate, AccountView};
    }

    pub mod category {
        pub use api_types::category::{CategoryKind, CategoryNew, CategoryView};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            ImportResult, TransactionKind, TransactionList, TransactionNew, TransactionQuery,
            TransactionUpdate, TransactionView,
        };
    }

    pub mod budget {
        pub use api_types::budget::{
            BudgetNew, BudgetPeriod, BudgetStatusView, BudgetUpdate, BudgetView,
        };
    }

    pub mod report {
        pub use api_types::report::{CategoryTotal, ReportQuery, Summary};
    }

    pub mod stats {
        pub use api_types::stats::Statistic;
    }

    pub mod assistant {
        pub use api_types::assistant::{Ask, GoalInput, Reply, Suggestions};
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Unauthorized,
    /// The text generator is disabled or failing.
    Unavailable(String),
    /// Server-side failure whose message is safe to show.
    Internal(String),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidId(_)
        | EngineError::Currency(_)
        | EngineError::Import(_) => StatusCode::BAD_REQUEST,
        EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Report(_) | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Report(reason) => {
            tracing::error!("report rendering failed: {reason}");
            "internal server error".to_string()
        }
        EngineError::Import(reason) => {
            tracing::warn!("csv import rejected: {reason}");
            "failed to import CSV".to_string()
        }
        EngineError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ServerError::Unavailable(err) => (StatusCode::SERVICE_UNAVAILABLE, err),
            ServerError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Gbp => api_types::Currency::Gbp,
        engine::Currency::Inr => api_types::Currency::Inr,
        engine::Currency::Jpy => api_types::Currency::Jpy,
        engine::Currency::Chf => api_types::Currency::Chf,
        engine::Currency::Cad => api_types::Currency::Cad,
        engine::Currency::Aud => api_types::Currency::Aud,
    }
}

fn engine_currency(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Gbp => engine::Currency::Gbp,
        api_types::Currency::Inr => engine::Currency::Inr,
        api_types::Currency::Jpy => engine::Currency::Jpy,
        api_types::Currency::Chf => engine::Currency::Chf,
        api_types::Currency::Cad => engine::Currency::Cad,
        api_types::Currency::Aud => engine::Currency::Aud,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_400() {
        for err in [
            EngineError::Validation("x".to_string()),
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InvalidId("x".to_string()),
            EngineError::Currency("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn import_failure_hides_reason() {
        let err = EngineError::Import("UNIQUE constraint failed".to_string());
        assert_eq!(message_for_engine_error(err), "failed to import CSV");
    }

    #[test]
    fn credentials_map_to_401() {
        let res = ServerError::from(EngineError::InvalidCredentials).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = ServerError::Unauthorized.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn report_failure_is_masked() {
        let err = EngineError::Report("font".to_string());
        assert_eq!(status_for_engine_error(&err), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message_for_engine_error(err), "internal server error");
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn currency_mapping_round_trips() {
        for currency in engine::Currency::ALL {
            assert_eq!(engine_currency(map_currency(currency)), currency);
        }
    }
}
