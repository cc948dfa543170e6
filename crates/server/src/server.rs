use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use tower_http::trace::TraceLayer;

use std::sync::Arc;

use crate::{
    ServerError, TextGenerator, accounts,
    assistant::{self, GeminiGenerator},
    auth::{self, GoogleTokenInfo, IdentityVerifier, TokenKeys, TokenKind},
    budgets, categories, reports, statistics, transactions,
};
use api_types::Health;
use engine::Engine;

/// Settings the HTTP layer needs at startup.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub google_client_id: Option<String>,
    pub max_upload_bytes: usize,
    pub assistant_endpoint: Option<String>,
    pub assistant_model: Option<String>,
    pub assistant_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604_800,
            google_client_id: None,
            max_upload_bytes: 5 * 1024 * 1024,
            assistant_endpoint: None,
            assistant_model: None,
            assistant_api_key: None,
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub tokens: Arc<TokenKeys>,
    /// `None` when Google sign-in is not configured.
    pub google: Option<Arc<dyn IdentityVerifier>>,
    /// `None` when no text generator is configured.
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub max_upload_bytes: usize,
}

impl ServerState {
    pub fn new(engine: Engine, config: &ServerConfig) -> Self {
        let google = config
            .google_client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| Arc::new(GoogleTokenInfo::new(id)) as Arc<dyn IdentityVerifier>);
        let generator = config
            .assistant_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(|key| {
                Arc::new(GeminiGenerator::new(
                    key,
                    config.assistant_endpoint.as_deref(),
                    config.assistant_model.as_deref(),
                )) as Arc<dyn TextGenerator>
            });
        if generator.is_none() {
            tracing::info!("assistant text generator disabled");
        }
        Self {
            engine: Arc::new(engine),
            tokens: Arc::new(TokenKeys::new(
                &config.jwt_secret,
                config.access_ttl_secs,
                config.refresh_ttl_secs,
            )),
            google,
            generator,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.google = Some(verifier);
        self
    }
}

async fn auth(
    State(state): State<ServerState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Ok(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ServerError::Unauthorized);
    };
    let caller = state.tokens.verify(bearer.token(), TokenKind::Access)?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/me", get(auth::me))
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route(
            "/accounts/{id}",
            put(accounts::update).delete(accounts::remove),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            axum::routing::delete(categories::remove),
        )
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route("/transactions/import", post(transactions::import))
        .route(
            "/transactions/{id}",
            put(transactions::update).delete(transactions::remove),
        )
        .route("/budgets", get(budgets::list).post(budgets::create))
        .route("/budgets/status", get(budgets::status))
        .route(
            "/budgets/{id}",
            put(budgets::update).delete(budgets::remove),
        )
        .route("/reports/summary", get(reports::summary))
        .route("/reports/export", get(reports::export))
        .route("/stats", get(statistics::get_stats))
        .route("/assistant", post(assistant::ask))
        .route("/goals/suggestions", post(assistant::goal_suggestions))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/google", post(auth::google))
        .route("/auth/forgot", post(auth::forgot));

    let max_upload_bytes = state.max_upload_bytes;
    public
        .merge(protected)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
