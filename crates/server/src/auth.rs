//! Authentication endpoints and token handling.
//!
//! Access and refresh tokens are HS256 JWTs signed with the same secret; the
//! `kind` claim keeps one from being used as the other.

use std::time::Duration;

use api_types::auth::{
    AccessToken, Forgot, Google, Login, Ok as OkResponse, Refresh, Register, Role as ApiRole,
    Session, UserView,
};
use async_trait::async_trait;
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{ServerError, server::ServerState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    kind: TokenKind,
    iat: i64,
    exp: i64,
}

/// The caller, as proven by a valid access token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub role: String,
}

/// Signing material and lifetimes for issued tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn issue(&self, user_id: &str, role: &str, kind: TokenKind) -> Result<String, ServerError> {
        let iat = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            kind,
            iat,
            exp: iat + ttl,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|err| {
            tracing::error!("failed to sign token: {err}");
            ServerError::Internal("failed to sign token".to_string())
        })
    }

    /// Decode `token` and check that it is of the `expected` kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<AuthUser, ServerError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|err| {
                tracing::debug!("rejected token: {err}");
                ServerError::Unauthorized
            })?;
        if data.claims.kind != expected {
            return Err(ServerError::Unauthorized);
        }
        Ok(AuthUser {
            id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// A verified identity from an external provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug)]
pub enum VerifyError {
    /// The credential was rejected.
    Invalid,
    /// The provider could not be reached.
    Unavailable(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, VerifyError>;
}

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Checks Google ID tokens against the `tokeninfo` endpoint.
pub struct GoogleTokenInfo {
    client: reqwest::Client,
    client_id: String,
}

#[derive(Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    name: Option<String>,
}

impl GoogleTokenInfo {
    pub fn new(client_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenInfo {
    async fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        let response = self
            .client
            .get(TOKENINFO_URL)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|err| VerifyError::Unavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(VerifyError::Invalid);
        }
        let info: TokenInfo = response.json().await.map_err(|_| VerifyError::Invalid)?;
        if info.aud != self.client_id {
            return Err(VerifyError::Invalid);
        }
        Ok(Identity {
            email: info.email,
            name: info.name,
        })
    }
}

fn map_role(role: engine::Role) -> ApiRole {
    match role {
        engine::Role::User => ApiRole::User,
        engine::Role::Admin => ApiRole::Admin,
    }
}

fn user_view(user: &engine::User) -> UserView {
    UserView {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: map_role(user.role),
    }
}

fn session(state: &ServerState, user: &engine::User) -> Result<Session, ServerError> {
    let id = user.id.to_string();
    let role = user.role.as_str();
    Ok(Session {
        user: user_view(user),
        access_token: state.tokens.issue(&id, role, TokenKind::Access)?,
        refresh_token: state.tokens.issue(&id, role, TokenKind::Refresh)?,
    })
}

fn required(value: &str, message: &str) -> Result<(), ServerError> {
    if value.trim().is_empty() {
        return Err(ServerError::Generic(message.to_string()));
    }
    Ok(())
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<Register>,
) -> Result<Json<Session>, ServerError> {
    required(&payload.email, "email and password required")?;
    required(&payload.password, "email and password required")?;
    let user = state
        .engine
        .register(&payload.email, &payload.password, payload.name.as_deref())
        .await?;
    Ok(Json(session(&state, &user)?))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<Login>,
) -> Result<Json<Session>, ServerError> {
    required(&payload.email, "email and password required")?;
    required(&payload.password, "email and password required")?;
    let user = state.engine.login(&payload.email, &payload.password).await?;
    Ok(Json(session(&state, &user)?))
}

pub async fn refresh(
    State(state): State<ServerState>,
    Json(payload): Json<Refresh>,
) -> Result<Json<AccessToken>, ServerError> {
    required(&payload.refresh_token, "refresh_token required")?;
    let caller = state
        .tokens
        .verify(&payload.refresh_token, TokenKind::Refresh)?;
    let access_token = state
        .tokens
        .issue(&caller.id, &caller.role, TokenKind::Access)?;
    Ok(Json(AccessToken { access_token }))
}

pub async fn google(
    State(state): State<ServerState>,
    Json(payload): Json<Google>,
) -> Result<Json<Session>, ServerError> {
    required(&payload.credential, "missing credential")?;
    let Some(verifier) = state.google.as_ref() else {
        return Err(ServerError::Internal(
            "Google auth is not configured".to_string(),
        ));
    };
    let identity = match verifier.verify(&payload.credential).await {
        Ok(identity) => identity,
        Err(VerifyError::Invalid) => {
            return Err(ServerError::Generic("invalid Google token".to_string()));
        }
        Err(VerifyError::Unavailable(reason)) => {
            tracing::error!("google token verification failed: {reason}");
            return Err(ServerError::Generic("invalid Google token".to_string()));
        }
    };
    let Some(email) = identity.email else {
        return Err(ServerError::Generic(
            "Google account is missing an email".to_string(),
        ));
    };
    let user = state
        .engine
        .user_for_external_identity(&email, identity.name.as_deref())
        .await?;
    Ok(Json(session(&state, &user)?))
}

/// Password reset stub: accepts the request, sends nothing.
pub async fn forgot(Json(payload): Json<Forgot>) -> Result<Json<OkResponse>, ServerError> {
    match payload.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => {
            tracing::info!("password reset requested");
            Ok(Json(OkResponse { ok: true }))
        }
        _ => Err(ServerError::Generic("email required".to_string())),
    }
}

pub async fn me(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&caller.id).await?;
    Ok(Json(user_view(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new("test-secret", 900, 3600)
    }

    #[test]
    fn access_token_round_trips() {
        let keys = keys();
        let token = keys.issue("user-1", "user", TokenKind::Access).unwrap();
        let caller = keys.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(caller.id, "user-1");
        assert_eq!(caller.role, "user");
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let keys = keys();
        let access = keys.issue("u", "user", TokenKind::Access).unwrap();
        let refresh = keys.issue("u", "user", TokenKind::Refresh).unwrap();
        assert!(matches!(
            keys.verify(&access, TokenKind::Refresh),
            Err(ServerError::Unauthorized)
        ));
        assert!(matches!(
            keys.verify(&refresh, TokenKind::Access),
            Err(ServerError::Unauthorized)
        ));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = TokenKeys::new("other", 900, 3600)
            .issue("u", "user", TokenKind::Access)
            .unwrap();
        assert!(keys().verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("test-secret", -3600, -3600);
        let token = keys.issue("u", "user", TokenKind::Access).unwrap();
        assert!(keys.verify(&token, TokenKind::Access).is_err());
    }
}
