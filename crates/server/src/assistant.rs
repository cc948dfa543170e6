//! Assistant endpoints and the text generator behind them.

use std::time::Duration;

use api_types::assistant::{Ask, GoalInput, Reply, Suggestions};
use async_trait::async_trait;
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use engine::{
    AssistantReply, FALLBACK_REPLY, SavingsGoal,
    assistant::{assistant_prompt, suggestion_lines},
};
use serde::Deserialize;
use serde_json::json;

use crate::{ServerError, auth::AuthUser, server::ServerState};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("generator returned status {0}")]
    Status(u16),
    #[error("generator returned no text")]
    Empty,
}

/// Produces free text for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

/// Google Gemini `generateContent` client.
pub struct GeminiGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(api_key: &str, endpoint: Option<&str>, model: Option<&str>) -> Self {
        let endpoint = endpoint.unwrap_or(DEFAULT_ENDPOINT).trim_end_matches('/');
        let model = model.unwrap_or(DEFAULT_MODEL);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!("{endpoint}/v1beta/models/{model}:generateContent"),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| GeneratorError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeneratorError::Status(status.as_u16()));
        }
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| GeneratorError::Request(err.to_string()))?;
        parsed.text().ok_or(GeneratorError::Empty)
    }
}

pub async fn ask(
    Extension(caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<Ask>,
) -> Result<Json<Reply>, ServerError> {
    let query = payload.query.unwrap_or_default();
    let reply = match state.engine.answer(&caller.id, &query, Utc::now()).await? {
        AssistantReply::Answer(text) => text,
        AssistantReply::Fallback => match state.generator.as_ref() {
            Some(generator) => match generator.generate(&assistant_prompt(query.trim())).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!("assistant generator failed: {err}");
                    FALLBACK_REPLY.to_string()
                }
            },
            None => FALLBACK_REPLY.to_string(),
        },
    };
    Ok(Json(Reply { reply }))
}

/// Savings-goal advice, one suggestion per line.
pub async fn goal_suggestions(
    Extension(_caller): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<GoalInput>,
) -> Result<Json<Suggestions>, ServerError> {
    if payload.goal_name.trim().is_empty() {
        return Err(ServerError::Generic("goal_name required".to_string()));
    }
    let Some(generator) = state.generator.as_ref() else {
        return Err(ServerError::Unavailable(FALLBACK_REPLY.to_string()));
    };
    let goal = SavingsGoal {
        goal_name: payload.goal_name,
        current_savings: payload.current_savings,
        target_amount: payload.target_amount,
        monthly_income: payload.monthly_income,
        monthly_expenses: payload.monthly_expenses,
        spending_habits: payload.spending_habits.unwrap_or_default(),
    };
    let text = generator.generate(&goal.prompt()).await.map_err(|err| {
        tracing::warn!("goal suggestions failed: {err}");
        ServerError::Unavailable(FALLBACK_REPLY.to_string())
    })?;
    Ok(Json(Suggestions {
        suggestions: suggestion_lines(&text),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_url_uses_endpoint_and_model() {
        let generator = GeminiGenerator::new("k", Some("http://localhost:9000/"), Some("m1"));
        assert_eq!(
            generator.url,
            "http://localhost:9000/v1beta/models/m1:generateContent"
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Save " }, { "text": "more." }] } }]
        }))
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Save more."));
    }

    #[test]
    fn empty_response_has_no_text() {
        let parsed: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed.text(), None);
    }
}
