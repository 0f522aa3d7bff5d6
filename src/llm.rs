use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::config::LlmConfig;
use crate::models::{EventCategory, EventDraft, RecommendCandidate, SearchCandidate};
use crate::provider::{normalize_draft, PreferenceSummary, ProviderError, RankingProvider};

/// Ranking provider backed by an OpenAI-compatible chat completions endpoint.
pub struct LlmRankingProvider {
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl LlmRankingProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    #[instrument(skip(self, prompt, schema), fields(model = %self.model))]
    async fn complete_json(
        &self,
        schema_name: &str,
        prompt: String,
        schema: Value,
    ) -> Result<String, ProviderError> {
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{}/chat/completions", base);

        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "schema": schema,
                },
            },
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT,
                },
                {
                    "role": "user",
                    "content": prompt,
                }
            ],
        });

        let mut request = self.client.post(url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        let status = response.status();
        let text_body = response
            .text()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text_body,
            });
        }

        let content = extract_content(&text_body)?;
        debug!(bytes = content.len(), "completion received");
        Ok(content)
    }
}

#[async_trait]
impl RankingProvider for LlmRankingProvider {
    async fn parse_freeform_event(&self, text: &str) -> Result<EventDraft, ProviderError> {
        let content = self
            .complete_json("event_draft", draft_prompt(text), draft_schema())
            .await?;
        parse_draft(&content)
    }

    async fn search_by_query(
        &self,
        query: &str,
        candidates: &[SearchCandidate],
    ) -> Result<Vec<String>, ProviderError> {
        let prompt = search_prompt(query, candidates)?;
        let content = self.complete_json("ranked_ids", prompt, id_list_schema()).await?;
        parse_id_list(&content)
    }

    async fn recommend(
        &self,
        profile: &PreferenceSummary,
        candidates: &[RecommendCandidate],
    ) -> Result<Vec<String>, ProviderError> {
        let prompt = recommend_prompt(profile, candidates)?;
        let content = self.complete_json("ranked_ids", prompt, id_list_schema()).await?;
        parse_id_list(&content)
    }
}

const SYSTEM_PROMPT: &str = "You are the engine behind a local events app. Answer only with JSON matching the requested schema. Use only the data provided.";

fn draft_prompt(text: &str) -> String {
    format!(
        "Extract event details from this text. If details are missing, creatively infer them to make it sound exciting.\nCurrent local time: {now}\nInput: \"{text}\"",
        now = Local::now().to_rfc3339(),
        text = text.trim(),
    )
}

fn search_prompt(query: &str, candidates: &[SearchCandidate]) -> Result<String, ProviderError> {
    let events_json = serde_json::to_string(candidates)
        .map_err(|err| ProviderError::Malformed(err.to_string()))?;
    Ok(format!(
        "You are an event recommendation engine.\nUser Query: \"{query}\"\n\nHere is the list of available events:\n{events_json}\n\nReturn a JSON array of event IDs that match the user's intent, ranked by relevance.\nIf no events match well, return an empty array.\n",
        query = query.trim(),
    ))
}

fn recommend_prompt(
    profile: &PreferenceSummary,
    candidates: &[RecommendCandidate],
) -> Result<String, ProviderError> {
    let events_json = serde_json::to_string(candidates)
        .map_err(|err| ProviderError::Malformed(err.to_string()))?;
    let categories = profile
        .favorite_categories
        .iter()
        .map(EventCategory::label)
        .collect::<Vec<_>>()
        .join(", ");
    let liked = profile.liked_titles.join(", ");

    Ok(format!(
        "You are a hyper-personalized local concierge.\n\nUser Profile:\n- Favorite Categories: {categories}\n- Previously Liked Events: {liked}\n- Current Location Context: {location}\n\nTask: Rank the available events below for this user.\nPrioritize events that match their category interests and are geographically closer if distance is known.\nIf the user has no history, prioritize popular events with high ratings.\n\nAvailable Events:\n{events_json}\n\nReturn a JSON array of event IDs ordered by recommendation strength (Strongest first).\n",
        categories = none_yet(&categories),
        liked = none_yet(&liked),
        location = if profile.location_known { "Known" } else { "Unknown" },
    ))
}

fn none_yet(value: &str) -> &str {
    if value.is_empty() {
        "None yet"
    } else {
        value
    }
}

fn draft_schema() -> Value {
    let categories: Vec<&str> = EventCategory::ALL.iter().map(EventCategory::label).collect();
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": "A catchy, short title for the event" },
            "description": { "type": "string", "description": "A compelling 2-sentence description" },
            "category": {
                "type": "string",
                "enum": categories,
                "description": "The most fitting category"
            },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "description": "3-5 relevant lowercase tags"
            },
            "suggestedTime": {
                "type": ["string", "null"],
                "description": format!(
                    "ISO 8601 date-time inferred from the input (e.g. 'next friday at 5pm', relative to {}) or null if not inferable",
                    Utc::now().date_naive()
                )
            }
        },
        "required": ["title", "description", "category", "tags"]
    })
}

fn id_list_schema() -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" }
    })
}

fn extract_content(body: &str) -> Result<String, ProviderError> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed(err.to_string()))?;

    value
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| strip_code_fence(s).to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ProviderError::MissingContent)
}

// Some local models wrap JSON output in a markdown fence despite the schema.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_draft(content: &str) -> Result<EventDraft, ProviderError> {
    let draft: EventDraft =
        serde_json::from_str(content).map_err(|err| ProviderError::Malformed(err.to_string()))?;
    normalize_draft(draft)
}

/// Accepts a bare array of ids or an object wrapping one under `ids`.
fn parse_id_list(content: &str) -> Result<Vec<String>, ProviderError> {
    let value: Value =
        serde_json::from_str(content).map_err(|err| ProviderError::Malformed(err.to_string()))?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("ids")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::Malformed("expected an array of ids".to_string()))?,
        _ => {
            return Err(ProviderError::Malformed(
                "expected an array of ids".to_string(),
            ))
        }
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(id) => Ok(id.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(ProviderError::Malformed(format!("unexpected id {other}"))),
        })
        .collect()
}
