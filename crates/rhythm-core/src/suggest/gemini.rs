//! Gemini text generation -- one short break activity per call.

use async_trait::async_trait;
use indoc::formatdoc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{SuggestionRequest, TextProvider};
use crate::error::{ConfigurationError, ProviderError};
use crate::storage::{is_placeholder_credential, ProvidersConfig};

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
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

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    pub fn from_config(cfg: &ProvidersConfig) -> Self {
        Self::new(cfg.gemini_key(), cfg.gemini_model.clone(), cfg.gemini_base_url.clone())
    }

    fn endpoint(&self) -> Result<Url, ProviderError> {
        // `join` replaces the last segment unless the base ends in a slash.
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        let base = Url::parse(&base)
            .map_err(|e| ConfigurationError::InvalidValue {
                key: "providers.gemini_base_url".into(),
                message: e.to_string(),
            })?;
        let mut url = base
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| ConfigurationError::InvalidValue {
                key: "providers.gemini_model".into(),
                message: e.to_string(),
            })?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

/// The prompt sent for every break.
pub(crate) fn break_prompt(request: &SuggestionRequest) -> String {
    let mood = request
        .mood
        .map(|m| m.label().to_lowercase())
        .unwrap_or_else(|| "okay".to_string());
    formatdoc! {"
        You are a friendly productivity assistant. Suggest **exactly one** short, fun, and relaxing break activity for someone who has been working for {worked} minutes, taking a {brk}-minute break, and currently feels {mood}.

        The activity should:
        - Be refreshing
        - Be equipment-free
        - Be something a person anywhere can do
        - Take less than 10 minutes
        - Use the style of these examples: Go for a walk, Drink water, Take a power nap, Stretch, Meditate, Eat a snack
        - Not be too draining

        Only return **one activity**, in one sentence without any other context.
        ",
        worked = request.worked_for_minutes,
        brk = request.break_minutes,
        mood = mood,
    }
}

#[async_trait]
impl TextProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        !is_placeholder_credential(&self.api_key)
    }

    async fn break_activity(&self, request: &SuggestionRequest) -> Result<String, ProviderError> {
        if !self.is_configured() {
            let provider = "Gemini".to_string();
            return Err(if self.api_key.trim().is_empty() {
                ConfigurationError::MissingCredential { provider }
            } else {
                ConfigurationError::PlaceholderCredential { provider }
            }
            .into());
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": break_prompt(request) }] }]
        });
        let resp = self.http.post(self.endpoint()?).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Request(format!(
                "Gemini error (HTTP {status}): {text}"
            )));
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<String>();
        let sentence = text.trim();
        if sentence.is_empty() {
            return Err(ProviderError::Malformed("Gemini returned no text".into()));
        }
        Ok(sentence.to_string())
    }
}
