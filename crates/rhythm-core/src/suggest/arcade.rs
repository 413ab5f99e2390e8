//! Arcade.dev tool execution: YouTube search for break videos.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{Video, VideoProvider, VideoSearch};
use crate::error::ProviderError;
use crate::storage::{is_placeholder_credential, ProvidersConfig};

const SEARCH_TOOL: &str = "Youtube.SearchForVideos";

pub struct ArcadeClient {
    api_key: String,
    base_url: String,
    user_id: String,
    http: Client,
}

impl ArcadeClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            user_id: user_id.into(),
            http: Client::new(),
        }
    }

    pub fn from_config(cfg: &ProvidersConfig) -> Self {
        Self::new(cfg.arcade_key(), cfg.arcade_base_url.clone(), cfg.arcade_user_id.clone())
    }

    async fn execute_search(&self, keywords: &str) -> Result<Value, ProviderError> {
        let url = format!("{}/v1/tools/execute", self.base_url.trim_end_matches('/'));
        let body = json!({
            "tool_name": SEARCH_TOOL,
            "input": {
                "keywords": keywords,
                "language_code": "en",
                "country_code": "US",
                "next_page_token": "",
            },
            "user_id": self.user_id,
        });

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Request(format!(
                "Arcade error (HTTP {status}): {text}"
            )));
        }
        Ok(resp.json().await?)
    }
}

/// Pull the first video out of a tool execution result.
///
/// The tool output has shifted shape between versions, so every field is
/// read leniently and derived where possible.
fn first_video(result: &Value) -> Option<Video> {
    let videos = result
        .pointer("/output/value/videos")
        .or_else(|| result.pointer("/output/videos"))?
        .as_array()?;
    let raw = videos.first()?;

    let id = string_field(raw, &["id", "video_id"])?;
    let channel_title = match raw.get("channel") {
        Some(Value::Object(obj)) => obj.get("name").and_then(Value::as_str).map(str::to_string),
        Some(Value::String(name)) => Some(name.clone()),
        _ => None,
    }
    .or_else(|| string_field(raw, &["channel_title"]))
    .unwrap_or_default();

    Some(Video {
        title: string_field(raw, &["title"]).unwrap_or_default(),
        description: string_field(raw, &["description"]).unwrap_or_default(),
        thumbnail: string_field(raw, &["thumbnail_url", "thumbnail"])
            .unwrap_or_else(|| format!("https://img.youtube.com/vi/{id}/mqdefault.jpg")),
        channel_title,
        published_at: string_field(raw, &["published_date", "published_at"]),
        url: string_field(raw, &["link", "url"])
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={id}")),
        duration: string_field(raw, &["duration"]),
        view_count: count_field(raw, "view_count"),
        like_count: count_field(raw, "like_count"),
        id,
    })
}

fn string_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| raw.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn count_field(raw: &Value, key: &str) -> Option<u64> {
    match raw.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl VideoProvider for ArcadeClient {
    fn name(&self) -> &str {
        "arcade"
    }

    fn is_configured(&self) -> bool {
        !is_placeholder_credential(&self.api_key)
    }

    async fn search_video(&self, keywords: &str) -> VideoSearch {
        if !self.is_configured() {
            return VideoSearch::failed("Arcade.dev API key not configured");
        }

        match self.execute_search(keywords).await {
            Ok(result) => match first_video(&result) {
                Some(video) => {
                    debug!(video_id = %video.id, keywords, "video found");
                    VideoSearch::found(video)
                }
                None => VideoSearch::failed("No videos found for the given keywords"),
            },
            Err(e) => {
                warn!(error = %e, keywords, "video search failed");
                VideoSearch::failed(e.to_string())
            }
        }
    }
}
