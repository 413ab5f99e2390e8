//! Break suggestions.
//!
//! A break is filled with either a short text activity or a video. Sources
//! are tried in a fixed order and any failure moves on to the next one, so
//! callers always get a [`Suggestion`] back:
//!
//! 1. video search (breaks of 5+ minutes, when the coin says so)
//! 2. text generation, rescued by a per-mood sentence if the provider fails
//! 3. the universal default sentence

mod arcade;
mod gemini;
mod keywords;
mod suggester;

pub use arcade::ArcadeClient;
pub use gemini::GeminiClient;
pub use keywords::{
    mood_fallback, video_keywords, DurationBucket, DEFAULT_SUGGESTION,
};
pub use suggester::{Attempt, BreakSuggester};

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cycle::Mood;
use crate::error::ProviderError;

/// What the user is shown during a break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Suggestion {
    Text {
        text: String,
    },
    Video {
        title: String,
        channel: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        url: String,
    },
}

impl Suggestion {
    pub fn text(text: impl Into<String>) -> Self {
        Suggestion::Text { text: text.into() }
    }

    /// One-line rendering.
    pub fn headline(&self) -> String {
        match self {
            Suggestion::Text { text } => text.clone(),
            Suggestion::Video { title, url, .. } => format!("Watch this video: {title} ({url})"),
        }
    }
}

/// Inputs for a break suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub worked_for_minutes: f64,
    pub break_minutes: f64,
    pub mood: Option<Mood>,
}

/// A video search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub channel_title: String,
    pub published_at: Option<String>,
    pub url: String,
    pub duration: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
}

/// Outcome of a video lookup. Lookups report failure in-band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSearch {
    pub success: bool,
    pub video: Option<Video>,
    pub message: String,
}

impl VideoSearch {
    pub fn found(video: Video) -> Self {
        Self {
            success: true,
            video: Some(video),
            message: "Video found successfully".into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            video: None,
            message: message.into(),
        }
    }
}

/// Generates a one-sentence break activity.
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;

    /// "Not configured" is a normal state, not an error.
    fn is_configured(&self) -> bool;

    async fn break_activity(&self, request: &SuggestionRequest) -> Result<String, ProviderError>;
}

/// Looks up a single video for a keyword phrase.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    async fn search_video(&self, keywords: &str) -> VideoSearch;
}

/// Decides whether a long-enough break tries a video first.
pub trait CoinFlip: Send + Sync {
    fn prefers_video(&self) -> bool;
}

/// Weighted coin backed by the thread RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomCoin {
    chance: f64,
}

impl RandomCoin {
    /// A non-finite chance falls back to an even coin.
    pub fn new(chance: f64) -> Self {
        let chance = if chance.is_finite() {
            chance.clamp(0.0, 1.0)
        } else {
            0.5
        };
        Self { chance }
    }
}

impl Default for RandomCoin {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl CoinFlip for RandomCoin {
    fn prefers_video(&self) -> bool {
        rand::thread_rng().gen_bool(self.chance)
    }
}

/// Always lands the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedCoin(pub bool);

impl CoinFlip for FixedCoin {
    fn prefers_video(&self) -> bool {
        self.0
    }
}
