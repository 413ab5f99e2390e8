use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    mood_fallback, video_keywords, ArcadeClient, CoinFlip, GeminiClient, RandomCoin, Suggestion,
    SuggestionRequest, TextProvider, VideoProvider, DEFAULT_SUGGESTION,
};
use crate::error::{ConfigurationError, ProviderError};
use crate::storage::ProvidersConfig;

/// Shortest break that may be filled with a video.
const VIDEO_MIN_BREAK_MINUTES: f64 = 5.0;

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attempt {
    Video,
    Text,
    Default,
}

/// Produces a suggestion for every break, never failing.
pub struct BreakSuggester {
    text: Option<Arc<dyn TextProvider>>,
    video: Option<Arc<dyn VideoProvider>>,
    coin: Box<dyn CoinFlip>,
    timeout: Duration,
}

impl BreakSuggester {
    pub fn new(
        text: Option<Arc<dyn TextProvider>>,
        video: Option<Arc<dyn VideoProvider>>,
        timeout: Duration,
    ) -> Self {
        Self {
            text,
            video,
            coin: Box::new(RandomCoin::default()),
            timeout,
        }
    }

    pub fn from_config(cfg: &ProvidersConfig) -> Self {
        Self {
            text: Some(Arc::new(GeminiClient::from_config(cfg))),
            video: Some(Arc::new(ArcadeClient::from_config(cfg))),
            coin: Box::new(RandomCoin::new(cfg.video_chance)),
            timeout: cfg.timeout(),
        }
    }

    /// No providers at all; every break gets the default sentence.
    pub fn offline() -> Self {
        Self::new(None, None, Duration::from_secs(5))
    }

    pub fn with_coin(mut self, coin: impl CoinFlip + 'static) -> Self {
        self.coin = Box::new(coin);
        self
    }

    /// The order sources will be tried in. Always ends with [`Attempt::Default`].
    pub fn plan(&self, request: &SuggestionRequest) -> Vec<Attempt> {
        let mut plan = Vec::with_capacity(3);
        if request.break_minutes >= VIDEO_MIN_BREAK_MINUTES && self.coin.prefers_video() {
            plan.push(Attempt::Video);
        }
        plan.push(Attempt::Text);
        plan.push(Attempt::Default);
        plan
    }

    pub async fn suggest(&self, request: &SuggestionRequest) -> Suggestion {
        for attempt in self.plan(request) {
            let outcome = match attempt {
                Attempt::Video => self.try_video(request).await,
                Attempt::Text => self.try_text(request).await,
                Attempt::Default => Ok(Suggestion::text(DEFAULT_SUGGESTION)),
            };
            match outcome {
                Ok(suggestion) => {
                    info!(?attempt, "break suggestion ready");
                    return suggestion;
                }
                Err(e) if e.is_not_configured() => debug!(?attempt, error = %e, "source skipped"),
                Err(e) => warn!(?attempt, error = %e, "source failed"),
            }
        }
        Suggestion::text(DEFAULT_SUGGESTION)
    }

    async fn try_video(&self, request: &SuggestionRequest) -> Result<Suggestion, ProviderError> {
        let provider = self
            .video
            .as_ref()
            .ok_or_else(|| ProviderError::NoResults("no video provider".into()))?;
        if !provider.is_configured() {
            return Err(not_configured(provider.name()));
        }
        let keywords = video_keywords(request.mood, request.break_minutes);

        let search = tokio::time::timeout(self.timeout, provider.search_video(keywords))
            .await
            .map_err(|_| self.timed_out(provider.name()))?;
        let video = match (search.success, search.video) {
            (true, Some(video)) => video,
            _ => return Err(ProviderError::NoResults(search.message)),
        };

        Ok(Suggestion::Video {
            title: video.title,
            channel: video.channel_title,
            description: Some(video.description).filter(|d| !d.trim().is_empty()),
            url: video.url,
        })
    }

    async fn try_text(&self, request: &SuggestionRequest) -> Result<Suggestion, ProviderError> {
        let provider = self
            .text
            .as_ref()
            .ok_or_else(|| ProviderError::NoResults("no text provider".into()))?;
        if !provider.is_configured() {
            return Err(not_configured(provider.name()));
        }

        let result = tokio::time::timeout(self.timeout, provider.break_activity(request))
            .await
            .unwrap_or_else(|_| Err(self.timed_out(provider.name())));

        match result {
            Ok(text) => Ok(Suggestion::text(text)),
            Err(e) => match mood_fallback(request.mood) {
                Some(sentence) => {
                    warn!(error = %e, "text provider failed, using mood sentence");
                    Ok(Suggestion::text(sentence))
                }
                None => Err(e),
            },
        }
    }

    fn timed_out(&self, provider: &str) -> ProviderError {
        ProviderError::Timeout {
            provider: provider.to_string(),
            after_ms: self.timeout.as_millis() as u64,
        }
    }
}

fn not_configured(provider: &str) -> ProviderError {
    ConfigurationError::MissingCredential {
        provider: provider.to_string(),
    }
    .into()
}
