//! Fixed content: video search phrases and offline sentences.

use serde::{Deserialize, Serialize};

use crate::cycle::Mood;

/// Shown when nothing better is available.
pub const DEFAULT_SUGGESTION: &str = "Take a few deep breaths and stretch your arms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationBucket {
    /// Under 5 minutes.
    Short,
    /// 5 to under 10 minutes.
    Medium,
    /// 10 minutes and up.
    Long,
}

impl DurationBucket {
    pub fn for_break(break_minutes: f64) -> Self {
        if break_minutes >= 10.0 {
            DurationBucket::Long
        } else if break_minutes >= 5.0 {
            DurationBucket::Medium
        } else {
            DurationBucket::Short
        }
    }
}

const TIRED: [[&str; 3]; 3] = [
    [
        "3 minute breathing exercise for energy",
        "short relaxing stretch for fatigue",
        "quick breathing reset for tiredness",
    ],
    [
        "5 minute gentle stretch for tired muscles",
        "quick yoga for relaxation and recharge",
        "short guided meditation for energy",
    ],
    [
        "10 minute deep relaxation meditation",
        "restorative yoga for tiredness",
        "guided body scan meditation for rest",
    ],
];

const STRESSED: [[&str; 3]; 3] = [
    [
        "2 minute guided breathing for stress relief",
        "quick breathing exercise to calm stress",
        "short relaxation technique for anxiety",
    ],
    [
        "5 minute stress relief yoga",
        "quick mindfulness meditation for calm",
        "guided breathing to release tension",
    ],
    [
        "10 minute mindfulness meditation for stress",
        "progressive muscle relaxation guided",
        "calming yoga flow for stress relief",
    ],
];

const GOOD: [[&str; 3]; 3] = [
    [
        "3 minute energizing dance break",
        "short uplifting breathing exercise",
        "quick upbeat music workout",
    ],
    [
        "5 minute positive affirmations with music",
        "quick fun stretch routine",
        "energizing music with light movement",
    ],
    [
        "10 minute uplifting stretch and movement",
        "guided meditation for positivity",
        "happy dance workout beginner friendly",
    ],
];

/// Search phrase for a break video.
///
/// Moods without their own table (keep-going, none) use the tired one. The
/// phrase within a bucket is `floor(break_minutes) mod 3`, so identical
/// inputs always give the same phrase.
pub fn video_keywords(mood: Option<Mood>, break_minutes: f64) -> &'static str {
    let table = match mood {
        Some(Mood::Stressed) => &STRESSED,
        Some(Mood::Good) => &GOOD,
        Some(Mood::Tired) | Some(Mood::KeepGoing) | None => &TIRED,
    };
    let options = match DurationBucket::for_break(break_minutes) {
        DurationBucket::Short => &table[0],
        DurationBucket::Medium => &table[1],
        DurationBucket::Long => &table[2],
    };
    let whole_minutes = if break_minutes.is_finite() && break_minutes > 0.0 {
        break_minutes.floor() as usize
    } else {
        0
    };
    options[whole_minutes % options.len()]
}

/// Offline activity for a mood, used when a configured text provider fails.
pub fn mood_fallback(mood: Option<Mood>) -> Option<&'static str> {
    match mood? {
        Mood::Tired => Some("Take a power nap for 5-10 minutes"),
        Mood::Good => Some("Go for a short walk around the room"),
        Mood::Stressed => Some("Take 5 deep breaths and stretch your shoulders"),
        Mood::KeepGoing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_split_at_five_and_ten() {
        assert_eq!(DurationBucket::for_break(4.9), DurationBucket::Short);
        assert_eq!(DurationBucket::for_break(5.0), DurationBucket::Medium);
        assert_eq!(DurationBucket::for_break(9.0), DurationBucket::Medium);
        assert_eq!(DurationBucket::for_break(10.0), DurationBucket::Long);
    }

    #[test]
    fn keyword_index_follows_break_minutes() {
        // 5 % 3 == 2, 6 % 3 == 0, 7 % 3 == 1
        assert_eq!(video_keywords(Some(Mood::Stressed), 5.0), "guided breathing to release tension");
        assert_eq!(video_keywords(Some(Mood::Stressed), 6.0), "5 minute stress relief yoga");
        assert_eq!(video_keywords(Some(Mood::Stressed), 7.0), "quick mindfulness meditation for calm");
    }

    #[test]
    fn keywords_are_stable_for_repeated_calls() {
        let first = video_keywords(Some(Mood::Good), 12.0);
        for _ in 0..10 {
            assert_eq!(video_keywords(Some(Mood::Good), 12.0), first);
        }
    }

    #[test]
    fn moods_without_a_table_use_tired() {
        assert_eq!(
            video_keywords(Some(Mood::KeepGoing), 10.0),
            video_keywords(Some(Mood::Tired), 10.0)
        );
        assert_eq!(video_keywords(None, 3.0), video_keywords(Some(Mood::Tired), 3.0));
    }

    #[test]
    fn keep_going_has_no_offline_sentence() {
        assert!(mood_fallback(Some(Mood::Tired)).is_some());
        assert!(mood_fallback(Some(Mood::KeepGoing)).is_none());
        assert!(mood_fallback(None).is_none());
    }
}
