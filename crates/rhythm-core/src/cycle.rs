//! Cycle records -- the only data that outlives a session.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleType {
    Work,
    Break,
}

impl CycleType {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleType::Work => "work",
            CycleType::Break => "break",
        }
    }
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CycleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(CycleType::Work),
            "break" => Ok(CycleType::Break),
            other => Err(format!("unknown cycle type: {other}")),
        }
    }
}

/// How the user felt at the end of a work cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Tired,
    Good,
    Stressed,
    /// Skip the break and start another work cycle.
    KeepGoing,
}

impl Mood {
    /// Prompt order.
    pub const ALL: [Mood; 4] = [Mood::Tired, Mood::Good, Mood::Stressed, Mood::KeepGoing];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Tired => "tired",
            Mood::Good => "good",
            Mood::Stressed => "stressed",
            Mood::KeepGoing => "keep_going",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Tired => "Tired",
            Mood::Good => "Good",
            Mood::Stressed => "Stressed",
            Mood::KeepGoing => "Keep Going",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "tired" => Ok(Mood::Tired),
            "good" => Ok(Mood::Good),
            "stressed" => Ok(Mood::Stressed),
            "keep_going" => Ok(Mood::KeepGoing),
            other => Err(format!("unknown mood: {other}")),
        }
    }
}

/// One completed work or break interval, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: i64,
    #[serde(rename = "type")]
    pub cycle_type: CycleType,
    pub duration_minutes: f64,
    pub mood: Option<Mood>,
    pub completed_at: DateTime<Utc>,
}
