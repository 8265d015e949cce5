//! Silence window: suppresses all alerts until leaving the house or for a while.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SilenceState {
    #[default]
    Off,
    /// Silenced until the local player leaves the house
    UntilLeave,
    /// Silenced for `minutes` starting at `since`
    Timed { since: DateTime<Utc>, minutes: u32 },
}

impl SilenceState {
    /// Start a silence window. Zero minutes means until leaving the house.
    pub fn silence(&mut self, minutes: u32, now: DateTime<Utc>) {
        *self = if minutes == 0 {
            Self::UntilLeave
        } else {
            Self::Timed { since: now, minutes }
        };
        log::info!("[Doorbell] {}", self.label(now));
    }

    pub fn unsilence(&mut self) {
        if *self != Self::Off {
            log::info!("[Doorbell] Unsilenced.");
        }
        *self = Self::Off;
    }

    /// Leaving the house ends an open-ended silence; timed ones keep running.
    pub fn left_house(&mut self) {
        if *self == Self::UntilLeave {
            self.unsilence();
        }
    }

    /// Whether alerts are suppressed at `now`. Expired timers reset to `Off`.
    pub fn is_silenced(&mut self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Off => false,
            Self::UntilLeave => true,
            Self::Timed { .. } => {
                if self.remaining(now).is_some_and(|left| left > Duration::zero()) {
                    true
                } else {
                    self.unsilence();
                    false
                }
            }
        }
    }

    /// Time left on a timed silence; `None` for the other modes.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Self::Timed { since, minutes } => {
                let end = *since + Duration::minutes(i64::from(*minutes));
                Some((end - now).max(Duration::zero()))
            }
            _ => None,
        }
    }

    pub fn label(&self, now: DateTime<Utc>) -> String {
        match self {
            Self::Off => "Not silenced.".to_string(),
            Self::UntilLeave => "Silenced until leaving a house.".to_string(),
            Self::Timed { .. } => {
                let left = self.remaining(now).unwrap_or_else(Duration::zero);
                format!("Silenced for {}", format_clock(left))
            }
        }
    }
}

/// `dd:hh:mm:ss` with leading zeros and colons trimmed, e.g. `29:59` or `5`.
pub fn format_clock(span: Duration) -> String {
    let secs = span.num_seconds().max(0);
    let full = format!(
        "{:02}:{:02}:{:02}:{:02}",
        secs / 86_400,
        secs / 3_600 % 24,
        secs / 60 % 60,
        secs % 60
    );
    full.trim_start_matches(['0', ':']).to_string()
}
