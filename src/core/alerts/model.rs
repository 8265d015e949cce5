// Alert rule types: what to say and what to play for each trigger.

use serde::{Deserialize, Serialize};

use crate::core::model::Trigger;

/// Clamp a configured volume into the canonical `[0, 1]` range.
/// NaN is treated as silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}

/// Per-trigger alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRule {
    pub chat_enabled: bool,
    /// Chat template; supports `<name>`, `<world>`, `<link>` and `<species>`
    pub chat_template: String,

    pub sound_enabled: bool,
    /// Local file or http(s) URL; blank means the bundled doorbell sound
    pub sound_path: String,
    pub sound_volume: f32,

    /// Species override; replaces the base sound for small-species players
    pub override_enabled: bool,
    pub override_path: String,
    pub override_volume: f32,
}

impl Default for AlertRule {
    fn default() -> Self {
        Self {
            chat_enabled: false,
            chat_template: String::new(),
            sound_enabled: false,
            sound_path: String::new(),
            sound_volume: 1.0,
            override_enabled: true,
            override_path: String::new(),
            override_volume: 1.0,
        }
    }
}

impl AlertRule {
    fn with_chat(template: &str) -> Self {
        Self {
            chat_enabled: true,
            chat_template: template.to_string(),
            sound_enabled: true,
            ..Self::default()
        }
    }
}

/// The three rules, one per trigger kind. Missing rules take the templated defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRules {
    pub entered: AlertRule,
    pub left: AlertRule,
    pub already_here: AlertRule,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            entered: AlertRule::with_chat("<link> has entered the house. <species>"),
            left: AlertRule::with_chat("<link> has left the house."),
            already_here: AlertRule::with_chat("<link> is already here. <species>"),
        }
    }
}

impl AlertRules {
    pub fn get(&self, trigger: Trigger) -> &AlertRule {
        match trigger {
            Trigger::Entered => &self.entered,
            Trigger::Left => &self.left,
            Trigger::AlreadyHere => &self.already_here,
        }
    }
}
