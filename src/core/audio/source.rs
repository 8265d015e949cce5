//! Sound selection and source resolution.
//!
//! Picks base or override settings from a rule, then turns the configured
//! path into something the backend can open: a local file or an http(s) URL.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::alerts::model::{clamp_volume, AlertRule};
use crate::core::error::AlertError;

/// Bundled sound used when the base path is blank
pub const DEFAULT_SOUND_FILE: &str = "doorbell.wav";
/// Bundled sound used when the override path is blank
pub const DEFAULT_OVERRIDE_FILE: &str = "lalawarning.wav";

lazy_static! {
    static ref HTTP_URL: Regex = Regex::new(r"(?i)^https?://[^\s/?#]+[^\s]*$").expect("Invalid URL regex");
}

/// Whether `path` is a well-formed http or https URL.
pub fn is_http_url(path: &str) -> bool {
    HTTP_URL.is_match(path.trim())
}

/// Which half of a rule a request was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    Base,
    Override,
}

/// A playback request with the rule's settings already chosen
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRequest {
    pub kind: SoundKind,
    pub path: String,
    pub volume: f32,
}

impl SoundRequest {
    /// Choose the settings to play, or `None` when the rule plays nothing.
    pub fn select(rule: &AlertRule, use_override: bool) -> Option<Self> {
        if use_override && rule.override_enabled {
            return Some(Self {
                kind: SoundKind::Override,
                path: rule.override_path.clone(),
                volume: rule.override_volume,
            });
        }
        if !rule.sound_enabled {
            return None;
        }
        Some(Self {
            kind: SoundKind::Base,
            path: rule.sound_path.clone(),
            volume: rule.sound_volume,
        })
    }

    /// Volume as applied to the output, always within `[0, 1]`.
    pub fn effective_volume(&self) -> f32 {
        clamp_volume(self.volume)
    }
}

/// Directory holding the bundled default sounds
#[derive(Debug, Clone)]
pub struct SoundAssets {
    dir: PathBuf,
}

impl SoundAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Assets shipped next to the running executable.
    pub fn beside_executable() -> Self {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn default_for(&self, kind: SoundKind) -> PathBuf {
        match kind {
            SoundKind::Base => self.dir.join(DEFAULT_SOUND_FILE),
            SoundKind::Override => self.dir.join(DEFAULT_OVERRIDE_FILE),
        }
    }
}

/// Where the audio bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    File(PathBuf),
    Url(String),
}

impl SoundSource {
    /// Resolve the configured path without touching the file contents.
    pub fn resolve(request: &SoundRequest, assets: &SoundAssets) -> Result<Self, AlertError> {
        let configured = request.path.trim();
        if configured.is_empty() {
            return Self::existing_file(assets.default_for(request.kind));
        }
        if is_http_url(configured) {
            return Ok(Self::Url(configured.to_string()));
        }
        Self::existing_file(PathBuf::from(configured))
    }

    fn existing_file(path: PathBuf) -> Result<Self, AlertError> {
        if path.is_file() {
            Ok(Self::File(path))
        } else {
            Err(AlertError::SoundNotFound(path.display().to_string()))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
        }
    }
}
