// Chat notice formatting.
//
// Templates are scanned left to right; the four known tags are replaced and
// everything else, including stray '<', is copied literally.

use std::fmt;

use crate::core::error::AlertError;
use crate::core::model::{PlayerRecord, WorldLookup};

pub const PLUGIN_NAME: &str = "Doorbell";

/// UI colour key used for the species phrase
pub const SPECIES_HIGHLIGHT: u16 = 518;
/// UI colour key that restores the default foreground
pub const FOREGROUND_RESET: u16 = 0;

const SPECIES_PHRASE: &str = "This user is a Lalafel";

/// One piece of a rich chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Interactive reference to a player, rendered by the host
    PlayerLink { name: String, world_id: u32 },
    Foreground(u16),
    Italic(bool),
}

/// Styled chat message handed to the host chat sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    segments: Vec<Segment>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text, merging into the previous text segment when possible.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Text(text.to_string()));
        }
    }

    pub fn push(&mut self, segment: Segment) {
        match segment {
            Segment::Text(text) => self.push_text(&text),
            other => self.segments.push(other),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Visible characters only; player links show as the player name.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::PlayerLink { name, .. } => out.push_str(name),
                Segment::Foreground(_) | Segment::Italic(_) => {}
            }
        }
        out
    }
}

impl fmt::Display for RichText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.plain_text())
    }
}

/// Host chat window.
pub trait ChatSink: Send + Sync {
    fn emit(&self, message: RichText) -> Result<(), AlertError>;
}

/// Build the chat notice for `player` from `template`.
pub fn format_message(template: &str, player: &PlayerRecord, worlds: &dyn WorldLookup) -> RichText {
    let mut message = RichText::new();
    message.push_text(&format!("[{}] ", PLUGIN_NAME));

    let mut rest = template;
    while let Some(open) = rest.find('<') {
        message.push_text(&rest[..open]);
        let from_open = &rest[open..];

        let tag = from_open[1..]
            .find('>')
            .map(|close| &from_open[..close + 2]);

        match tag.and_then(|tag| expand_tag(tag, player, worlds).map(|segments| (tag, segments))) {
            Some((tag, segments)) => {
                for segment in segments {
                    message.push(segment);
                }
                rest = &from_open[tag.len()..];
            }
            None => {
                message.push_text("<");
                rest = &from_open[1..];
            }
        }
    }
    message.push_text(rest);

    message
}

fn expand_tag(tag: &str, player: &PlayerRecord, worlds: &dyn WorldLookup) -> Option<Vec<Segment>> {
    let segments = match tag {
        "<name>" => vec![Segment::Text(player.name().to_string())],
        "<world>" => vec![Segment::Text(player.world_name(worlds))],
        "<link>" => vec![Segment::PlayerLink {
            name: player.name().to_string(),
            world_id: player.world_id(),
        }],
        "<species>" => {
            let phrase = if player.is_small_species() { SPECIES_PHRASE } else { "" };
            vec![
                Segment::Foreground(SPECIES_HIGHLIGHT),
                Segment::Italic(true),
                Segment::Text(phrase.to_string()),
                Segment::Italic(false),
                Segment::Foreground(FOREGROUND_RESET),
            ]
        }
        _ => return None,
    };
    Some(segments)
}
