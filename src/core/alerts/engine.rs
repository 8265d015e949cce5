// Alert engine - routes a trigger to its rule, prints chat, requests the sound.

use std::sync::Arc;

use super::chat::{format_message, ChatSink};
use super::model::{AlertRule, AlertRules};
use crate::core::audio::player::{PlayOutcome, SoundPlayer};
use crate::core::audio::source::SoundRequest;
use crate::core::model::{PlayerRecord, Trigger, WorldLookup};

/// Alert engine state
pub struct AlertEngine {
    /// Rules for each trigger
    rules: AlertRules,
    chat: Arc<dyn ChatSink>,
    worlds: Arc<dyn WorldLookup>,
    player: SoundPlayer,
}

impl AlertEngine {
    pub fn new(
        rules: AlertRules,
        chat: Arc<dyn ChatSink>,
        worlds: Arc<dyn WorldLookup>,
        player: SoundPlayer,
    ) -> Self {
        Self {
            rules,
            chat,
            worlds,
            player,
        }
    }

    /// Replace the rules (hot-reload friendly)
    pub fn update_rules(&mut self, rules: AlertRules) {
        self.rules = rules;
    }

    pub fn rules(&self) -> &AlertRules {
        &self.rules
    }

    pub fn player(&self) -> &SoundPlayer {
        &self.player
    }

    /// Raise the alert for `trigger`. Chat goes out before the sound is requested;
    /// a failure in one never blocks the other.
    pub fn handle(&self, trigger: Trigger, player: &PlayerRecord) -> PlayOutcome {
        let rule = self.rules.get(trigger);
        log::debug!("[Doorbell] {} fired for {}", trigger, player.name());

        self.print_chat(rule, player);
        self.play_sound(rule, player.is_small_species())
    }

    /// Play a trigger's sound without chat, as the settings test buttons do.
    pub fn preview(&self, trigger: Trigger, use_override: bool) -> PlayOutcome {
        self.play_sound(self.rules.get(trigger), use_override)
    }

    fn print_chat(&self, rule: &AlertRule, player: &PlayerRecord) {
        if !rule.chat_enabled {
            return;
        }
        let message = format_message(&rule.chat_template, player, self.worlds.as_ref());
        if let Err(err) = self.chat.emit(message) {
            log::error!("[Doorbell] Failed to print chat message: {}", err);
        }
    }

    fn play_sound(&self, rule: &AlertRule, use_override: bool) -> PlayOutcome {
        match SoundRequest::select(rule, use_override) {
            Some(request) => self.player.play(request),
            None => PlayOutcome::Disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::chat::RichText;
    use crate::core::audio::gate::PlaybackGate;
    use crate::core::audio::player::testing::{wait_for_release, Behavior, ScriptedBackend};
    use crate::core::audio::source::{SoundAssets, SoundSource, DEFAULT_OVERRIDE_FILE, DEFAULT_SOUND_FILE};
    use crate::core::error::AlertError;
    use crate::core::model::WorldTable;
    use std::collections::HashMap;
    use std::fs::File;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    #[derive(Default)]
    struct RecordingChat {
        messages: Mutex<Vec<String>>,
    }

    impl ChatSink for RecordingChat {
        fn emit(&self, message: RichText) -> Result<(), AlertError> {
            self.messages.lock().unwrap().push(message.plain_text());
            Ok(())
        }
    }

    struct BrokenChat;

    impl ChatSink for BrokenChat {
        fn emit(&self, _message: RichText) -> Result<(), AlertError> {
            Err(AlertError::Chat("chat window closed".to_string()))
        }
    }

    fn worlds() -> Arc<WorldTable> {
        let mut names = HashMap::new();
        names.insert(40, "Gilgamesh".to_string());
        Arc::new(WorldTable::new(names))
    }

    fn setup(chat: Arc<dyn ChatSink>, rules: AlertRules) -> (TempDir, Arc<ScriptedBackend>, AlertEngine) {
        let dir = tempdir().unwrap();
        File::create(dir.path().join(DEFAULT_SOUND_FILE)).unwrap();
        File::create(dir.path().join(DEFAULT_OVERRIDE_FILE)).unwrap();
        let backend = ScriptedBackend::new(Behavior::FinishAfter(Duration::from_millis(20)));
        let player = SoundPlayer::spawn(PlaybackGate::new(), backend.clone(), SoundAssets::new(dir.path())).unwrap();
        let engine = AlertEngine::new(rules, chat, worlds(), player);
        (dir, backend, engine)
    }

    #[test]
    fn test_entered_prints_chat_and_plays_base_sound() {
        let chat = Arc::new(RecordingChat::default());
        let (dir, backend, engine) = setup(chat.clone(), AlertRules::default());

        let alice = PlayerRecord::new("Alice", 40, 1);
        assert_eq!(engine.handle(Trigger::Entered, &alice), PlayOutcome::Dispatched);
        assert!(wait_for_release(engine.player(), Duration::from_secs(5)));

        assert_eq!(
            chat.messages.lock().unwrap().as_slice(),
            &["[Doorbell] Alice has entered the house. ".to_string()]
        );
        let opened = backend.opened_with.lock().unwrap();
        assert_eq!(opened[0].0, SoundSource::File(dir.path().join(DEFAULT_SOUND_FILE)));
    }

    #[test]
    fn test_small_species_uses_override_sound() {
        let chat = Arc::new(RecordingChat::default());
        let (dir, backend, engine) = setup(chat.clone(), AlertRules::default());

        let lala = PlayerRecord::new("Tata Lulu", 40, 5);
        engine.handle(Trigger::AlreadyHere, &lala);
        assert!(wait_for_release(engine.player(), Duration::from_secs(5)));

        assert_eq!(
            chat.messages.lock().unwrap()[0],
            "[Doorbell] Tata Lulu is already here. This user is a Lalafel"
        );
        let opened = backend.opened_with.lock().unwrap();
        assert_eq!(opened[0].0, SoundSource::File(dir.path().join(DEFAULT_OVERRIDE_FILE)));
    }

    #[test]
    fn test_chat_failure_does_not_block_sound() {
        let (_dir, backend, engine) = setup(Arc::new(BrokenChat), AlertRules::default());

        let alice = PlayerRecord::new("Alice", 40, 1);
        assert_eq!(engine.handle(Trigger::Left, &alice), PlayOutcome::Dispatched);
        assert!(wait_for_release(engine.player(), Duration::from_secs(5)));
        assert_eq!(backend.opened_with.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_disabled_rule_is_silent() {
        let chat = Arc::new(RecordingChat::default());
        let mut rules = AlertRules::default();
        rules.left = AlertRule {
            override_enabled: false,
            ..AlertRule::default()
        };
        let (_dir, backend, engine) = setup(chat.clone(), rules);

        let lala = PlayerRecord::new("Tata Lulu", 40, 5);
        assert_eq!(engine.handle(Trigger::Left, &lala), PlayOutcome::Disabled);
        assert!(chat.messages.lock().unwrap().is_empty());
        assert!(backend.opened_with.lock().unwrap().is_empty());
    }

    #[test]
    fn test_preview_and_update_rules() {
        let chat = Arc::new(RecordingChat::default());
        let (_dir, backend, mut engine) = setup(chat.clone(), AlertRules::default());

        assert_eq!(engine.preview(Trigger::Entered, true), PlayOutcome::Dispatched);
        assert!(wait_for_release(engine.player(), Duration::from_secs(5)));
        assert!(chat.messages.lock().unwrap().is_empty());

        let mut rules = engine.rules().clone();
        rules.entered.sound_enabled = false;
        rules.entered.override_enabled = false;
        engine.update_rules(rules);
        assert_eq!(engine.preview(Trigger::Entered, false), PlayOutcome::Disabled);
        assert_eq!(backend.opened_with.lock().unwrap().len(), 1);
    }
}
