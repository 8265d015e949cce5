//! Command-line host: feeds house events from stdin into the alert engine.
//!
//! Each stdin line is one JSON event, e.g.
//! `{"event":"entered","name":"Alice","world_id":40,"race_id":1}`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::core::{
    alerts::{
        chat::{ChatSink, RichText},
        engine::AlertEngine,
        model::AlertRule,
    },
    audio::{
        backend::RodioBackend,
        gate::PlaybackGate,
        player::{SoundPlayer, PLAYBACK_CEILING},
        source::SoundAssets,
    },
    config::{ConfigManager, Settings},
    error::{AlertError, ConfigError},
    model::{PlayerRecord, Trigger, WorldLookup, WorldTable},
};

#[derive(Parser, Debug)]
#[command(version, about = "Doorbell house alerts driven by JSON events on stdin")]
pub struct Cli {
    /// Settings file, created on `save`
    #[arg(short, long, default_value = "doorbell.json")]
    pub config: PathBuf,

    /// Directory with doorbell.wav and lalawarning.wav (default: next to the executable)
    #[arg(short, long)]
    pub assets: Option<PathBuf>,

    /// JSON object mapping world ids to names
    #[arg(short, long)]
    pub worlds: Option<PathBuf>,
}

/// A player sighting reported by the game
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PlayerSeen {
    pub name: String,
    pub world_id: u32,
    #[serde(default)]
    pub race_id: u8,
}

impl PlayerSeen {
    fn record(&self) -> PlayerRecord {
        PlayerRecord::new(self.name.clone(), self.world_id, self.race_id)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Entered(PlayerSeen),
    Left(PlayerSeen),
    AlreadyHere(PlayerSeen),
    /// The local player left the house
    LeftHouse,
    /// Zero minutes silences until leaving the house
    Silence {
        #[serde(default)]
        minutes: u32,
    },
    Unsilence,
    Preview {
        trigger: Trigger,
        #[serde(default)]
        use_override: bool,
    },
    Save,
}

/// Chat sink printing plain text to stdout
pub struct StdoutChat;

impl ChatSink for StdoutChat {
    fn emit(&self, message: RichText) -> Result<(), AlertError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", message).map_err(|e| AlertError::Chat(e.to_string()))
    }
}

/// Host-side state around the engine: settings, silence window, persistence.
pub struct Host {
    engine: AlertEngine,
    settings: Settings,
    config_manager: ConfigManager,
}

impl Host {
    pub fn new(engine: AlertEngine, settings: Settings, config_manager: ConfigManager) -> Self {
        Self {
            engine,
            settings,
            config_manager,
        }
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Parse and apply one stdin line. Bad lines are logged and skipped.
    pub fn apply_line(&mut self, line: &str, now: DateTime<Utc>) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => {
                if let Err(err) = self.apply(event, now) {
                    log::error!("[Doorbell] {:?}", err);
                }
            }
            Err(err) => log::warn!("[Doorbell] Ignoring malformed event {:?}: {}", line, err),
        }
    }

    pub fn apply(&mut self, event: HostEvent, now: DateTime<Utc>) -> Result<(), ConfigError> {
        match event {
            HostEvent::Entered(seen) => self.alert(Trigger::Entered, &seen, now),
            HostEvent::Left(seen) => self.alert(Trigger::Left, &seen, now),
            HostEvent::AlreadyHere(seen) => self.alert(Trigger::AlreadyHere, &seen, now),
            HostEvent::LeftHouse => self.settings.silence.left_house(),
            HostEvent::Silence { minutes } => self.settings.silence.silence(minutes, now),
            HostEvent::Unsilence => self.settings.silence.unsilence(),
            HostEvent::Preview { trigger, use_override } => {
                let outcome = self.engine.preview(trigger, use_override);
                log::debug!("[Doorbell] Preview {}: {:?}", trigger, outcome);
            }
            HostEvent::Save => {
                self.settings.alerts = self.engine.rules().clone();
                self.config_manager.save(&self.settings)?;
                log::info!("[Doorbell] Settings saved to {}", self.config_manager.path().display());
            }
        }
        Ok(())
    }

    fn alert(&mut self, trigger: Trigger, seen: &PlayerSeen, now: DateTime<Utc>) {
        if self.settings.silence.is_silenced(now) {
            log::debug!("[Doorbell] Silenced, skipping {} for {}", trigger, seen.name);
            return;
        }
        let outcome = self.engine.handle(trigger, &seen.record());
        log::debug!("[Doorbell] {} alert for {}: {:?}", trigger, seen.name, outcome);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Also installs the `log` bridge, which the core logs through.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn rule_summary(trigger: Trigger, rule: &AlertRule) -> String {
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };
    format!(
        "{}: chat {}, sound {}, override {}",
        trigger.display_name(),
        on_off(rule.chat_enabled),
        on_off(rule.sound_enabled),
        on_off(rule.override_enabled)
    )
}

async fn serve(cli: Cli) -> Result<(), String> {
    let config_manager = ConfigManager::with_file(cli.config);
    let settings = config_manager.load();

    for trigger in Trigger::all() {
        log::info!("[Doorbell] {}", rule_summary(*trigger, settings.alerts.get(*trigger)));
    }

    let world_table = match &cli.worlds {
        Some(path) => WorldTable::load(path).map_err(|e| format!("{:?}", e))?,
        None => WorldTable::default(),
    };
    if world_table.is_empty() {
        log::warn!("[Doorbell] No world names loaded, players show as World_<id>");
    } else {
        log::info!("[Doorbell] Loaded {} world names", world_table.len());
    }
    let worlds: Arc<dyn WorldLookup> = Arc::new(world_table);
    let assets = cli
        .assets
        .map(SoundAssets::new)
        .unwrap_or_else(SoundAssets::beside_executable);
    log::info!("[Doorbell] Bundled sounds in {}", assets.dir().display());

    let player = SoundPlayer::spawn(PlaybackGate::new(), Arc::new(RodioBackend::new()), assets)
        .map_err(|e| e.to_string())?;
    let engine = AlertEngine::new(settings.alerts.clone(), Arc::new(StdoutChat), worlds, player);
    let mut host = Host::new(engine, settings, config_manager);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? {
        host.apply_line(&line, Utc::now());
    }

    // Let the current sound finish before the worker is torn down with the process.
    let player = host.engine().player().clone();
    let drained = tokio::time::timeout(PLAYBACK_CEILING * 2, async move {
        while player.is_playing() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        log::warn!("[Doorbell] Exiting with a sound still playing");
    }
    Ok(())
}

pub fn run() {
    let cli = Cli::parse();
    init_logging();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("[Doorbell] Failed to start runtime: {}", err);
            std::process::exit(1);
        }
    };
    if let Err(err) = runtime.block_on(serve(cli)) {
        log::error!("[Doorbell] {}", err);
        std::process::exit(1);
    }
}
