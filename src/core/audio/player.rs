//! Single-flight sound player.
//!
//! The gate is checked on the caller's thread. Accepted requests go through a
//! one-slot channel to a dedicated worker thread that opens, plays and waits
//! for the sound, then releases the gate. Requests arriving while a sound is
//! playing are dropped, never queued.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::backend::{AudioBackend, OutputDevice};
use super::gate::{GateGuard, PlaybackGate};
use super::source::{SoundAssets, SoundRequest, SoundSource};
use crate::core::error::AlertError;

/// Upper bound on waiting for a device to report that it stopped
pub const PLAYBACK_CEILING: Duration = Duration::from_secs(10);

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// What happened to a play request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Handed to the worker
    Dispatched,
    /// Another sound holds the gate; request dropped
    Busy,
    /// The worker thread is gone; request dropped
    WorkerUnavailable,
    /// The rule has no sound enabled for this player
    Disabled,
}

struct PlaybackJob {
    request: SoundRequest,
    guard: GateGuard,
}

/// Handle for requesting sounds. Cheap to clone; all clones share one gate and one worker.
#[derive(Clone)]
pub struct SoundPlayer {
    gate: PlaybackGate,
    jobs: mpsc::Sender<PlaybackJob>,
}

impl SoundPlayer {
    /// Start the playback worker.
    pub fn spawn(gate: PlaybackGate, backend: Arc<dyn AudioBackend>, assets: SoundAssets) -> io::Result<Self> {
        Self::spawn_with_ceiling(gate, backend, assets, PLAYBACK_CEILING)
    }

    pub(crate) fn spawn_with_ceiling(
        gate: PlaybackGate,
        backend: Arc<dyn AudioBackend>,
        assets: SoundAssets,
        ceiling: Duration,
    ) -> io::Result<Self> {
        let (jobs, rx) = mpsc::channel(1);
        let worker = PlaybackWorker {
            backend,
            assets,
            ceiling,
        };
        thread::Builder::new()
            .name("doorbell-audio".to_string())
            .spawn(move || worker.run(rx))?;
        Ok(Self { gate, jobs })
    }

    /// Request playback. Returns immediately; the sound plays on the worker.
    pub fn play(&self, request: SoundRequest) -> PlayOutcome {
        let Some(guard) = self.gate.try_acquire() else {
            log::debug!("[Doorbell] Sound is already playing, skipping new sound request.");
            return PlayOutcome::Busy;
        };

        // The slot is free whenever the gate was free, so only a dead worker refuses.
        match self.jobs.try_send(PlaybackJob { request, guard }) {
            Ok(()) => PlayOutcome::Dispatched,
            Err(err) => {
                log::error!("[Doorbell] Playback worker unavailable: {}", err);
                PlayOutcome::WorkerUnavailable
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.gate.is_playing()
    }
}

struct PlaybackWorker {
    backend: Arc<dyn AudioBackend>,
    assets: SoundAssets,
    ceiling: Duration,
}

impl PlaybackWorker {
    fn run(self, mut rx: mpsc::Receiver<PlaybackJob>) {
        while let Some(job) = rx.blocking_recv() {
            // The guard travels inside the job, so unwinding releases the gate too.
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.handle(job))) {
                log::error!("[Doorbell] Sound playback panicked: {}", panic_message(&*payload));
            }
        }
        log::debug!("[Doorbell] Playback worker stopped.");
    }

    fn handle(&self, job: PlaybackJob) {
        // Declared first so it is released last, after the device is gone.
        let _guard = job.guard;
        let request = job.request;

        let source = match SoundSource::resolve(&request, &self.assets) {
            Ok(source) => source,
            Err(err) => {
                log::warn!("[Doorbell] {}", err);
                return;
            }
        };

        if let Err(err) = self.play_to_end(&source, request.effective_volume()) {
            log::error!("[Doorbell] Caught error during sound playback: {:?}", err);
        }
    }

    fn play_to_end(&self, source: &SoundSource, volume: f32) -> Result<(), AlertError> {
        let mut device = self.backend.open(source, volume)?;
        device.play()?;

        if !wait_until_stopped(device.as_ref(), self.ceiling) {
            log::warn!(
                "[Doorbell] {} did not stop within {:?}, releasing it",
                source.describe(),
                self.ceiling
            );
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn wait_until_stopped(device: &dyn OutputDevice, ceiling: Duration) -> bool {
    let deadline = Instant::now() + ceiling;
    while !device.is_stopped() {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(STOP_POLL_INTERVAL.min(deadline - now));
    }
    true
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backend for exercising the gate without an audio device.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy)]
    pub enum Behavior {
        /// Reports stopped after the given time
        FinishAfter(Duration),
        /// Never reports stopped
        Hang,
        /// `open` fails
        FailOpen,
        /// `open` panics
        PanicOpen,
    }

    #[derive(Default)]
    pub struct Counters {
        pub opened: AtomicUsize,
        pub active: AtomicUsize,
        pub max_active: AtomicUsize,
        pub released: AtomicUsize,
    }

    pub struct ScriptedBackend {
        pub behavior: Behavior,
        pub counters: Arc<Counters>,
        pub opened_with: Mutex<Vec<(SoundSource, f32)>>,
    }

    impl ScriptedBackend {
        pub fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                counters: Arc::new(Counters::default()),
                opened_with: Mutex::new(Vec::new()),
            })
        }
    }

    impl AudioBackend for ScriptedBackend {
        fn open(&self, source: &SoundSource, volume: f32) -> Result<Box<dyn OutputDevice>, AlertError> {
            self.opened_with.lock().unwrap().push((source.clone(), volume));
            match self.behavior {
                Behavior::FailOpen => return Err(AlertError::Device("scripted failure".to_string())),
                Behavior::PanicOpen => panic!("decoder blew up on {}", source.describe()),
                _ => {}
            }
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_active.fetch_max(active, Ordering::SeqCst);
            Ok(Box::new(ScriptedDevice {
                behavior: self.behavior,
                started: None,
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    struct ScriptedDevice {
        behavior: Behavior,
        started: Option<Instant>,
        counters: Arc<Counters>,
    }

    impl OutputDevice for ScriptedDevice {
        fn play(&mut self) -> Result<(), AlertError> {
            self.started = Some(Instant::now());
            Ok(())
        }

        fn is_stopped(&self) -> bool {
            match (self.behavior, self.started) {
                (Behavior::FinishAfter(length), Some(started)) => started.elapsed() >= length,
                _ => false,
            }
        }
    }

    impl Drop for ScriptedDevice {
        fn drop(&mut self) {
            self.counters.active.fetch_sub(1, Ordering::SeqCst);
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Poll until the gate is free or `limit` passes.
    pub fn wait_for_release(player: &SoundPlayer, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while player.is_playing() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }
}
