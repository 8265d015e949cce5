// Single-flight playback gate.
//
// One flag behind one mutex. A `GateGuard` exists only while the flag is set
// and clears it when dropped, so every exit path of a playback releases it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-wide "a sound is playing" gate. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct PlaybackGate {
    playing: Arc<Mutex<bool>>,
}

impl PlaybackGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or `None` when another playback holds it.
    pub fn try_acquire(&self) -> Option<GateGuard> {
        let mut playing = lock(&self.playing);
        if *playing {
            return None;
        }
        *playing = true;
        Some(GateGuard {
            playing: Arc::clone(&self.playing),
        })
    }

    pub fn is_playing(&self) -> bool {
        *lock(&self.playing)
    }
}

/// Proof of holding the gate; releases it on drop.
#[derive(Debug)]
pub struct GateGuard {
    playing: Arc<Mutex<bool>>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        *lock(&self.playing) = false;
    }
}

// A panic while holding the lock cannot leave the bool half-written.
fn lock(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_second_acquire_is_refused() {
        let gate = PlaybackGate::new();
        let guard = gate.try_acquire();
        assert!(guard.is_some());
        assert!(gate.is_playing());
        assert!(gate.try_acquire().is_none());

        drop(guard);
        assert!(!gate.is_playing());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let gate = PlaybackGate::new();
        let other = gate.clone();
        let _guard = gate.try_acquire().unwrap();
        assert!(other.is_playing());
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_exactly_one_racer_wins() {
        let gate = PlaybackGate::new();
        let barrier = Arc::new(Barrier::new(16));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = gate.clone();
                let barrier = Arc::clone(&barrier);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    barrier.wait();
                    if let Some(guard) = gate.try_acquire() {
                        winners.fetch_add(1, Ordering::SeqCst);
                        // Hold until every racer has tried.
                        thread::sleep(std::time::Duration::from_millis(300));
                        drop(guard);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(!gate.is_playing());
    }
}
