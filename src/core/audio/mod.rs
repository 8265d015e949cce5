// Sound playback for alerts.
//
// Architecture:
// - source.rs: Picks base/override settings and resolves files, URLs and bundled defaults
// - gate.rs: Process-wide single-flight gate
// - backend.rs: Output device seam and the rodio implementation
// - player.rs: Gate check plus the playback worker

pub mod backend;
pub mod gate;
pub mod player;
pub mod source;
