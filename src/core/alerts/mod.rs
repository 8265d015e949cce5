// Alert module for house entry/exit notifications.
//
// Architecture:
// - model.rs: Per-trigger alert rules
// - chat.rs: Chat template formatting into rich text
// - engine.rs: Dispatches a trigger to chat and sound

pub mod chat;
pub mod engine;
pub mod model;
