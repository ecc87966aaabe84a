//! Realtime order channel protocol
//!
//! Clients open one WebSocket, join rooms by sending [`ClientCommand`]s and
//! receive [`ServerEvent`]s for every room they are in. Frames are JSON text
//! of the form `{"event": <name>, "data": <payload>}`.

pub mod ws;

pub use ws::*;
