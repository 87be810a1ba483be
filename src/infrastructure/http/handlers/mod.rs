//! HTTP Handlers

mod analysis;
mod clarification;
mod ping;
mod task;
mod websocket;

pub use analysis::*;
pub use clarification::*;
pub use ping::*;
pub use task::*;
pub use websocket::*;
