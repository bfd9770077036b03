//! Client library for LLM Turing-test battles.
//!
//! * [`session`]: live game sessions reconstructed from the `/api/play`
//!   event stream.
//! * [`select`]: the type-to-filter model picker.
//! * [`client`]: HTTP client and SSE transport for the battle server.
//! * [`battle`] and [`render`]: past battles, leaderboards and terminal output.

pub mod api;
pub mod battle;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod render;
pub mod select;
pub mod session;
pub mod stream;

pub use client::{BattleClient, SseTransport};
pub use config::ClientConfig;
pub use error::BattleError;
pub use select::{SearchableSelect, SelectOption};
pub use session::{LiveSessionController, PlayRequest, SessionState, SessionStatus, SessionUpdate};
