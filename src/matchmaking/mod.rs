//! Matchmaking: routes new connections into waiting matches

pub mod service;

pub use service::{MatchmakingService, Seat};
