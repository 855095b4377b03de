//! HTTP surface: health, leaderboards and the WebSocket upgrade

pub mod routes;

pub use routes::build_router;
