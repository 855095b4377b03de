//! Game simulation modules

pub mod ai;
pub mod combat;
pub mod geometry;
pub mod hazard;
pub mod loot;
pub mod r#match;
pub mod pathing;
pub mod ship;
pub mod simulation;
pub mod snapshot;
pub mod world;
pub mod zone;

pub use r#match::{GameMatch, MatchCommand, MatchHandle, MatchRegistry, Outbox};
pub use world::{default_obstacles, load_obstacles, Obstacles};
