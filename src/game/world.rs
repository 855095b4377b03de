//! World bounds and the static obstacle layout

use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// World rectangle, origin at top-left
pub const WORLD_WIDTH: f32 = 4000.0;
pub const WORLD_HEIGHT: f32 = 4000.0;

/// Ships per match; slots are 0..MAX_SLOTS
pub const MAX_SLOTS: usize = 12;

/// Static circular obstacle (island, rock)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Obstacle {
    pub const fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// True if `point` lies within `radius + margin` of the center
    pub fn contains(&self, point: Vec2, margin: f32) -> bool {
        self.center().distance_squared(point) < (self.radius + margin).powi(2)
    }
}

/// Shared read-only obstacle list
pub type Obstacles = Arc<[Obstacle]>;

/// Built-in archipelago used when no layout file is configured
const DEFAULT_LAYOUT: [Obstacle; 13] = [
    Obstacle::new(700.0, 700.0, 120.0),
    Obstacle::new(3300.0, 700.0, 140.0),
    Obstacle::new(700.0, 3300.0, 130.0),
    Obstacle::new(3300.0, 3300.0, 120.0),
    Obstacle::new(2000.0, 900.0, 160.0),
    Obstacle::new(2000.0, 3100.0, 150.0),
    Obstacle::new(900.0, 2000.0, 140.0),
    Obstacle::new(3100.0, 2000.0, 160.0),
    Obstacle::new(1450.0, 1450.0, 90.0),
    Obstacle::new(2550.0, 1450.0, 100.0),
    Obstacle::new(1450.0, 2550.0, 100.0),
    Obstacle::new(2550.0, 2550.0, 90.0),
    Obstacle::new(1200.0, 3700.0, 80.0),
];

pub fn default_obstacles() -> Obstacles {
    Arc::from(DEFAULT_LAYOUT.to_vec())
}

/// Load an obstacle list from a JSON array of `{x, y, radius}`.
///
/// Entries with non-finite values or a non-positive radius are skipped;
/// centers are clamped into the world rectangle.
pub fn load_obstacles(path: &Path) -> Result<Obstacles, WorldError> {
    let raw = std::fs::read_to_string(path).map_err(WorldError::Read)?;
    parse_obstacles(&raw)
}

pub fn parse_obstacles(raw: &str) -> Result<Obstacles, WorldError> {
    let parsed: Vec<Obstacle> = serde_json::from_str(raw).map_err(WorldError::Parse)?;

    let obstacles: Vec<Obstacle> = parsed
        .into_iter()
        .filter(|o| o.x.is_finite() && o.y.is_finite() && o.radius.is_finite() && o.radius > 0.0)
        .map(|o| Obstacle {
            x: o.x.clamp(0.0, WORLD_WIDTH),
            y: o.y.clamp(0.0, WORLD_HEIGHT),
            radius: o.radius,
        })
        .collect();

    Ok(Arc::from(obstacles))
}

/// World configuration errors
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("Failed to read obstacle file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse obstacle file: {0}")]
    Parse(#[source] serde_json::Error),
}
