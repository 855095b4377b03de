//! Floating pickups

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ship::{Ship, MAX_MINES, MAX_TORPEDOES};

/// Ship-to-loot distance at which a pickup happens
pub const PICKUP_RADIUS: f32 = 34.0;
pub const HEAL_AMOUNT: f32 = 3.0;
pub const RESUPPLY_AMOUNT: u32 = 2;
/// Duration of speed and fire-rate buffs (seconds)
pub const BUFF_DURATION: f32 = 8.0;

/// Loot scattered when the match starts
pub const INITIAL_LOOT: usize = 14;
/// Cap on concurrently floating loot from periodic spawning
pub const MAX_LOOT: usize = 24;
/// Seconds between periodic spawns
pub const LOOT_SPAWN_INTERVAL: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LootKind {
    Torpedo,
    Mine,
    Heal,
    SpeedBuff,
    FireRateBuff,
}

impl LootKind {
    const ALL: [LootKind; 5] = [
        LootKind::Torpedo,
        LootKind::Mine,
        LootKind::Heal,
        LootKind::SpeedBuff,
        LootKind::FireRateBuff,
    ];

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loot {
    pub id: u32,
    pub pos: Vec2,
    pub kind: LootKind,
}

impl Loot {
    pub fn in_reach(&self, ship_pos: Vec2) -> bool {
        self.pos.distance_squared(ship_pos) <= PICKUP_RADIUS * PICKUP_RADIUS
    }
}

/// Apply a pickup's effect to the ship that collected it
pub fn apply_pickup(ship: &mut Ship, kind: LootKind) {
    match kind {
        LootKind::Torpedo => {
            ship.torpedoes = (ship.torpedoes + RESUPPLY_AMOUNT).min(MAX_TORPEDOES);
        }
        LootKind::Mine => {
            ship.mines = (ship.mines + RESUPPLY_AMOUNT).min(MAX_MINES);
        }
        LootKind::Heal => ship.heal(HEAL_AMOUNT),
        LootKind::SpeedBuff => ship.speed_buff = BUFF_DURATION,
        LootKind::FireRateBuff => ship.fire_buff = BUFF_DURATION,
    }
}
