//! Ship entity and the slot-indexed ship arena

use std::collections::VecDeque;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::combat::Attacker;
use super::world::MAX_SLOTS;

/// Hull points
pub const MAX_HP: f32 = 10.0;
/// Collision radius
pub const SHIP_RADIUS: f32 = 22.0;
/// Base top speed (units/s)
pub const MAX_SPEED: f32 = 110.0;
/// Velocity change rate toward the desired velocity (units/s²)
pub const ACCELERATION: f32 = 90.0;
/// Base turn rate (rad/s)
pub const TURN_RATE: f32 = 1.8;

pub const START_TORPEDOES: u32 = 2;
pub const START_MINES: u32 = 2;
pub const MAX_TORPEDOES: u32 = 6;
pub const MAX_MINES: u32 = 6;

/// Speed multiplier while the speed buff is active
pub const SPEED_BUFF_FACTOR: f32 = 1.4;
/// Cannon cooldown multiplier while the fire-rate buff is active
pub const FIRE_BUFF_FACTOR: f32 = 0.5;

/// Names for AI captains, indexed by slot
const AI_NAMES: [&str; MAX_SLOTS] = [
    "Blackbeard",
    "Anne Bonny",
    "Calico Jack",
    "Mary Read",
    "Barbarossa",
    "Grace O'Malley",
    "Henry Morgan",
    "Ching Shih",
    "Black Bart",
    "Stede Bonnet",
    "Edward Low",
    "Jean Lafitte",
];

pub fn ai_name(slot: u8) -> &'static str {
    AI_NAMES[slot as usize % MAX_SLOTS]
}

/// Who steers the ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlMode {
    Human,
    Ai,
}

/// Per-ship combat ledger (only advanced while human-controlled)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatStats {
    pub kills: u32,
    pub hits: u32,
    pub damage_dealt: f32,
    pub torpedoes_fired: u32,
    pub xp: u32,
}

/// Behavioral state for AI control
#[derive(Debug, Clone)]
pub struct AiState {
    pub wander_target: Option<Vec2>,
    pub wander_timer: f32,
    /// 0..1, higher engages from further out
    pub aggressiveness: f32,
    pub speed_mult: f32,
    /// +1 counter-clockwise orbit, -1 clockwise
    pub orbit_dir: f32,
}

impl AiState {
    pub fn roll<R: Rng>(rng: &mut R) -> Self {
        Self {
            wander_target: None,
            wander_timer: 0.0,
            aggressiveness: rng.gen_range(0.2..1.0),
            speed_mult: rng.gen_range(0.85..1.0),
            orbit_dir: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ship {
    pub slot: u8,
    pub name: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub heading: f32,
    pub hp: f32,
    pub alive: bool,
    pub control: ControlMode,

    // Resources
    pub torpedoes: u32,
    pub mines: u32,

    // Timers (seconds remaining)
    pub fire_cooldown: f32,
    pub torpedo_cooldown: f32,
    pub mine_cooldown: f32,
    pub speed_buff: f32,
    pub fire_buff: f32,
    pub stuck_time: f32,
    /// Nearest the ship has come to its current waypoint
    pub closest_approach: f32,

    pub stats: CombatStats,
    pub last_attacker: Option<Attacker>,
    pub placement: Option<u32>,
    pub eliminated_at: Option<f32>,

    /// Human navigation queue
    pub waypoints: VecDeque<Vec2>,
    /// Manual launches requested since the last tick
    pub torpedo_requested: bool,
    pub mine_requested: bool,
    pub ai: AiState,
}

impl Ship {
    pub fn new<R: Rng>(slot: u8, name: String, control: ControlMode, pos: Vec2, rng: &mut R) -> Self {
        Self {
            slot,
            name,
            pos,
            vel: Vec2::ZERO,
            heading: rng.gen_range(0.0..TAU),
            hp: MAX_HP,
            alive: true,
            control,
            torpedoes: START_TORPEDOES,
            mines: START_MINES,
            fire_cooldown: 0.0,
            torpedo_cooldown: 0.0,
            mine_cooldown: 0.0,
            speed_buff: 0.0,
            fire_buff: 0.0,
            stuck_time: 0.0,
            closest_approach: f32::INFINITY,
            stats: CombatStats::default(),
            last_attacker: None,
            placement: None,
            eliminated_at: None,
            waypoints: VecDeque::new(),
            torpedo_requested: false,
            mine_requested: false,
            ai: AiState::roll(rng),
        }
    }

    pub fn is_human(&self) -> bool {
        self.control == ControlMode::Human
    }

    /// Top speed including the buff and the AI's personal multiplier
    pub fn max_speed(&self) -> f32 {
        let buff = if self.speed_buff > 0.0 { SPEED_BUFF_FACTOR } else { 1.0 };
        let personal = match self.control {
            ControlMode::Human => 1.0,
            ControlMode::Ai => self.ai.speed_mult,
        };
        MAX_SPEED * buff * personal
    }

    pub fn cannon_cooldown(&self, base: f32) -> f32 {
        if self.fire_buff > 0.0 {
            base * FIRE_BUFF_FACTOR
        } else {
            base
        }
    }

    pub fn tick_timers(&mut self, dt: f32) {
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        self.torpedo_cooldown = (self.torpedo_cooldown - dt).max(0.0);
        self.mine_cooldown = (self.mine_cooldown - dt).max(0.0);
        self.speed_buff = (self.speed_buff - dt).max(0.0);
        self.fire_buff = (self.fire_buff - dt).max(0.0);
    }

    /// Hand the ship to the AI, clearing every trace of human steering
    pub fn take_over_by_ai<R: Rng>(&mut self, rng: &mut R) {
        self.control = ControlMode::Ai;
        self.waypoints.clear();
        self.torpedo_requested = false;
        self.mine_requested = false;
        self.stuck_time = 0.0;
        self.closest_approach = f32::INFINITY;
        self.ai = AiState::roll(rng);
    }

    pub fn heal(&mut self, amount: f32) {
        self.hp = (self.hp + amount).min(MAX_HP);
    }
}

/// Read-only copy of the fields other ships need for targeting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipView {
    pub slot: u8,
    pub pos: Vec2,
    pub hp: f32,
    pub alive: bool,
}

/// Closest living ship other than `slot`, with its distance
pub fn nearest_target(views: &[ShipView], slot: u8, pos: Vec2) -> Option<(ShipView, f32)> {
    views
        .iter()
        .filter(|v| v.alive && v.slot != slot)
        .map(|v| (*v, v.pos.distance(pos)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Fixed-capacity container of ships keyed by slot
#[derive(Debug, Clone, Default)]
pub struct ShipArena {
    ships: Vec<Ship>,
}

impl ShipArena {
    /// Build from ships sorted by slot; slots must be 0..len
    pub fn new(mut ships: Vec<Ship>) -> Self {
        ships.sort_by_key(|s| s.slot);
        ships.truncate(MAX_SLOTS);
        Self { ships }
    }

    pub fn get(&self, slot: u8) -> Option<&Ship> {
        self.ships.get(slot as usize)
    }

    pub fn get_mut(&mut self, slot: u8) -> Option<&mut Ship> {
        self.ships.get_mut(slot as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ship> {
        self.ships.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Ship> {
        self.ships.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn alive(&self) -> impl Iterator<Item = &Ship> {
        self.ships.iter().filter(|s| s.alive)
    }

    pub fn views(&self) -> Vec<ShipView> {
        self.ships
            .iter()
            .map(|s| ShipView {
                slot: s.slot,
                pos: s.pos,
                hp: s.hp,
                alive: s.alive,
            })
            .collect()
    }
}
