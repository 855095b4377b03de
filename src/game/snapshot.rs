//! Snapshot building and per-receiver framing

use std::sync::Arc;

use glam::Vec2;
use tracing::warn;

use crate::ws::protocol::{
    BlastState, HazardState, LootState, ProjectileState, ProjectileTag, ServerMsg, ShipState, StateSnapshot,
    ZoneState,
};

use super::combat::{Killer, ProjectileKind};
use super::geometry::normalize_angle;
use super::hazard::Hazard;
use super::ship::ShipArena;
use super::simulation::{SimEvent, Simulation, SoundEvent};
use super::zone::Zone;

/// Sounds are inaudible beyond this distance from the listener
pub const HEARING_RADIUS: f32 = 900.0;

pub fn quantize(v: Vec2) -> (i32, i32) {
    (v.x.round() as i32, v.y.round() as i32)
}

/// Angle in centiradians, wrapped to (-π, π]
pub fn centiradians(angle: f32) -> i16 {
    (normalize_angle(angle) * 100.0).round() as i16
}

pub fn hp_tenths(hp: f32) -> u8 {
    (hp * 10.0).round().clamp(0.0, 100.0) as u8
}

pub fn hazard_state(hazard: &Hazard) -> HazardState {
    let (x, y) = quantize(hazard.pos);
    HazardState {
        id: hazard.id,
        x,
        y,
        h: centiradians(hazard.heading),
        r: hazard.radius.round() as u16,
    }
}

fn zone_state(zone: &Zone) -> ZoneState {
    let (x, y) = quantize(zone.center);
    let (tx, ty) = quantize(zone.target_center);
    ZoneState {
        x,
        y,
        r: zone.radius.max(0.0).round() as u32,
        tx,
        ty,
        tr: zone.target_radius.max(0.0).round() as u32,
        phase: zone.phase as u8,
        shrinking: zone.is_shrinking(),
        timer: zone.timer().ceil() as u32,
    }
}

/// Builds the once-per-tick state frame
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&self, sim: &Simulation) -> StateSnapshot {
        let ships = sim
            .ships
            .iter()
            .map(|s| {
                let (x, y) = quantize(s.pos);
                ShipState {
                    slot: s.slot,
                    x,
                    y,
                    h: centiradians(s.heading),
                    hp: hp_tenths(s.hp),
                    alive: s.alive,
                    ai: !s.is_human(),
                    torpedoes: s.torpedoes.min(u8::MAX as u32) as u8,
                    mines: s.mines.min(u8::MAX as u32) as u8,
                    speed_buff: s.speed_buff > 0.0,
                    fire_buff: s.fire_buff > 0.0,
                }
            })
            .collect();

        let projectiles = sim
            .projectiles
            .iter()
            .map(|p| {
                let (x, y) = quantize(p.pos);
                let kind = match p.kind {
                    ProjectileKind::Cannonball => ProjectileTag::Cannonball,
                    ProjectileKind::Torpedo { .. } => ProjectileTag::Torpedo,
                    ProjectileKind::Mine { .. } => ProjectileTag::Mine,
                };
                ProjectileState {
                    id: p.id,
                    kind,
                    x,
                    y,
                    h: centiradians(p.heading),
                    armed: p.is_armed(),
                }
            })
            .collect();

        let blasts = sim
            .blasts
            .iter()
            .map(|b| {
                let (x, y) = quantize(b.pos);
                BlastState {
                    x,
                    y,
                    r: b.radius.round() as u16,
                }
            })
            .collect();

        let loot = sim
            .loot
            .iter()
            .map(|l| {
                let (x, y) = quantize(l.pos);
                LootState {
                    id: l.id,
                    x,
                    y,
                    kind: l.kind,
                }
            })
            .collect();

        StateSnapshot {
            tick: sim.tick,
            time: sim.clock as u32,
            alive: sim.alive_count,
            ships,
            projectiles,
            blasts,
            loot,
            hazards: sim.hazards.iter().map(hazard_state).collect(),
            zone: zone_state(&sim.zone),
        }
    }

    /// Serialize once; the resulting frame is shared by every receiver
    pub fn encode(&mut self, msg: &ServerMsg) -> Option<Arc<str>> {
        match serde_json::to_string(msg) {
            Ok(text) => {
                self.stats.record(text.len());
                Some(Arc::from(text))
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize frame");
                None
            }
        }
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

/// Frame volume stats for debugging
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotStats {
    pub total_frames: u64,
    pub total_bytes: u64,
}

impl SnapshotStats {
    pub fn record(&mut self, bytes: usize) {
        self.total_frames += 1;
        self.total_bytes += bytes as u64;
    }

    pub fn avg_bytes(&self) -> u64 {
        self.total_bytes.checked_div(self.total_frames).unwrap_or(0)
    }
}

fn ship_label(ships: &ShipArena, slot: u8, receiver: Option<u8>) -> String {
    if receiver == Some(slot) {
        return "You".to_string();
    }
    ships
        .get(slot)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("Ship {slot}"))
}

/// Render an event for one receiver, substituting "You" for their own slot
pub fn personalize_event(event: &SimEvent, receiver: Option<u8>, ships: &ShipArena) -> ServerMsg {
    match event {
        SimEvent::Kill { killer, victim } => {
            let killer = match killer {
                Killer::Ship(slot) => ship_label(ships, *slot, receiver),
                Killer::Zone => "The zone".to_string(),
                Killer::Hazard => "Sea monster".to_string(),
                Killer::Own => "Own blast".to_string(),
            };
            ServerMsg::Kill {
                killer,
                victim: ship_label(ships, *victim, receiver),
            }
        }
        SimEvent::Info { text } => ServerMsg::Info { text: text.clone() },
    }
}

/// Linear falloff from 1 at the source to 0 at [`HEARING_RADIUS`];
/// `None` when out of earshot
pub fn attenuate(sound: &SoundEvent, listener: Vec2) -> Option<ServerMsg> {
    let dist = sound.pos.distance(listener);
    if !dist.is_finite() || dist >= HEARING_RADIUS {
        return None;
    }

    let (x, y) = quantize(sound.pos);
    let volume = ((1.0 - dist / HEARING_RADIUS) * 100.0).round() / 100.0;
    Some(ServerMsg::Sound {
        sound: sound.kind,
        volume,
        x,
        y,
    })
}
