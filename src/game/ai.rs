//! AI captains
//!
//! Behavior is picked fresh every tick by priority; the only memory an AI
//! ship carries is its wander point and the personality rolled in
//! [`AiState`](super::ship::AiState).

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use glam::Vec2;
use rand::Rng;

use super::combat::{MINE_DROP_RANGE, TORPEDO_MAX_RANGE, TORPEDO_MIN_RANGE};
use super::geometry::{angle_diff, has_line_of_sight, heading_of, safe_position};
use super::loot::Loot;
use super::ship::{nearest_target, Ship, ShipView, SHIP_RADIUS};
use super::world::Obstacle;
use super::zone::Zone;

/// HP at or below which an AI goes looking for supplies
pub const LOW_HP: f32 = 5.0;
pub const LOOT_SEEK_RANGE: f32 = 600.0;
pub const ENGAGE_RANGE: f32 = 550.0;
/// Engage regardless of temperament inside this distance
pub const CLOSE_RANGE: f32 = 220.0;
/// Preferred strafing distance
pub const ORBIT_RADIUS: f32 = 260.0;
pub const AGGRESSIVE_THRESHOLD: f32 = 0.5;

const WANDER_ARRIVE: f32 = 80.0;
const WANDER_SPREAD: f32 = 0.7;
const WANDER_THROTTLE: f32 = 0.7;

const TORPEDO_CHANCE: f64 = 0.35;
const MINE_CHANCE: f64 = 0.3;
/// Pause after a failed weapon roll (seconds)
const RETRY_DELAY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiBehavior {
    SeekLoot(Vec2),
    Engage { target: ShipView, dist: f32 },
    ReturnToZone,
    Wander,
}

/// What an AI ship wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiDecision {
    pub heading: f32,
    /// Fraction of top speed, 0..=1
    pub throttle: f32,
    pub torpedo: Option<ShipView>,
    pub mine: bool,
}

fn needs_supplies(ship: &Ship) -> bool {
    ship.hp <= LOW_HP || (ship.torpedoes == 0 && ship.mines == 0)
}

pub fn select_behavior(ship: &Ship, target: Option<(ShipView, f32)>, loot: &[Loot], zone: &Zone) -> AiBehavior {
    if needs_supplies(ship) {
        let nearest_loot = loot
            .iter()
            .map(|l| (l.pos, l.pos.distance(ship.pos)))
            .filter(|(_, d)| *d <= LOOT_SEEK_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((pos, loot_dist)) = nearest_loot {
            if target.map_or(true, |(_, d)| loot_dist < d) {
                return AiBehavior::SeekLoot(pos);
            }
        }
    }

    if let Some((target, dist)) = target {
        let aggressive = ship.ai.aggressiveness >= AGGRESSIVE_THRESHOLD;
        if dist <= ENGAGE_RANGE && (aggressive || dist <= CLOSE_RANGE) {
            return AiBehavior::Engage { target, dist };
        }
    }

    if !zone.contains(ship.pos) {
        return AiBehavior::ReturnToZone;
    }

    AiBehavior::Wander
}

/// Strafe heading: tangent at the orbit radius, angled in when far, out when close
pub fn orbit_heading(bearing: f32, dist: f32, orbit_dir: f32) -> f32 {
    let error = ((dist - ORBIT_RADIUS) / ORBIT_RADIUS).clamp(-1.0, 1.0);
    bearing + orbit_dir * FRAC_PI_2 - orbit_dir * error * FRAC_PI_4
}

fn wander_heading<R: Rng>(ship: &mut Ship, zone: &Zone, obstacles: &[Obstacle], dt: f32, rng: &mut R) -> f32 {
    ship.ai.wander_timer -= dt;

    let arrived = ship
        .ai
        .wander_target
        .map_or(true, |t| t.distance(ship.pos) <= WANDER_ARRIVE);

    if arrived || ship.ai.wander_timer <= 0.0 {
        let angle = rng.gen_range(0.0..TAU);
        let reach = rng.gen_range(0.0..=zone.radius * WANDER_SPREAD);
        let point = zone.center + Vec2::new(angle.cos(), angle.sin()) * reach;
        ship.ai.wander_target = Some(safe_position(point, obstacles, SHIP_RADIUS + 20.0));
        ship.ai.wander_timer = rng.gen_range(5.0..10.0);
    }

    let target = ship.ai.wander_target.unwrap_or(zone.center);
    heading_of(target - ship.pos)
}

/// Roll for a torpedo at a target in the launch band with a clear line
fn roll_torpedo<R: Rng>(ship: &mut Ship, target: Option<(ShipView, f32)>, obstacles: &[Obstacle], rng: &mut R) -> Option<ShipView> {
    if ship.torpedoes == 0 || ship.torpedo_cooldown > 0.0 {
        return None;
    }
    let (t, dist) = target?;
    if !(TORPEDO_MIN_RANGE..=TORPEDO_MAX_RANGE).contains(&dist) || !has_line_of_sight(ship.pos, t.pos, obstacles) {
        return None;
    }

    if rng.gen_bool(TORPEDO_CHANCE) {
        Some(t)
    } else {
        ship.torpedo_cooldown = RETRY_DELAY;
        None
    }
}

/// Roll for a mine when a pursuer is close astern
fn roll_mine<R: Rng>(ship: &mut Ship, target: Option<(ShipView, f32)>, rng: &mut R) -> bool {
    if ship.mines == 0 || ship.mine_cooldown > 0.0 {
        return false;
    }
    let Some((t, dist)) = target else {
        return false;
    };
    let astern = angle_diff(ship.heading, heading_of(t.pos - ship.pos)).abs() > FRAC_PI_2;
    if dist > MINE_DROP_RANGE || !astern {
        return false;
    }

    if rng.gen_bool(MINE_CHANCE) {
        true
    } else {
        ship.mine_cooldown = RETRY_DELAY;
        false
    }
}

pub fn think<R: Rng>(
    ship: &mut Ship,
    views: &[ShipView],
    loot: &[Loot],
    zone: &Zone,
    obstacles: &[Obstacle],
    dt: f32,
    rng: &mut R,
) -> AiDecision {
    let target = nearest_target(views, ship.slot, ship.pos);

    let (heading, throttle) = match select_behavior(ship, target, loot, zone) {
        AiBehavior::SeekLoot(pos) => (heading_of(pos - ship.pos), 1.0),
        AiBehavior::Engage { target, dist } => {
            let bearing = heading_of(target.pos - ship.pos);
            (orbit_heading(bearing, dist, ship.ai.orbit_dir), 1.0)
        }
        AiBehavior::ReturnToZone => (heading_of(zone.center - ship.pos), 1.0),
        AiBehavior::Wander => (wander_heading(ship, zone, obstacles, dt, rng), WANDER_THROTTLE),
    };

    let torpedo = roll_torpedo(ship, target, obstacles, rng);
    let mine = roll_mine(ship, target, rng);

    AiDecision {
        heading,
        throttle,
        torpedo,
        mine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::loot::LootKind;
    use crate::game::ship::ControlMode;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ai_ship(pos: Vec2) -> Ship {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut ship = Ship::new(0, "bot".into(), ControlMode::Ai, pos, &mut rng);
        ship.ai.aggressiveness = 0.9;
        ship
    }

    fn view(slot: u8, pos: Vec2) -> ShipView {
        ShipView { slot, pos, hp: 10.0, alive: true }
    }

    fn zone() -> Zone {
        Zone::new(Vec2::new(2000.0, 2000.0), 1000.0)
    }

    #[test]
    fn wounded_ship_prefers_closer_loot() {
        let mut ship = ai_ship(Vec2::new(2000.0, 2000.0));
        ship.hp = 3.0;
        let loot = [Loot { id: 1, pos: Vec2::new(2100.0, 2000.0), kind: LootKind::Heal }];
        let target = Some((view(1, Vec2::new(2400.0, 2000.0)), 400.0));

        let behavior = select_behavior(&ship, target, &loot, &zone());
        assert_eq!(behavior, AiBehavior::SeekLoot(Vec2::new(2100.0, 2000.0)));
    }

    #[test]
    fn healthy_aggressive_ship_engages() {
        let ship = ai_ship(Vec2::new(2000.0, 2000.0));
        let t = view(1, Vec2::new(2400.0, 2000.0));
        let behavior = select_behavior(&ship, Some((t, 400.0)), &[], &zone());
        assert!(matches!(behavior, AiBehavior::Engage { .. }));
    }

    #[test]
    fn timid_ship_only_engages_up_close() {
        let mut ship = ai_ship(Vec2::new(2000.0, 2000.0));
        ship.ai.aggressiveness = 0.2;
        let far = view(1, Vec2::new(2400.0, 2000.0));
        assert_eq!(select_behavior(&ship, Some((far, 400.0)), &[], &zone()), AiBehavior::Wander);

        let near = view(1, Vec2::new(2150.0, 2000.0));
        assert!(matches!(
            select_behavior(&ship, Some((near, 150.0)), &[], &zone()),
            AiBehavior::Engage { .. }
        ));
    }

    #[test]
    fn outside_zone_heads_home() {
        let ship = ai_ship(Vec2::new(3500.0, 2000.0));
        assert_eq!(select_behavior(&ship, None, &[], &zone()), AiBehavior::ReturnToZone);
    }

    #[test]
    fn orbit_is_tangent_at_preferred_radius() {
        let h = orbit_heading(0.0, ORBIT_RADIUS, 1.0);
        assert!((h - FRAC_PI_2).abs() < 1e-5);
        // Far away: cut in toward the target
        assert!(orbit_heading(0.0, ORBIT_RADIUS * 3.0, 1.0) < FRAC_PI_2);
        // Too close: veer out
        assert!(orbit_heading(0.0, 10.0, 1.0) > FRAC_PI_2);
    }

    #[test]
    fn wander_point_stays_inside_zone() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let zone = zone();
        let mut ship = ai_ship(zone.center);
        for _ in 0..50 {
            ship.ai.wander_timer = 0.0;
            wander_heading(&mut ship, &zone, &[], 1.0 / 30.0, &mut rng);
            let p = ship.ai.wander_target.unwrap();
            assert!(p.distance(zone.center) <= zone.radius * WANDER_SPREAD + 1e-3);
        }
    }

    #[test]
    fn empty_magazine_never_rolls_torpedo() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ship = ai_ship(Vec2::new(1000.0, 1000.0));
        ship.torpedoes = 0;
        let t = Some((view(1, Vec2::new(1400.0, 1000.0)), 400.0));
        for _ in 0..100 {
            assert!(roll_torpedo(&mut ship, t, &[], &mut rng).is_none());
        }
    }

    #[test]
    fn failed_roll_backs_off() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut ship = ai_ship(Vec2::new(1000.0, 1000.0));
        let t = Some((view(1, Vec2::new(1400.0, 1000.0)), 400.0));

        let mut fired = 0;
        for _ in 0..200 {
            ship.torpedo_cooldown = 0.0;
            if roll_torpedo(&mut ship, t, &[], &mut rng).is_some() {
                fired += 1;
            } else {
                assert_eq!(ship.torpedo_cooldown, RETRY_DELAY);
            }
        }
        assert!(fired > 0 && fired < 200);
    }
}
