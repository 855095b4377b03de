//! Authoritative per-match world and its fixed-step update

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::util::time::tick_delta;

use super::ai;
use super::combat::{
    drop_mine, launch_torpedo, try_cannon, Attacker, Blast, Killer, MatchOutcome, Projectile, ProjectileKind,
    TORPEDO_MAX_RANGE,
};
use super::geometry::{
    avoidance_force, blend_heading, clamp_to_world, direction, heading_of, resolve_circle_overlap, rotate_towards,
    safe_position,
};
use super::hazard::{Hazard, HAZARD_COUNT, HAZARD_DAMAGE_PER_SECOND};
use super::loot::{apply_pickup, Loot, LootKind, INITIAL_LOOT, LOOT_SPAWN_INTERVAL, MAX_LOOT};
use super::pathing::{enqueue_waypoints, plan_path};
use super::ship::{ai_name, nearest_target, ControlMode, Ship, ShipArena, ACCELERATION, SHIP_RADIUS, TURN_RATE};
use super::world::{Obstacle, Obstacles, MAX_SLOTS, WORLD_HEIGHT, WORLD_WIDTH};
use super::zone::{Zone, ZoneTransition, INITIAL_ZONE_RADIUS};

/// Minimum spacing between spawn points
pub const SPAWN_SEPARATION: f32 = 300.0;
const SPAWN_ATTEMPTS: usize = 40;

// Human waypoint following
/// Waypoint counts as reached inside this distance
pub const ARRIVE_RADIUS: f32 = 25.0;
/// Final-approach distance over which the ship slows down
pub const APPROACH_DISTANCE: f32 = 150.0;
const MIN_APPROACH_THROTTLE: f32 = 0.15;
/// Closing speed on the pending waypoint below which the ship counts as stuck
pub const STUCK_SPEED: f32 = 5.0;
pub const STUCK_TIMEOUT: f32 = 3.0;
/// Exponential velocity decay with nothing to steer toward (1/s)
const IDLE_DECAY: f32 = 1.5;
/// Avoidance nudge speed while idle
const IDLE_NUDGE: f32 = 40.0;

/// Discrete, per-player personalized event
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Kill { killer: Killer, victim: u8 },
    Info { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundKind {
    Cannon,
    Hit,
    Splash,
    Torpedo,
    Explosion,
    MineDrop,
    Pickup,
    Sink,
}

/// Positional sound, attenuated per listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundEvent {
    pub kind: SoundKind,
    pub pos: Vec2,
}

pub struct Simulation {
    pub ships: ShipArena,
    pub projectiles: Vec<Projectile>,
    pub blasts: Vec<Blast>,
    pub loot: Vec<Loot>,
    pub hazards: Vec<Hazard>,
    pub zone: Zone,
    pub obstacles: Obstacles,
    pub tick: u64,
    /// Simulated seconds since start
    pub clock: f32,
    pub alive_count: u32,
    /// Cleared at the start of every tick
    pub events: Vec<SimEvent>,
    pub sounds: Vec<SoundEvent>,
    pub(super) rng: ChaCha8Rng,
    pub(super) outcome: Option<MatchOutcome>,
    pub(super) ended: bool,
    next_entity_id: u32,
    loot_timer: f32,
}

impl Simulation {
    /// Build a full roster: listed human slots, AI everywhere else
    pub fn new(seed: u64, obstacles: Obstacles, humans: &[(u8, String)]) -> Self {
        let center = Vec2::new(WORLD_WIDTH / 2.0, WORLD_HEIGHT / 2.0);
        let mut sim = Self {
            ships: ShipArena::default(),
            projectiles: Vec::new(),
            blasts: Vec::new(),
            loot: Vec::new(),
            hazards: Vec::new(),
            zone: Zone::new(center, INITIAL_ZONE_RADIUS),
            obstacles,
            tick: 0,
            clock: 0.0,
            alive_count: 0,
            events: Vec::new(),
            sounds: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            outcome: None,
            ended: false,
            next_entity_id: 1,
            loot_timer: LOOT_SPAWN_INTERVAL,
        };

        let mut ships = Vec::with_capacity(MAX_SLOTS);
        let mut placed: Vec<Vec2> = Vec::with_capacity(MAX_SLOTS);
        for slot in 0..MAX_SLOTS as u8 {
            let (name, control) = match humans.iter().find(|(s, _)| *s == slot) {
                Some((_, name)) => (name.clone(), ControlMode::Human),
                None => (ai_name(slot).to_string(), ControlMode::Ai),
            };
            let pos = sim.spawn_point(&placed);
            placed.push(pos);
            ships.push(Ship::new(slot, name, control, pos, &mut sim.rng));
        }
        sim.ships = ShipArena::new(ships);
        sim.alive_count = sim.ships.len() as u32;

        for _ in 0..INITIAL_LOOT {
            let pos = sim.random_point_in_zone(0.8);
            let kind = LootKind::random(&mut sim.rng);
            sim.drop_loot(pos, kind);
        }
        for _ in 0..HAZARD_COUNT {
            let pos = sim.random_point_in_zone(0.6);
            let id = sim.next_id();
            sim.hazards.push(Hazard::spawn(id, pos, &mut sim.rng));
        }

        sim
    }

    pub(super) fn next_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id = self.next_entity_id.wrapping_add(1);
        id
    }

    pub(super) fn sound(&mut self, kind: SoundKind, pos: Vec2) {
        self.sounds.push(SoundEvent { kind, pos });
    }

    fn info(&mut self, text: impl Into<String>) {
        self.events.push(SimEvent::Info { text: text.into() });
    }

    /// Uniform point inside `spread` of the zone radius, pushed clear of obstacles
    fn random_point_in_zone(&mut self, spread: f32) -> Vec2 {
        let angle = self.rng.gen_range(0.0..TAU);
        let reach = self.zone.radius * spread * self.rng.gen::<f32>().sqrt();
        let p = self.zone.center + direction(angle) * reach;
        safe_position(p, &self.obstacles, SHIP_RADIUS + 30.0)
    }

    fn spawn_point(&mut self, placed: &[Vec2]) -> Vec2 {
        let mut candidate = self.random_point_in_zone(0.8);
        for _ in 0..SPAWN_ATTEMPTS {
            if placed.iter().all(|p| p.distance(candidate) >= SPAWN_SEPARATION) {
                break;
            }
            candidate = self.random_point_in_zone(0.8);
        }
        candidate
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Hand the terminal summary to the caller; `None` until the match ends
    pub fn take_outcome(&mut self) -> Option<MatchOutcome> {
        self.outcome.take()
    }

    /// Slots still steered by a connected human
    pub fn human_slots(&self) -> Vec<u8> {
        self.ships.iter().filter(|s| s.is_human()).map(|s| s.slot).collect()
    }

    /// Convert a human ship to AI control (owner disconnected)
    pub fn take_over(&mut self, slot: u8) {
        let Some(ship) = self.ships.get_mut(slot) else {
            return;
        };
        if !ship.is_human() {
            return;
        }
        ship.take_over_by_ai(&mut self.rng);
        self.check_end_of_match();
    }

    /// Plan a route to `target` and append it to the ship's queue
    pub fn queue_waypoint(&mut self, slot: u8, target: Vec2) {
        let Some(ship) = self.ships.get_mut(slot).filter(|s| s.alive && s.is_human()) else {
            return;
        };
        if target.is_nan() {
            return;
        }

        // Infinite coordinates clamp to the edge like any other out-of-range click
        let target = safe_position(clamp_to_world(target, SHIP_RADIUS), &self.obstacles, SHIP_RADIUS);
        let from = ship.waypoints.back().copied().unwrap_or(ship.pos);
        let planned = plan_path(from, target, &self.obstacles);
        enqueue_waypoints(&mut ship.waypoints, planned);
    }

    pub fn request_torpedo(&mut self, slot: u8) {
        if let Some(ship) = self.ships.get_mut(slot).filter(|s| s.alive && s.is_human()) {
            ship.torpedo_requested = true;
        }
    }

    pub fn request_mine(&mut self, slot: u8) {
        if let Some(ship) = self.ships.get_mut(slot).filter(|s| s.alive && s.is_human()) {
            ship.mine_requested = true;
        }
    }

    /// Advance one fixed tick
    pub fn step(&mut self) {
        self.step_dt(tick_delta());
    }

    pub fn step_dt(&mut self, dt: f32) {
        self.events.clear();
        self.sounds.clear();
        if self.ended {
            return;
        }

        self.tick += 1;
        self.clock += dt;

        for ship in self.ships.iter_mut() {
            ship.tick_timers(dt);
        }

        self.update_ships(dt);
        self.separate_ships();
        self.update_projectiles(dt);
        self.update_blasts(dt);
        self.update_hazards(dt);
        self.update_zone(dt);
        self.collect_loot();
        self.spawn_loot(dt);
    }

    fn update_ships(&mut self, dt: f32) {
        let views = self.ships.views();
        let mut launched = Vec::new();

        for ship in self.ships.iter_mut().filter(|s| s.alive) {
            match ship.control {
                ControlMode::Ai => {
                    let decision = ai::think(ship, &views, &self.loot, &self.zone, &self.obstacles, dt, &mut self.rng);
                    drive(ship, decision.heading, decision.throttle, 1.0, &self.obstacles, dt);
                    if let Some(target) = decision.torpedo {
                        launched.extend(launch_torpedo(ship, Some(target)));
                    }
                    if decision.mine {
                        launched.extend(drop_mine(ship));
                    }
                }
                ControlMode::Human => {
                    steer_human(ship, &self.obstacles, dt);
                    if std::mem::take(&mut ship.torpedo_requested) {
                        let target = nearest_target(&views, ship.slot, ship.pos)
                            .filter(|(_, d)| *d <= TORPEDO_MAX_RANGE)
                            .map(|(t, _)| t);
                        launched.extend(launch_torpedo(ship, target));
                    }
                    if std::mem::take(&mut ship.mine_requested) {
                        launched.extend(drop_mine(ship));
                    }
                }
            }

            launched.extend(try_cannon(ship, &views, &self.obstacles));
        }

        for projectile in launched {
            self.spawn_projectile(projectile);
        }
    }

    fn spawn_projectile(&mut self, mut projectile: Projectile) {
        projectile.id = self.next_id();
        let kind = match projectile.kind {
            ProjectileKind::Cannonball => SoundKind::Cannon,
            ProjectileKind::Torpedo { .. } => SoundKind::Torpedo,
            ProjectileKind::Mine { .. } => SoundKind::MineDrop,
        };
        self.sound(kind, projectile.pos);
        self.projectiles.push(projectile);
    }

    fn separate_ships(&mut self) {
        let n = self.ships.len() as u8;
        for i in 0..n {
            for j in (i + 1)..n {
                let (Some(a), Some(b)) = (self.ships.get(i), self.ships.get(j)) else {
                    continue;
                };
                if !a.alive || !b.alive {
                    continue;
                }
                let Some((pa, pb)) = resolve_circle_overlap(a.pos, SHIP_RADIUS, b.pos, SHIP_RADIUS) else {
                    continue;
                };
                if let Some(a) = self.ships.get_mut(i) {
                    a.pos = safe_position(pa, &self.obstacles, SHIP_RADIUS);
                }
                if let Some(b) = self.ships.get_mut(j) {
                    b.pos = safe_position(pb, &self.obstacles, SHIP_RADIUS);
                }
            }
        }
    }

    fn update_hazards(&mut self, dt: f32) {
        for hazard in &mut self.hazards {
            hazard.update(dt, &self.obstacles, &mut self.rng);
        }

        let touched: Vec<u8> = self
            .ships
            .alive()
            .filter(|s| self.hazards.iter().any(|h| h.touches(s.pos, SHIP_RADIUS)))
            .map(|s| s.slot)
            .collect();
        for slot in touched {
            self.damage_ship(slot, HAZARD_DAMAGE_PER_SECOND * dt, Attacker::Hazard);
        }
    }

    fn update_zone(&mut self, dt: f32) {
        match self.zone.update(dt, &mut self.rng) {
            Some(ZoneTransition::ShrinkStarted { .. }) => self.info("The safe zone is shrinking!"),
            Some(ZoneTransition::ShrinkFinished { .. }) => self.info("The safe zone has stabilized"),
            None => {}
        }

        let damage = self.zone.damage_per_second * dt;
        let outside: Vec<u8> = self
            .ships
            .alive()
            .filter(|s| !self.zone.contains(s.pos))
            .map(|s| s.slot)
            .collect();
        for slot in outside {
            self.damage_ship(slot, damage, Attacker::Zone);
        }
    }

    fn collect_loot(&mut self) {
        let mut picked = Vec::new();
        for ship in self.ships.iter_mut().filter(|s| s.alive) {
            while let Some(idx) = self.loot.iter().position(|l| l.in_reach(ship.pos)) {
                let loot = self.loot.swap_remove(idx);
                apply_pickup(ship, loot.kind);
                picked.push(loot.pos);
            }
        }
        for pos in picked {
            self.sound(SoundKind::Pickup, pos);
        }
    }

    fn spawn_loot(&mut self, dt: f32) {
        self.loot_timer -= dt;
        if self.loot_timer > 0.0 {
            return;
        }
        self.loot_timer = LOOT_SPAWN_INTERVAL;
        if self.loot.len() < MAX_LOOT {
            let pos = self.random_point_in_zone(0.8);
            let kind = LootKind::random(&mut self.rng);
            self.drop_loot(pos, kind);
        }
    }
}

/// Blend avoidance into `desired`, turn, accelerate and move
fn drive(ship: &mut Ship, desired: f32, throttle: f32, turn_scale: f32, obstacles: &[Obstacle], dt: f32) {
    let goal = blend_heading(desired, avoidance_force(ship.pos, obstacles));
    ship.heading = rotate_towards(ship.heading, goal, TURN_RATE * turn_scale * dt);

    let wanted = direction(ship.heading) * ship.max_speed() * throttle.clamp(0.0, 1.0);
    ship.vel += (wanted - ship.vel).clamp_length_max(ACCELERATION * dt);
    let moved = ship.pos + ship.vel * dt;
    ship.pos = safe_position(moved, obstacles, SHIP_RADIUS);

    // Pushed out of a rock: drop the velocity component still pointing into it
    let normal = (ship.pos - moved).normalize_or_zero();
    let into = ship.vel.dot(normal);
    if into < 0.0 {
        ship.vel -= normal * into;
    }
}

/// Follow the head of the waypoint queue
fn steer_human(ship: &mut Ship, obstacles: &[Obstacle], dt: f32) {
    let Some(&waypoint) = ship.waypoints.front() else {
        ship.stuck_time = 0.0;
        ship.closest_approach = f32::INFINITY;
        ship.vel *= (-IDLE_DECAY * dt).exp();
        let nudge = avoidance_force(ship.pos, obstacles) * IDLE_NUDGE;
        ship.pos += (ship.vel + nudge) * dt;
        ship.pos = safe_position(ship.pos, obstacles, SHIP_RADIUS);
        return;
    };

    let dist = ship.pos.distance(waypoint);
    if dist <= ARRIVE_RADIUS {
        next_waypoint(ship);
        return;
    }

    let approach = (dist / APPROACH_DISTANCE).min(1.0);
    let throttle = if ship.waypoints.len() == 1 {
        (approach * approach).max(MIN_APPROACH_THROTTLE)
    } else {
        1.0
    };
    // Tighter turning close to the waypoint
    let turn_scale = 2.0 - approach;
    let desired = heading_of(waypoint - ship.pos);
    drive(ship, desired, throttle, turn_scale, obstacles, dt);

    // Progress is measured against the best distance so far; circling a rock
    // at full speed gets no closer and counts as stuck.
    let remaining = ship.pos.distance(waypoint);
    if remaining < ship.closest_approach - STUCK_SPEED * dt {
        ship.closest_approach = remaining;
        ship.stuck_time = 0.0;
    } else {
        ship.stuck_time += dt;
        if ship.stuck_time > STUCK_TIMEOUT {
            next_waypoint(ship);
        }
    }
}

fn next_waypoint(ship: &mut Ship) {
    ship.waypoints.pop_front();
    ship.stuck_time = 0.0;
    ship.closest_approach = f32::INFINITY;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::{placement_bonus, WINNER_BONUS, XP_PER_HIT, XP_PER_KILL};
    use crate::game::ship::MAX_HP;
    use crate::game::world::default_obstacles;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn sim_with_humans(humans: &[u8]) -> Simulation {
        let roster: Vec<(u8, String)> = humans.iter().map(|s| (*s, format!("captain{s}"))).collect();
        Simulation::new(42, default_obstacles(), &roster)
    }

    fn sink(sim: &mut Simulation, slot: u8) {
        sim.damage_ship(slot, MAX_HP, Attacker::Zone);
    }

    #[test]
    fn new_match_fills_every_slot() {
        let sim = sim_with_humans(&[4]);
        assert_eq!(sim.ships.len(), MAX_SLOTS);
        assert_eq!(sim.alive_count, MAX_SLOTS as u32);
        assert_eq!(sim.human_slots(), vec![4]);
        assert_eq!(sim.ships.get(4).unwrap().name, "captain4");
        assert_eq!(sim.loot.len(), INITIAL_LOOT);
        assert_eq!(sim.hazards.len(), HAZARD_COUNT);

        for ship in sim.ships.iter() {
            assert!(sim.zone.contains(ship.pos));
            for o in sim.obstacles.iter() {
                assert!(ship.pos.distance(o.center()) >= o.radius);
            }
        }
    }

    #[test]
    fn same_seed_same_world() {
        let a = sim_with_humans(&[0]);
        let b = sim_with_humans(&[0]);
        let pa: Vec<Vec2> = a.ships.iter().map(|s| s.pos).collect();
        let pb: Vec<Vec2> = b.ships.iter().map(|s| s.pos).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn lethal_damage_decrements_alive_once() {
        let mut sim = sim_with_humans(&[0]);
        assert!(sim.damage_ship(3, MAX_HP + 5.0, Attacker::Zone));
        assert_eq!(sim.alive_count, 11);

        let ship = sim.ships.get(3).unwrap();
        assert!(!ship.alive);
        assert_eq!(ship.hp, 0.0);
        assert_eq!(ship.placement, Some(12));

        // Already dead: no-op
        assert!(!sim.damage_ship(3, 1.0, Attacker::Zone));
        assert_eq!(sim.alive_count, 11);
    }

    #[test]
    fn kill_event_names_zone_and_drops_loot() {
        let mut sim = sim_with_humans(&[0]);
        let before = sim.loot.len();
        sink(&mut sim, 5);
        assert_eq!(sim.events, vec![SimEvent::Kill { killer: Killer::Zone, victim: 5 }]);
        assert_eq!(sim.loot.len(), before + 1);
        assert!(sim.sounds.iter().any(|s| s.kind == SoundKind::Sink));
    }

    #[test]
    fn human_attacker_earns_xp_ai_does_not() {
        let mut sim = sim_with_humans(&[0]);
        sim.damage_ship(2, 1.0, Attacker::Ship(0));
        sim.damage_ship(2, MAX_HP, Attacker::Ship(0));
        let human = &sim.ships.get(0).unwrap().stats;
        assert_eq!(human.hits, 2);
        assert_eq!(human.kills, 1);
        assert_eq!(human.xp, 2 * XP_PER_HIT + XP_PER_KILL);

        sim.damage_ship(3, MAX_HP, Attacker::Ship(1));
        assert_eq!(sim.ships.get(1).unwrap().stats, Default::default());
    }

    #[test]
    fn self_kill_is_reported_as_own() {
        let mut sim = sim_with_humans(&[0]);
        sim.damage_ship(0, 1.0, Attacker::Ship(0));
        assert_eq!(sim.ships.get(0).unwrap().stats.hits, 0);
        sim.damage_ship(6, MAX_HP, Attacker::Ship(6));
        assert!(sim.events.contains(&SimEvent::Kill { killer: Killer::Own, victim: 6 }));
    }

    #[test]
    fn last_ship_standing_wins_once() {
        let mut sim = sim_with_humans(&[0]);
        for slot in 1..MAX_SLOTS as u8 {
            sink(&mut sim, slot);
        }
        assert!(sim.is_ended());
        assert_eq!(sim.alive_count, 1);

        let outcome = sim.take_outcome().expect("outcome recorded");
        assert_eq!(outcome.winner, Some(0));
        assert_eq!(outcome.results.len(), 1);
        let result = &outcome.results[0];
        assert!(result.won);
        assert_eq!(result.placement, 1);
        assert_eq!(result.xp, placement_bonus(1) + WINNER_BONUS);

        // Idempotent: a second check produces nothing new
        sim.check_end_of_match();
        assert!(sim.take_outcome().is_none());
    }

    #[test]
    fn all_humans_dead_ends_with_ai_alive() {
        let mut sim = sim_with_humans(&[0, 1]);
        sink(&mut sim, 0);
        assert!(!sim.is_ended());
        sink(&mut sim, 1);
        assert!(sim.is_ended());
        assert_eq!(sim.alive_count, 10);

        let outcome = sim.take_outcome().unwrap();
        assert_eq!(outcome.winner, None);
        let placements: Vec<u32> = outcome.results.iter().map(|r| r.placement).collect();
        assert_eq!(placements, vec![12, 11]);
    }

    #[test]
    fn no_damage_after_match_end() {
        let mut sim = sim_with_humans(&[0]);
        sink(&mut sim, 0);
        assert!(sim.is_ended());
        assert!(!sim.damage_ship(4, MAX_HP, Attacker::Zone));
        assert_eq!(sim.alive_count, 11);
    }

    #[test]
    fn disconnect_hands_ship_to_ai_without_ending() {
        let mut sim = sim_with_humans(&[7]);
        sim.queue_waypoint(7, Vec2::new(100.0, 100.0));
        sim.take_over(7);

        let ship = sim.ships.get(7).unwrap();
        assert!(ship.alive);
        assert_eq!(ship.control, ControlMode::Ai);
        assert!(ship.waypoints.is_empty());
        assert!(!sim.is_ended());

        for _ in 0..60 {
            sim.step();
        }
        assert!(!sim.is_ended() || sim.alive_count <= 1);
    }

    #[test]
    fn waypoint_requests_ignore_ai_and_dead_ships() {
        let mut sim = sim_with_humans(&[0]);
        sim.queue_waypoint(5, Vec2::new(100.0, 100.0));
        assert!(sim.ships.get(5).unwrap().waypoints.is_empty());

        sim.queue_waypoint(0, Vec2::new(f32::NAN, 3.0));
        assert!(sim.ships.get(0).unwrap().waypoints.is_empty());

        sim.queue_waypoint(0, Vec2::new(-500.0, 99999.0));
        let last = *sim.ships.get(0).unwrap().waypoints.back().unwrap();
        assert!(last.x >= 0.0 && last.y <= WORLD_HEIGHT);
    }

    #[test]
    fn human_ship_reaches_waypoint() {
        let mut sim = Simulation::new(3, Arc::from(Vec::<Obstacle>::new()), &[(0, "cap".into())]);
        let start = sim.ships.get(0).unwrap().pos;
        let goal = clamp_to_world(start + Vec2::new(300.0, 0.0), 100.0);
        sim.queue_waypoint(0, goal);

        for _ in 0..30 * 20 {
            if sim.ships.get(0).unwrap().waypoints.is_empty() {
                break;
            }
            sim.ships.get_mut(0).unwrap().hp = MAX_HP;
            sim.step();
        }
        assert!(sim.ships.get(0).unwrap().waypoints.is_empty());
    }

    #[test]
    fn infinite_waypoint_clamps_to_world_edge() {
        let mut sim = Simulation::new(3, Arc::from(Vec::<Obstacle>::new()), &[(0, "cap".into())]);
        sim.queue_waypoint(0, Vec2::new(f32::INFINITY, f32::NEG_INFINITY));
        let queued = &sim.ships.get(0).unwrap().waypoints;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0], Vec2::new(WORLD_WIDTH - SHIP_RADIUS, SHIP_RADIUS));
    }

    #[test]
    fn waypoint_inside_island_is_moved_to_its_shore() {
        let island = Obstacle::new(2000.0, 2000.0, 150.0);
        let mut sim = Simulation::new(5, Arc::from(vec![island]), &[(0, "cap".into())]);
        sim.queue_waypoint(0, island.center());

        let queued = &sim.ships.get(0).unwrap().waypoints;
        assert!(!queued.is_empty());
        for p in queued {
            assert!(p.distance(island.center()) >= island.radius + SHIP_RADIUS - 0.5);
        }
    }

    fn lone_ship(pos: Vec2, heading: f32) -> Ship {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ship = Ship::new(0, "cap".into(), ControlMode::Human, pos, &mut rng);
        ship.heading = heading;
        ship
    }

    #[test]
    fn unreachable_waypoint_is_dropped_when_stuck() {
        let island = [Obstacle::new(2000.0, 2000.0, 150.0)];
        let mut ship = lone_ship(Vec2::new(1700.0, 2000.0), 0.0);
        // Straight into the rock, bypassing the planner
        ship.waypoints.push_back(island[0].center());

        let dt = tick_delta();
        let mut elapsed = 0.0;
        while !ship.waypoints.is_empty() && elapsed < 20.0 {
            steer_human(&mut ship, &island, dt);
            elapsed += dt;
        }

        assert!(ship.waypoints.is_empty(), "still queued after {elapsed}s");
        assert!(elapsed > STUCK_TIMEOUT);
        assert!(ship.pos.distance(island[0].center()) >= island[0].radius);
        assert_eq!(ship.stuck_time, 0.0);
    }

    #[test]
    fn progress_keeps_the_stuck_timer_at_zero() {
        let mut ship = lone_ship(Vec2::new(1000.0, 1000.0), 0.0);
        ship.waypoints.push_back(Vec2::new(1600.0, 1000.0));

        for _ in 0..60 {
            steer_human(&mut ship, &[], tick_delta());
        }
        assert_eq!(ship.waypoints.len(), 1);
        assert!(ship.stuck_time < 0.1);
    }

    #[test]
    fn final_waypoint_is_approached_slowly() {
        let run = |targets: &[Vec2]| {
            let mut ship = lone_ship(Vec2::new(1000.0, 1000.0), 0.0);
            ship.waypoints.extend(targets.iter().copied());
            for _ in 0..30 {
                steer_human(&mut ship, &[], tick_delta());
            }
            ship.vel.length()
        };

        let far = run(&[Vec2::new(1600.0, 1000.0)]);
        let near = run(&[Vec2::new(1100.0, 1000.0)]);
        // Same near point, but not the last one in the queue
        let passing = run(&[Vec2::new(1100.0, 1000.0), Vec2::new(1600.0, 1000.0)]);

        assert!(far > 80.0, "far {far}");
        assert!(passing > 80.0, "passing {passing}");
        assert!(near < 40.0, "near {near}");
    }

    #[test]
    fn idle_ship_coasts_to_a_stop() {
        let mut ship = lone_ship(Vec2::new(2000.0, 2000.0), 0.0);
        ship.vel = Vec2::new(100.0, 0.0);

        for _ in 0..30 {
            steer_human(&mut ship, &[], tick_delta());
        }
        let expected = 100.0 * (-IDLE_DECAY).exp();
        assert!((ship.vel.length() - expected).abs() < 0.5, "speed {}", ship.vel.length());
        assert!(ship.pos.x > 2000.0 && ship.pos.x < 2100.0);
    }

    #[test]
    fn events_do_not_accumulate_across_ticks() {
        let mut sim = sim_with_humans(&[0]);
        sink(&mut sim, 9);
        assert!(!sim.events.is_empty());
        sim.step();
        assert!(!sim.events.iter().any(|e| matches!(e, SimEvent::Kill { victim: 9, .. })));
    }

    #[test]
    fn long_run_keeps_invariants() {
        let mut sim = sim_with_humans(&[0, 3]);
        let mut alive_prev = sim.alive_count;
        let mut dead: Vec<bool> = vec![false; MAX_SLOTS];

        for _ in 0..30 * 120 {
            sim.step();
            assert!(sim.alive_count <= alive_prev);
            alive_prev = sim.alive_count;

            for ship in sim.ships.iter() {
                assert!((0.0..=MAX_HP).contains(&ship.hp));
                if dead[ship.slot as usize] {
                    assert!(!ship.alive, "ship {} revived", ship.slot);
                }
                dead[ship.slot as usize] = !ship.alive;
            }
            assert_eq!(sim.alive_count as usize, sim.ships.alive().count());
        }
    }

    proptest! {
        #[test]
        fn hp_stays_in_range(hits in proptest::collection::vec((0u8..12, 0.0f32..6.0), 1..60)) {
            let mut sim = sim_with_humans(&[0]);
            for (slot, amount) in hits {
                let alive_before = sim.alive_count;
                let lethal = sim.damage_ship(slot, amount, Attacker::Hazard);
                if lethal {
                    prop_assert_eq!(sim.alive_count, alive_before - 1);
                } else {
                    prop_assert_eq!(sim.alive_count, alive_before);
                }
                for ship in sim.ships.iter() {
                    prop_assert!(ship.hp >= 0.0 && ship.hp <= MAX_HP);
                    prop_assert_eq!(ship.alive, ship.hp > 0.0);
                }
            }
        }
    }
}
