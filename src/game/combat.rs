//! Combat system - weapons, projectiles, damage and end-of-match

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use serde::Serialize;

use super::geometry::{
    angle_diff, direction, has_line_of_sight, heading_of, in_bounds, rotate_towards, safe_position,
};
use super::loot::{Loot, LootKind};
use super::ship::{nearest_target, Ship, ShipView, SHIP_RADIUS};
use super::simulation::{SimEvent, Simulation, SoundKind};
use super::world::Obstacle;

// Firing arcs (radians)
pub const FORWARD_CONE: f32 = 0.349; // ±20°
pub const BROADSIDE_BAND: f32 = 0.524; // ±30° around 90°

// Cannon
pub const CANNON_RANGE: f32 = 420.0;
pub const CANNON_SPEED: f32 = 380.0;
pub const CANNON_LIFETIME: f32 = 1.4;
pub const CANNON_DAMAGE: f32 = 1.0;
pub const CANNON_COOLDOWN: f32 = 1.6;
pub const CANNONBALL_RADIUS: f32 = 4.0;

// Torpedo
pub const TORPEDO_SPEED: f32 = 200.0;
pub const TORPEDO_LIFETIME: f32 = 5.0;
pub const TORPEDO_DAMAGE: f32 = 3.0;
pub const TORPEDO_BLAST_RADIUS: f32 = 80.0;
/// Homing correction limit (rad/s)
pub const TORPEDO_TURN_RATE: f32 = 1.4;
/// Detonates when a ship comes this close
pub const TORPEDO_PROXIMITY: f32 = 30.0;
pub const TORPEDO_COOLDOWN: f32 = 4.0;
/// Fraction of blast damage taken by the torpedo's own launcher
pub const TORPEDO_SELF_DAMAGE: f32 = 0.5;
pub const TORPEDO_MIN_RANGE: f32 = 200.0;
pub const TORPEDO_MAX_RANGE: f32 = 700.0;

// Mine
pub const MINE_ARM_TIME: f32 = 1.5;
pub const MINE_LIFETIME: f32 = 40.0;
pub const MINE_DAMAGE: f32 = 3.0;
pub const MINE_BLAST_RADIUS: f32 = 70.0;
pub const MINE_TRIGGER_RADIUS: f32 = 40.0;
pub const MINE_COOLDOWN: f32 = 5.0;
pub const MINE_DROP_RANGE: f32 = 250.0;

/// Seconds a blast ring stays visible
pub const BLAST_TTL: f32 = 0.6;

// Experience
pub const XP_PER_HIT: u32 = 10;
pub const XP_PER_KILL: u32 = 100;
pub const XP_PER_PLACEMENT: u32 = 15;
pub const WINNER_BONUS: u32 = 250;

/// Source of a damage instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attacker {
    Ship(u8),
    Zone,
    Hazard,
}

/// Resolved kill attribution as shown to players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "slot", rename_all = "camelCase")]
pub enum Killer {
    Ship(u8),
    Zone,
    Hazard,
    /// Caught in one's own blast
    Own,
}

impl Killer {
    fn resolve(attacker: Attacker, victim: u8) -> Self {
        match attacker {
            Attacker::Ship(slot) if slot == victim => Killer::Own,
            Attacker::Ship(slot) => Killer::Ship(slot),
            Attacker::Zone => Killer::Zone,
            Attacker::Hazard => Killer::Hazard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectileKind {
    Cannonball,
    Torpedo { target: Option<u8> },
    Mine { arm_timer: f32 },
}

/// Active projectile in the game
#[derive(Debug, Clone)]
pub struct Projectile {
    /// Assigned by the simulation on spawn
    pub id: u32,
    pub kind: ProjectileKind,
    pub owner: u8,
    pub pos: Vec2,
    pub vel: Vec2,
    pub heading: f32,
    pub lifetime: f32,
    pub damage: f32,
    pub blast_radius: f32,
}

impl Projectile {
    fn launch(kind: ProjectileKind, owner: u8, pos: Vec2, heading: f32, speed: f32) -> Self {
        let (lifetime, damage, blast_radius) = match kind {
            ProjectileKind::Cannonball => (CANNON_LIFETIME, CANNON_DAMAGE, 0.0),
            ProjectileKind::Torpedo { .. } => (TORPEDO_LIFETIME, TORPEDO_DAMAGE, TORPEDO_BLAST_RADIUS),
            ProjectileKind::Mine { .. } => (MINE_LIFETIME, MINE_DAMAGE, MINE_BLAST_RADIUS),
        };
        Self {
            id: 0,
            kind,
            owner,
            pos,
            vel: direction(heading) * speed,
            heading,
            lifetime,
            damage,
            blast_radius,
        }
    }

    /// Turn toward `target` by at most the homing limit, keeping speed
    pub fn steer_towards(&mut self, target: Vec2, dt: f32) {
        let bearing = heading_of(target - self.pos);
        self.heading = rotate_towards(self.heading, bearing, TORPEDO_TURN_RATE * dt);
        self.vel = direction(self.heading) * self.vel.length();
    }

    pub fn is_armed(&self) -> bool {
        match self.kind {
            ProjectileKind::Mine { arm_timer } => arm_timer <= 0.0,
            _ => true,
        }
    }
}

/// Expanding explosion ring (visual only, damage is applied on spawn)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blast {
    pub pos: Vec2,
    pub radius: f32,
    pub ttl: f32,
}

/// Firing-arc test.
///
/// Returns the fire angle when the bearing to `target` lies in the forward
/// cone (fire straight at it) or in either broadside band (fire
/// perpendicular to the hull, on the target's side).
pub fn firing_arc(heading: f32, pos: Vec2, target: Vec2) -> Option<f32> {
    let bearing = heading_of(target - pos);
    let rel = angle_diff(heading, bearing);

    if rel.abs() <= FORWARD_CONE {
        return Some(bearing);
    }
    if (rel.abs() - FRAC_PI_2).abs() <= BROADSIDE_BAND {
        return Some(heading + rel.signum() * FRAC_PI_2);
    }
    None
}

/// Reactive cannon fire shared by human and AI ships
pub fn try_cannon(ship: &mut Ship, views: &[ShipView], obstacles: &[Obstacle]) -> Option<Projectile> {
    if !ship.alive || ship.fire_cooldown > 0.0 {
        return None;
    }

    let (target, dist) = nearest_target(views, ship.slot, ship.pos)?;
    if dist > CANNON_RANGE || !has_line_of_sight(ship.pos, target.pos, obstacles) {
        return None;
    }
    let angle = firing_arc(ship.heading, ship.pos, target.pos)?;

    ship.fire_cooldown = ship.cannon_cooldown(CANNON_COOLDOWN);
    let muzzle = ship.pos + direction(angle) * (SHIP_RADIUS + 6.0);
    Some(Projectile::launch(ProjectileKind::Cannonball, ship.slot, muzzle, angle, CANNON_SPEED))
}

/// Launch a torpedo, homing on `target` when given, else straight ahead
pub fn launch_torpedo(ship: &mut Ship, target: Option<ShipView>) -> Option<Projectile> {
    if !ship.alive || ship.torpedoes == 0 || ship.torpedo_cooldown > 0.0 {
        return None;
    }

    ship.torpedoes -= 1;
    ship.torpedo_cooldown = TORPEDO_COOLDOWN;
    if ship.is_human() {
        ship.stats.torpedoes_fired += 1;
    }

    let heading = target.map_or(ship.heading, |t| heading_of(t.pos - ship.pos));
    let pos = ship.pos + direction(heading) * (SHIP_RADIUS + 8.0);
    let kind = ProjectileKind::Torpedo {
        target: target.map(|t| t.slot),
    };
    Some(Projectile::launch(kind, ship.slot, pos, heading, TORPEDO_SPEED))
}

/// Drop a mine astern
pub fn drop_mine(ship: &mut Ship) -> Option<Projectile> {
    if !ship.alive || ship.mines == 0 || ship.mine_cooldown > 0.0 {
        return None;
    }

    ship.mines -= 1;
    ship.mine_cooldown = MINE_COOLDOWN;

    let pos = ship.pos - direction(ship.heading) * (SHIP_RADIUS + 10.0);
    let kind = ProjectileKind::Mine {
        arm_timer: MINE_ARM_TIME,
    };
    Some(Projectile::launch(kind, ship.slot, pos, ship.heading, 0.0))
}

/// What a projectile did this tick
enum Impact {
    Hit { target: u8, owner: u8, damage: f32, pos: Vec2 },
    Blast { pos: Vec2, radius: f32, damage: f32, owner: u8, self_factor: f32 },
    Splash(Vec2),
    /// Removed without effect
    Decay,
}

fn blocked(pos: Vec2, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().any(|o| o.contains(pos, 0.0))
}

/// Advance one projectile; `None` keeps it alive
fn advance(p: &mut Projectile, views: &[ShipView], obstacles: &[Obstacle], dt: f32) -> Option<Impact> {
    p.lifetime -= dt;

    match p.kind {
        ProjectileKind::Cannonball => {
            p.pos += p.vel * dt;
            if p.lifetime <= 0.0 || !in_bounds(p.pos) || blocked(p.pos, obstacles) {
                return Some(Impact::Splash(p.pos));
            }
            let reach = SHIP_RADIUS + CANNONBALL_RADIUS;
            views
                .iter()
                .find(|v| v.alive && v.slot != p.owner && v.pos.distance_squared(p.pos) <= reach * reach)
                .map(|v| Impact::Hit {
                    target: v.slot,
                    owner: p.owner,
                    damage: p.damage,
                    pos: p.pos,
                })
        }
        ProjectileKind::Torpedo { target } => {
            if let Some(t) = target.and_then(|slot| views.get(slot as usize)).filter(|t| t.alive) {
                p.steer_towards(t.pos, dt);
            }
            p.pos += p.vel * dt;

            let reach = SHIP_RADIUS + TORPEDO_PROXIMITY;
            let near_ship = views
                .iter()
                .any(|v| v.alive && v.slot != p.owner && v.pos.distance_squared(p.pos) <= reach * reach);

            if near_ship || p.lifetime <= 0.0 || !in_bounds(p.pos) || blocked(p.pos, obstacles) {
                return Some(Impact::Blast {
                    pos: p.pos,
                    radius: p.blast_radius,
                    damage: p.damage,
                    owner: p.owner,
                    self_factor: TORPEDO_SELF_DAMAGE,
                });
            }
            None
        }
        ProjectileKind::Mine { arm_timer } => {
            p.kind = ProjectileKind::Mine {
                arm_timer: arm_timer - dt,
            };
            if p.is_armed() {
                let reach = SHIP_RADIUS + MINE_TRIGGER_RADIUS;
                let triggered = views
                    .iter()
                    .any(|v| v.alive && v.pos.distance_squared(p.pos) <= reach * reach);
                if triggered {
                    return Some(Impact::Blast {
                        pos: p.pos,
                        radius: p.blast_radius,
                        damage: p.damage,
                        owner: p.owner,
                        self_factor: 1.0,
                    });
                }
            }
            (p.lifetime <= 0.0).then_some(Impact::Decay)
        }
    }
}

/// Summary for one human-controlled ship at match end
#[derive(Debug, Clone, PartialEq)]
pub struct ShipResult {
    pub slot: u8,
    pub name: String,
    pub placement: u32,
    pub xp: u32,
    pub kills: u32,
    pub hits: u32,
    pub torpedoes_fired: u32,
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub winner: Option<u8>,
    /// Simulated seconds from start to end
    pub duration: f32,
    pub results: Vec<ShipResult>,
}

/// Experience bonus for finishing at `placement` (1 = best)
pub fn placement_bonus(placement: u32) -> u32 {
    13u32.saturating_sub(placement) * XP_PER_PLACEMENT
}

impl Simulation {
    /// Apply damage to `slot`. Returns true if this call sank the ship.
    pub fn damage_ship(&mut self, slot: u8, amount: f32, attacker: Attacker) -> bool {
        if self.ended {
            return false;
        }
        let alive_before = self.alive_count;
        let Some(target) = self.ships.get_mut(slot) else {
            return false;
        };
        if !target.alive || amount <= 0.0 {
            return false;
        }

        target.hp = (target.hp - amount).max(0.0);
        target.last_attacker = Some(attacker);
        let lethal = target.hp <= 0.0;
        let death_pos = target.pos;

        if lethal {
            target.alive = false;
            target.vel = Vec2::ZERO;
            target.placement = Some(alive_before);
            target.eliminated_at = Some(self.clock);
            target.waypoints.clear();
        }

        if let Attacker::Ship(by) = attacker {
            if by != slot {
                if let Some(shooter) = self.ships.get_mut(by).filter(|s| s.is_human()) {
                    shooter.stats.hits += 1;
                    shooter.stats.damage_dealt += amount;
                    shooter.stats.xp += XP_PER_HIT;
                    if lethal {
                        shooter.stats.kills += 1;
                        shooter.stats.xp += XP_PER_KILL;
                    }
                }
            }
        }

        if !lethal {
            return false;
        }

        self.alive_count = self.alive_count.saturating_sub(1);
        self.events.push(SimEvent::Kill {
            killer: Killer::resolve(attacker, slot),
            victim: slot,
        });
        self.sound(SoundKind::Sink, death_pos);

        let kind = LootKind::random(&mut self.rng);
        self.drop_loot(death_pos, kind);

        self.check_end_of_match();
        true
    }

    /// Area damage around `pos`; the owner takes `self_factor` of it
    pub fn explode(&mut self, pos: Vec2, radius: f32, damage: f32, owner: u8, self_factor: f32) {
        self.blasts.push(Blast {
            pos,
            radius,
            ttl: BLAST_TTL,
        });
        self.sound(SoundKind::Explosion, pos);

        let caught: Vec<u8> = self
            .ships
            .alive()
            .filter(|s| s.pos.distance(pos) <= radius + SHIP_RADIUS)
            .map(|s| s.slot)
            .collect();

        for slot in caught {
            let amount = if slot == owner { damage * self_factor } else { damage };
            self.damage_ship(slot, amount, Attacker::Ship(owner));
        }
    }

    /// Move every projectile, then resolve hits and detonations
    pub(super) fn update_projectiles(&mut self, dt: f32) {
        let views = self.ships.views();
        let obstacles = self.obstacles.clone();

        let mut impacts = Vec::new();
        self.projectiles.retain_mut(|p| match advance(p, &views, &obstacles, dt) {
            Some(impact) => {
                impacts.push(impact);
                false
            }
            None => true,
        });

        for impact in impacts {
            match impact {
                Impact::Hit { target, owner, damage, pos } => {
                    self.sound(SoundKind::Hit, pos);
                    self.damage_ship(target, damage, Attacker::Ship(owner));
                }
                Impact::Blast { pos, radius, damage, owner, self_factor } => {
                    self.explode(pos, radius, damage, owner, self_factor);
                }
                Impact::Splash(pos) => self.sound(SoundKind::Splash, pos),
                Impact::Decay => {}
            }
        }
    }

    pub(super) fn update_blasts(&mut self, dt: f32) {
        self.blasts.retain_mut(|b| {
            b.ttl -= dt;
            b.ttl > 0.0
        });
    }

    pub(super) fn drop_loot(&mut self, pos: Vec2, kind: LootKind) {
        let id = self.next_id();
        let pos = safe_position(pos, &self.obstacles, 10.0);
        self.loot.push(Loot { id, pos, kind });
    }

    /// Detect the end of the match. Runs at most once; later calls are no-ops.
    pub fn check_end_of_match(&mut self) {
        if self.ended {
            return;
        }

        let humans: Vec<&Ship> = self.ships.iter().filter(|s| s.is_human()).collect();
        let all_humans_down = !humans.is_empty() && humans.iter().all(|s| !s.alive);
        if self.alive_count > 1 && !all_humans_down {
            return;
        }

        self.ended = true;
        let winner = if self.alive_count == 1 {
            self.ships.alive().next().map(|s| s.slot)
        } else {
            None
        };

        let alive_now = self.alive_count.max(1);
        let results = humans
            .iter()
            .map(|s| {
                let won = winner == Some(s.slot);
                let placement = s.placement.unwrap_or(alive_now);
                let bonus = placement_bonus(placement) + if won { WINNER_BONUS } else { 0 };
                ShipResult {
                    slot: s.slot,
                    name: s.name.clone(),
                    placement,
                    xp: s.stats.xp + bonus,
                    kills: s.stats.kills,
                    hits: s.stats.hits,
                    torpedoes_fired: s.stats.torpedoes_fired,
                    won,
                }
            })
            .collect();

        self.outcome = Some(MatchOutcome {
            winner,
            duration: self.clock,
            results,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ship::{ControlMode, MAX_HP};
    use crate::game::world::default_obstacles;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ship_at(slot: u8, pos: Vec2, heading: f32) -> Ship {
        let mut rng = ChaCha8Rng::seed_from_u64(slot as u64);
        let mut ship = Ship::new(slot, format!("s{slot}"), ControlMode::Human, pos, &mut rng);
        ship.heading = heading;
        ship
    }

    fn view(slot: u8, pos: Vec2) -> ShipView {
        ShipView { slot, pos, hp: MAX_HP, alive: true }
    }

    #[test]
    fn forward_cone_fires_straight() {
        let angle = firing_arc(0.0, Vec2::ZERO, Vec2::new(100.0, 0.0)).unwrap();
        assert!(angle.abs() < 1e-5);
    }

    #[test]
    fn broadside_fires_perpendicular() {
        let angle = firing_arc(0.0, Vec2::ZERO, Vec2::new(0.0, 100.0)).unwrap();
        assert!((angle - FRAC_PI_2).abs() < 1e-5);

        let port = firing_arc(0.0, Vec2::ZERO, Vec2::new(0.0, -100.0)).unwrap();
        assert!((port + FRAC_PI_2).abs() < 1e-5);

        // Slightly off-beam still fires square to the hull
        let off = firing_arc(0.0, Vec2::ZERO, Vec2::new(30.0, 100.0)).unwrap();
        assert!((off - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn dead_zones_between_arcs() {
        // 45° off the bow and dead astern
        assert!(firing_arc(0.0, Vec2::ZERO, Vec2::new(100.0, 100.0)).is_none());
        assert!(firing_arc(0.0, Vec2::ZERO, Vec2::new(-100.0, 0.0)).is_none());
    }

    #[test]
    fn cannon_respects_cooldown_range_and_sight() {
        let mut ship = ship_at(0, Vec2::new(200.0, 2000.0), 0.0);
        let views = [view(0, ship.pos), view(1, Vec2::new(500.0, 2000.0))];

        let shot = try_cannon(&mut ship, &views, &[]).expect("target in arc and range");
        assert_eq!(shot.owner, 0);
        assert!(ship.fire_cooldown > 0.0);
        assert!(try_cannon(&mut ship, &views, &[]).is_none());

        ship.fire_cooldown = 0.0;
        let rock = [Obstacle::new(350.0, 2000.0, 40.0)];
        assert!(try_cannon(&mut ship, &views, &rock).is_none());

        let far = [view(0, ship.pos), view(1, Vec2::new(200.0 + CANNON_RANGE + 50.0, 2000.0))];
        assert!(try_cannon(&mut ship, &far, &[]).is_none());
    }

    #[test]
    fn torpedo_consumes_stock_and_counts_for_humans() {
        let mut ship = ship_at(0, Vec2::new(1000.0, 1000.0), 0.0);
        let stock = ship.torpedoes;
        let t = launch_torpedo(&mut ship, Some(view(1, Vec2::new(1000.0, 1500.0)))).unwrap();
        assert_eq!(ship.torpedoes, stock - 1);
        assert_eq!(ship.stats.torpedoes_fired, 1);
        assert_eq!(t.kind, ProjectileKind::Torpedo { target: Some(1) });
        assert!((t.heading - FRAC_PI_2).abs() < 1e-4);

        // Cooling down
        assert!(launch_torpedo(&mut ship, None).is_none());
    }

    #[test]
    fn homing_torpedo_converges_within_turn_limit() {
        let mut ship = ship_at(0, Vec2::new(1000.0, 1000.0), 0.0);
        let mut torpedo = launch_torpedo(&mut ship, None).unwrap();
        let target = Vec2::new(1000.0, 1600.0);
        let dt = 1.0 / 30.0;

        let mut prev_error = angle_diff(torpedo.heading, heading_of(target - torpedo.pos)).abs();
        for _ in 0..30 {
            let before = torpedo.heading;
            torpedo.steer_towards(target, dt);
            torpedo.pos += torpedo.vel * dt;

            assert!(angle_diff(before, torpedo.heading).abs() <= TORPEDO_TURN_RATE * dt + 1e-5);
            let error = angle_diff(torpedo.heading, heading_of(target - torpedo.pos)).abs();
            assert!(error <= prev_error + 1e-3);
            prev_error = error;
        }
        assert!((torpedo.vel.length() - TORPEDO_SPEED).abs() < 1e-2);
    }

    #[test]
    fn mine_is_inert_until_armed() {
        let mut ship = ship_at(0, Vec2::new(1000.0, 1000.0), 0.0);
        let mut mine = drop_mine(&mut ship).unwrap();
        assert!(!mine.is_armed());
        let views = [view(0, mine.pos)];

        assert!(advance(&mut mine, &views, &[], 0.5).is_none());
        let fired = advance(&mut mine, &views, &[], MINE_ARM_TIME);
        assert!(matches!(fired, Some(Impact::Blast { self_factor, .. }) if self_factor == 1.0));
    }

    /// Step until the projectile resolves; returns the impact and the time it took
    fn fly(p: &mut Projectile, views: &[ShipView], obstacles: &[Obstacle], limit: f32) -> (Option<Impact>, f32) {
        let dt = 1.0 / 30.0;
        let mut elapsed = 0.0;
        while elapsed < limit {
            elapsed += dt;
            if let Some(impact) = advance(p, views, obstacles, dt) {
                return (Some(impact), elapsed);
            }
        }
        (None, elapsed)
    }

    #[test]
    fn cannonball_splashes_on_rock_edge_and_expiry() {
        let rock = [Obstacle::new(1040.0, 1000.0, 20.0)];
        let mut ball = Projectile::launch(ProjectileKind::Cannonball, 0, Vec2::new(1000.0, 1000.0), 0.0, CANNON_SPEED);
        let (impact, elapsed) = fly(&mut ball, &[], &rock, 1.0);
        assert!(matches!(impact, Some(Impact::Splash(_))));
        assert!(elapsed < 0.2);

        let edge = Vec2::new(3995.0, 1000.0);
        let mut overboard = Projectile::launch(ProjectileKind::Cannonball, 0, edge, 0.0, CANNON_SPEED);
        let (impact, _) = fly(&mut overboard, &[], &[], 1.0);
        assert!(matches!(impact, Some(Impact::Splash(pos)) if pos.x > 3995.0));

        let mut spent = Projectile::launch(ProjectileKind::Cannonball, 0, Vec2::new(1000.0, 2000.0), 0.0, CANNON_SPEED);
        let (impact, elapsed) = fly(&mut spent, &[], &[], 5.0);
        assert!(matches!(impact, Some(Impact::Splash(_))));
        assert!((elapsed - CANNON_LIFETIME).abs() < 0.05);
    }

    #[test]
    fn cannonball_hits_first_ship_but_not_owner() {
        let origin = Vec2::new(1000.0, 1000.0);
        let views = [view(0, origin), view(1, origin + Vec2::new(60.0, 0.0))];
        let mut ball = Projectile::launch(ProjectileKind::Cannonball, 0, origin, 0.0, CANNON_SPEED);
        let (impact, _) = fly(&mut ball, &views, &[], 1.0);
        assert!(matches!(impact, Some(Impact::Hit { target: 1, owner: 0, .. })));
    }

    #[test]
    fn torpedo_detonates_on_rock_and_on_expiry() {
        let rock = [Obstacle::new(1060.0, 1000.0, 30.0)];
        let kind = ProjectileKind::Torpedo { target: None };
        let mut torpedo = Projectile::launch(kind, 0, Vec2::new(1000.0, 1000.0), 0.0, TORPEDO_SPEED);
        let (impact, elapsed) = fly(&mut torpedo, &[], &rock, 1.0);
        assert!(matches!(
            impact,
            Some(Impact::Blast { self_factor, radius, .. })
                if self_factor == TORPEDO_SELF_DAMAGE && radius == TORPEDO_BLAST_RADIUS
        ));
        assert!(elapsed < 0.3);

        let mut stray = Projectile::launch(kind, 0, Vec2::new(500.0, 2000.0), 0.0, TORPEDO_SPEED);
        let (impact, elapsed) = fly(&mut stray, &[], &[], 10.0);
        assert!(matches!(impact, Some(Impact::Blast { .. })));
        assert!((elapsed - TORPEDO_LIFETIME).abs() < 0.05);
    }

    #[test]
    fn unarmed_mine_decays_after_lifetime() {
        let mut ship = ship_at(0, Vec2::new(1000.0, 1000.0), 0.0);
        let mut mine = drop_mine(&mut ship).unwrap();
        let (impact, elapsed) = fly(&mut mine, &[], &[], MINE_LIFETIME + 1.0);
        assert!(matches!(impact, Some(Impact::Decay)));
        assert!((elapsed - MINE_LIFETIME).abs() < 0.05);
    }

    #[test]
    fn torpedo_blast_halves_owner_damage() {
        let mut sim = Simulation::new(1, default_obstacles(), &[(0, "cap".into())]);
        let owner_pos = sim.ships.get(0).unwrap().pos;
        let victim_pos = owner_pos + Vec2::new(30.0, 0.0);
        sim.ships.get_mut(1).unwrap().pos = victim_pos;

        sim.explode(owner_pos, TORPEDO_BLAST_RADIUS, TORPEDO_DAMAGE, 0, TORPEDO_SELF_DAMAGE);

        assert_eq!(sim.ships.get(0).unwrap().hp, MAX_HP - TORPEDO_DAMAGE * TORPEDO_SELF_DAMAGE);
        assert_eq!(sim.ships.get(1).unwrap().hp, MAX_HP - TORPEDO_DAMAGE);
        assert_eq!(sim.blasts.len(), 1);
    }

    #[test]
    fn placement_bonus_rewards_better_finish() {
        assert!(placement_bonus(1) > placement_bonus(2));
        assert_eq!(placement_bonus(12), XP_PER_PLACEMENT);
        assert_eq!(placement_bonus(40), 0);
    }
}
