//! Roaming sea monsters

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;

use super::geometry::{avoidance_force, blend_heading, direction, rotate_towards, safe_position};
use super::world::Obstacle;

pub const HAZARD_COUNT: usize = 2;
pub const HAZARD_RADIUS: f32 = 45.0;
pub const HAZARD_SPEED: f32 = 55.0;
pub const HAZARD_TURN_RATE: f32 = 0.8;
/// Contact damage per second
pub const HAZARD_DAMAGE_PER_SECOND: f32 = 3.0;

#[derive(Debug, Clone)]
pub struct Hazard {
    pub id: u32,
    pub pos: Vec2,
    pub heading: f32,
    pub radius: f32,
    desired_heading: f32,
    retarget_timer: f32,
}

impl Hazard {
    pub fn spawn<R: Rng>(id: u32, pos: Vec2, rng: &mut R) -> Self {
        let heading = rng.gen_range(0.0..TAU);
        Self {
            id,
            pos,
            heading,
            radius: HAZARD_RADIUS,
            desired_heading: heading,
            retarget_timer: rng.gen_range(2.0..6.0),
        }
    }

    /// Wander on a jittered heading, steering around obstacles and edges
    pub fn update<R: Rng>(&mut self, dt: f32, obstacles: &[Obstacle], rng: &mut R) {
        self.retarget_timer -= dt;
        if self.retarget_timer <= 0.0 {
            self.desired_heading += rng.gen_range(-PI / 2.0..PI / 2.0);
            self.retarget_timer = rng.gen_range(2.0..6.0);
        }

        let goal = blend_heading(self.desired_heading, avoidance_force(self.pos, obstacles));
        self.heading = rotate_towards(self.heading, goal, HAZARD_TURN_RATE * dt);
        self.pos += direction(self.heading) * HAZARD_SPEED * dt;
        self.pos = safe_position(self.pos, obstacles, self.radius);
    }

    pub fn touches(&self, pos: Vec2, radius: f32) -> bool {
        self.pos.distance_squared(pos) <= (self.radius + radius).powi(2)
    }
}
