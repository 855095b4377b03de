//! Shrinking safe zone

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

/// One step of the zone schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonePhase {
    /// Radius reached at the end of this phase
    pub radius: f32,
    /// Idle time before shrinking starts (seconds)
    pub delay: f32,
    /// Time to shrink to `radius` (seconds)
    pub duration: f32,
}

pub const ZONE_PHASES: [ZonePhase; 5] = [
    ZonePhase { radius: 1800.0, delay: 40.0, duration: 25.0 },
    ZonePhase { radius: 1200.0, delay: 30.0, duration: 20.0 },
    ZonePhase { radius: 700.0, delay: 25.0, duration: 18.0 },
    ZonePhase { radius: 350.0, delay: 20.0, duration: 15.0 },
    ZonePhase { radius: 120.0, delay: 15.0, duration: 12.0 },
];

pub const INITIAL_ZONE_RADIUS: f32 = 2600.0;
/// Damage per second to ships outside the circle
pub const ZONE_DAMAGE_PER_SECOND: f32 = 1.0;
/// Exponential approach rate of the center toward its target (1/s)
const CENTER_APPROACH_RATE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneMode {
    Countdown { remaining: f32 },
    Shrinking { elapsed: f32, start_radius: f32 },
    Final,
}

/// Transition reported by [`Zone::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneTransition {
    ShrinkStarted { phase: usize },
    ShrinkFinished { phase: usize },
}

#[derive(Debug, Clone)]
pub struct Zone {
    pub center: Vec2,
    pub radius: f32,
    pub target_center: Vec2,
    pub target_radius: f32,
    /// Index of the phase currently counting down or shrinking
    pub phase: usize,
    pub mode: ZoneMode,
    pub damage_per_second: f32,
}

impl Zone {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self {
            center,
            radius,
            target_center: center,
            target_radius: radius,
            phase: 0,
            mode: ZoneMode::Countdown {
                remaining: ZONE_PHASES[0].delay,
            },
            damage_per_second: ZONE_DAMAGE_PER_SECOND,
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.distance_squared(self.center) <= self.radius * self.radius
    }

    pub fn is_shrinking(&self) -> bool {
        matches!(self.mode, ZoneMode::Shrinking { .. })
    }

    /// Seconds until the next mode change, 0 once final
    pub fn timer(&self) -> f32 {
        match self.mode {
            ZoneMode::Countdown { remaining } => remaining.max(0.0),
            ZoneMode::Shrinking { elapsed, .. } => {
                (ZONE_PHASES[self.phase].duration - elapsed).max(0.0)
            }
            ZoneMode::Final => 0.0,
        }
    }

    /// Advance the phase machine by `dt`
    pub fn update<R: Rng>(&mut self, dt: f32, rng: &mut R) -> Option<ZoneTransition> {
        match self.mode {
            ZoneMode::Final => None,
            ZoneMode::Countdown { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.mode = ZoneMode::Countdown { remaining };
                    return None;
                }

                let phase = ZONE_PHASES[self.phase];
                self.target_radius = phase.radius.min(self.radius);

                // New circle must fit inside the current one
                let slack = (self.radius - self.target_radius).max(0.0) * 0.5;
                let angle = rng.gen_range(0.0..TAU);
                let offset = if slack > 0.0 { rng.gen_range(0.0..slack) } else { 0.0 };
                self.target_center = self.center + Vec2::new(angle.cos(), angle.sin()) * offset;

                self.mode = ZoneMode::Shrinking {
                    elapsed: 0.0,
                    start_radius: self.radius,
                };
                Some(ZoneTransition::ShrinkStarted { phase: self.phase })
            }
            ZoneMode::Shrinking { elapsed, start_radius } => {
                let phase = ZONE_PHASES[self.phase];
                let elapsed = elapsed + dt;
                let t = (elapsed / phase.duration).min(1.0);

                let radius = start_radius + (self.target_radius - start_radius) * t;
                self.radius = radius.min(self.radius);
                self.center += (self.target_center - self.center) * (1.0 - (-CENTER_APPROACH_RATE * dt).exp());

                if t < 1.0 {
                    self.mode = ZoneMode::Shrinking { elapsed, start_radius };
                    return None;
                }

                let finished = self.phase;
                self.radius = self.target_radius;
                self.center = self.target_center;
                self.phase += 1;
                self.mode = match ZONE_PHASES.get(self.phase) {
                    Some(next) => ZoneMode::Countdown { remaining: next.delay },
                    None => ZoneMode::Final,
                };
                Some(ZoneTransition::ShrinkFinished { phase: finished })
            }
        }
    }
}
