//! Geometry and steering primitives
//!
//! Everything here is pure: distance and angle helpers, segment/circle
//! intersection for line of sight, the obstacle avoidance field used by ships
//! and hazards, and obstacle-safe position correction.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

use super::world::{Obstacle, WORLD_HEIGHT, WORLD_WIDTH};

/// How far beyond an obstacle's edge the avoidance field reaches
pub const AVOID_RANGE: f32 = 120.0;
/// Cap on a single obstacle's contribution outside its radius
pub const AVOID_CAP: f32 = 1.0;
/// Fixed push applied when already inside an obstacle
pub const INSIDE_PUSH: f32 = 3.0;
/// Distance from a world edge at which repulsion starts
pub const EDGE_RANGE: f32 = 150.0;
/// Blend weight gained per unit of avoidance magnitude
pub const BLEND_GAIN: f32 = 0.8;
/// Upper bound on how much avoidance can override the desired heading
pub const MAX_BLEND: f32 = 0.85;

pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// Heading angle of a vector in radians
pub fn heading_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Unit vector for a heading
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Signed shortest rotation from `from` to `to`, in (-π, π]
pub fn angle_diff(from: f32, to: f32) -> f32 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

/// Wrap an angle into (-π, π]
pub fn normalize_angle(angle: f32) -> f32 {
    angle_diff(0.0, angle)
}

/// Turn-rate limiter: step from `current` toward `target` by at most `max_delta`
pub fn rotate_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = angle_diff(current, target);
    if diff.abs() <= max_delta {
        normalize_angle(target)
    } else {
        normalize_angle(current + diff.signum() * max_delta)
    }
}

/// Does the segment `a→b` touch the circle at `center` with `radius`?
///
/// Solves |a + t(b-a) - c|² = r² for t and checks for a root in [0, 1].
/// A zero-length segment degrades to a point-in-circle test.
pub fn segment_intersects_circle(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> bool {
    let d = b - a;
    let f = a - center;
    let qa = d.dot(d);

    if qa < 1e-9 {
        return f.length_squared() <= radius * radius;
    }

    let qb = 2.0 * f.dot(d);
    let qc = f.dot(f) - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return false;
    }

    let s = disc.sqrt();
    let t1 = (-qb - s) / (2.0 * qa);
    let t2 = (-qb + s) / (2.0 * qa);

    (0.0..=1.0).contains(&t1) || (0.0..=1.0).contains(&t2) || (t1 < 0.0 && t2 > 1.0)
}

pub fn has_line_of_sight(a: Vec2, b: Vec2, obstacles: &[Obstacle]) -> bool {
    !obstacles
        .iter()
        .any(|o| segment_intersects_circle(a, b, o.center(), o.radius))
}

/// Nearest obstacle (by distance from `a`) blocking `a→b`, each obstacle
/// inflated by `clearance`
pub fn first_blocking(a: Vec2, b: Vec2, obstacles: &[Obstacle], clearance: f32) -> Option<&Obstacle> {
    obstacles
        .iter()
        .filter(|o| segment_intersects_circle(a, b, o.center(), o.radius + clearance))
        .min_by(|x, y| {
            a.distance_squared(x.center())
                .total_cmp(&a.distance_squared(y.center()))
        })
}

/// Repulsion field from nearby obstacles and the world edges
pub fn avoidance_force(pos: Vec2, obstacles: &[Obstacle]) -> Vec2 {
    let mut force = Vec2::ZERO;

    for o in obstacles {
        let offset = pos - o.center();
        let dist = offset.length();
        let away = if dist > f32::EPSILON { offset / dist } else { Vec2::X };

        if dist < o.radius {
            force += away * INSIDE_PUSH;
            continue;
        }

        let gap = dist - o.radius;
        if gap < AVOID_RANGE {
            let penetration = 1.0 - gap / AVOID_RANGE;
            force += away * (penetration * penetration).min(AVOID_CAP);
        }
    }

    force + edge_repulsion(pos)
}

fn edge_repulsion(pos: Vec2) -> Vec2 {
    let push = |d: f32| {
        if d < EDGE_RANGE {
            let p = 1.0 - d.max(0.0) / EDGE_RANGE;
            p * p
        } else {
            0.0
        }
    };

    Vec2::new(
        push(pos.x) - push(WORLD_WIDTH - pos.x),
        push(pos.y) - push(WORLD_HEIGHT - pos.y),
    )
}

/// Mix the avoidance vector into a desired heading.
///
/// The blend weight grows with the avoidance magnitude and is capped so the
/// ship keeps some intent even when hugging an obstacle.
pub fn blend_heading(desired: f32, avoidance: Vec2) -> f32 {
    let mag = avoidance.length();
    if mag < 1e-4 {
        return desired;
    }

    let weight = (mag * BLEND_GAIN).min(MAX_BLEND);
    let blended = direction(desired) * (1.0 - weight) + (avoidance / mag) * weight;
    if blended.length_squared() < 1e-6 {
        heading_of(avoidance)
    } else {
        heading_of(blended)
    }
}

pub fn in_bounds(p: Vec2) -> bool {
    (0.0..=WORLD_WIDTH).contains(&p.x) && (0.0..=WORLD_HEIGHT).contains(&p.y)
}

pub fn clamp_to_world(p: Vec2, margin: f32) -> Vec2 {
    Vec2::new(
        p.x.clamp(margin, WORLD_WIDTH - margin),
        p.y.clamp(margin, WORLD_HEIGHT - margin),
    )
}

pub fn is_in_circle(p: Vec2, center: Vec2, radius: f32) -> bool {
    p.distance_squared(center) <= radius * radius
}

/// Push a point out of every obstacle closer than `radius + margin`.
///
/// Two relaxation passes; with overlapping obstacles the result can still be
/// slightly inside one of them.
pub fn safe_position(p: Vec2, obstacles: &[Obstacle], margin: f32) -> Vec2 {
    let mut p = p;
    for _ in 0..2 {
        for o in obstacles {
            let min_dist = o.radius + margin;
            let offset = p - o.center();
            let dist = offset.length();
            if dist < min_dist {
                let away = if dist > f32::EPSILON { offset / dist } else { Vec2::X };
                p = o.center() + away * min_dist;
            }
        }
    }
    clamp_to_world(p, margin)
}

/// Push two overlapping circles apart by half the overlap each.
/// Returns `None` when they do not overlap.
pub fn resolve_circle_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> Option<(Vec2, Vec2)> {
    let delta = b - a;
    let dist = delta.length();
    let combined = ra + rb;

    if dist >= combined {
        return None;
    }

    if dist < 0.001 {
        // Same position, push apart arbitrarily
        return Some((a - Vec2::X * ra, b + Vec2::X * rb));
    }

    let normal = delta / dist;
    let push = (combined - dist) / 2.0 + 0.1;
    Some((a - normal * push, b + normal * push))
}
