//! Waypoint planning around static obstacles
//!
//! No navigation mesh: a straight segment is split at a lateral bypass point
//! beside the first obstacle it crosses, and each half is planned again.
//! Recursion is capped at [`MAX_PATH_DEPTH`]; past the cap the endpoint is
//! accepted as-is, so pathological layouts yield a rough path instead of
//! unbounded work.

use std::collections::VecDeque;

use glam::Vec2;

use super::geometry::{first_blocking, safe_position};
use super::world::Obstacle;

/// Recursion cap for bypass construction
pub const MAX_PATH_DEPTH: u32 = 3;
/// Obstacles are treated as this much larger when testing a segment
pub const PATH_CLEARANCE: f32 = 15.0;
/// Distance of a bypass point beyond the obstacle edge
pub const BYPASS_MARGIN: f32 = 45.0;
/// Waypoints accepted from a single request
pub const MAX_WAYPOINTS_PER_REQUEST: usize = 4;
/// Waypoints a ship may have queued at once
pub const MAX_QUEUED_WAYPOINTS: usize = 8;

/// Plan a path from `from` to `to`.
///
/// Returns the ordered waypoints to follow (excluding `from`), truncated to
/// [`MAX_WAYPOINTS_PER_REQUEST`]. An unobstructed line yields `[to]`.
pub fn plan_path(from: Vec2, to: Vec2, obstacles: &[Obstacle]) -> Vec<Vec2> {
    let mut waypoints = Vec::new();
    build(from, to, obstacles, 0, &mut waypoints);
    waypoints.truncate(MAX_WAYPOINTS_PER_REQUEST);
    waypoints
}

fn build(a: Vec2, b: Vec2, obstacles: &[Obstacle], depth: u32, out: &mut Vec<Vec2>) {
    if depth >= MAX_PATH_DEPTH {
        out.push(b);
        return;
    }

    let Some(blocker) = first_blocking(a, b, obstacles, PATH_CLEARANCE) else {
        out.push(b);
        return;
    };

    let bypass = bypass_point(a, b, blocker, obstacles);
    build(a, bypass, obstacles, depth + 1, out);
    build(bypass, b, obstacles, depth + 1, out);
}

/// Pick the side of `blocker` that gives the shorter detour
fn bypass_point(a: Vec2, b: Vec2, blocker: &Obstacle, obstacles: &[Obstacle]) -> Vec2 {
    let center = blocker.center();
    let along = (b - a).normalize_or_zero();
    let normal = if along == Vec2::ZERO {
        Vec2::Y
    } else {
        along.perp()
    };

    let offset = blocker.radius + BYPASS_MARGIN;
    let candidates = [center + normal * offset, center - normal * offset];

    let best = candidates
        .into_iter()
        .min_by(|p, q| {
            let lp = a.distance(*p) + p.distance(b);
            let lq = a.distance(*q) + q.distance(b);
            lp.total_cmp(&lq)
        })
        .unwrap_or(candidates[0]);

    safe_position(best, obstacles, BYPASS_MARGIN)
}

/// Append planned waypoints to an existing queue, respecting the queue cap
pub fn enqueue_waypoints(queue: &mut VecDeque<Vec2>, planned: Vec<Vec2>) {
    let room = MAX_QUEUED_WAYPOINTS.saturating_sub(queue.len());
    queue.extend(planned.into_iter().take(room));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::has_line_of_sight;

    #[test]
    fn clear_line_is_single_waypoint() {
        let to = Vec2::new(900.0, 400.0);
        let path = plan_path(Vec2::new(100.0, 100.0), to, &[]);
        assert_eq!(path, vec![to]);
    }

    #[test]
    fn single_obstacle_is_bypassed() {
        let obstacles = [Obstacle::new(1000.0, 1000.0, 100.0)];
        let from = Vec2::new(500.0, 1000.0);
        let to = Vec2::new(1500.0, 1000.0);

        let path = plan_path(from, to, &obstacles);
        assert!((2..=3).contains(&path.len()), "got {path:?}");
        assert_eq!(*path.last().unwrap(), to);

        for p in &path {
            for o in &obstacles {
                assert!(p.distance(o.center()) >= o.radius);
            }
        }

        // Every leg is now clear
        let mut prev = from;
        for p in &path {
            assert!(has_line_of_sight(prev, *p, &obstacles));
            prev = *p;
        }
    }

    #[test]
    fn bypass_prefers_shorter_side() {
        // Obstacle center is offset toward +y, so the -y detour is shorter
        let obstacles = [Obstacle::new(1000.0, 1030.0, 100.0)];
        let path = plan_path(Vec2::new(500.0, 1000.0), Vec2::new(1500.0, 1000.0), &obstacles);
        assert!(path[0].y < 1000.0);
    }

    #[test]
    fn path_never_exceeds_request_cap() {
        let obstacles: Vec<Obstacle> = (0..8)
            .map(|i| Obstacle::new(400.0 + i as f32 * 300.0, 2000.0, 90.0))
            .collect();
        let path = plan_path(Vec2::new(100.0, 2000.0), Vec2::new(3900.0, 2000.0), &obstacles);
        assert!(!path.is_empty());
        assert!(path.len() <= MAX_WAYPOINTS_PER_REQUEST);
    }

    #[test]
    fn queue_cap_is_enforced() {
        let mut queue: VecDeque<Vec2> = std::iter::repeat(Vec2::ZERO)
            .take(MAX_QUEUED_WAYPOINTS - 1)
            .collect();
        enqueue_waypoints(&mut queue, vec![Vec2::ONE, Vec2::ONE, Vec2::ONE]);
        assert_eq!(queue.len(), MAX_QUEUED_WAYPOINTS);
    }
}
