// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polygon helpers for turning traced contours into quadrilaterals.

use folio_core::geometry::{Pixel, Point, QuadOutline};

/// Perimeter of a closed polyline.
pub fn closed_arc_length(points: &[Point<Pixel>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.distance(b))
        .sum()
}

/// Unsigned shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point<Pixel>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() * 0.5
}

fn segment_distance(p: &Point<Pixel>, a: &Point<Pixel>, b: &Point<Pixel>) -> f64 {
    let (dx, dy) = b.sub(a);
    let len = dx.hypot(dy);
    if len <= f64::EPSILON {
        return p.distance(a);
    }
    let (px, py) = p.sub(a);
    (dx * py - dy * px).abs() / len
}

/// Douglas-Peucker simplification of an open polyline. Endpoints are kept.
pub fn simplify_open(points: &[Point<Pixel>], epsilon: f64) -> Vec<Point<Pixel>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let (mut best, mut best_dist) = (start, 0.0);
        for i in start + 1..end {
            let d = segment_distance(&points[i], &points[start], &points[end]);
            if d > best_dist {
                best = i;
                best_dist = d;
            }
        }
        if best_dist > epsilon {
            keep[best] = true;
            stack.push((start, best));
            stack.push((best, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Douglas-Peucker simplification of a closed contour, split at the point
/// farthest from the first one.
pub fn simplify_closed(points: &[Point<Pixel>], epsilon: f64) -> Vec<Point<Pixel>> {
    if points.len() < 4 {
        return points.to_vec();
    }
    let far = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| points[0].distance(a).total_cmp(&points[0].distance(b)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return vec![points[0]];
    }

    let mut out = simplify_open(&points[..=far], epsilon);
    let mut tail = points[far..].to_vec();
    tail.push(points[0]);
    let second = simplify_open(&tail, epsilon);

    out.pop();
    out.extend(second);
    out.pop();
    out
}

/// Drop vertices whose turn is nearly straight (|sin| below `min_sin`).
pub fn prune_collinear(mut vertices: Vec<Point<Pixel>>, min_sin: f64) -> Vec<Point<Pixel>> {
    loop {
        let n = vertices.len();
        if n < 4 {
            return vertices;
        }
        let straight = (0..n).find(|&i| {
            let prev = &vertices[(i + n - 1) % n];
            let next = &vertices[(i + 1) % n];
            turn_sin(prev, &vertices[i], next).abs() < min_sin
        });
        match straight {
            Some(i) => {
                vertices.remove(i);
            }
            None => return vertices,
        }
    }
}

/// Sine of the angle between `prev -> at` and `at -> next`.
fn turn_sin(prev: &Point<Pixel>, at: &Point<Pixel>, next: &Point<Pixel>) -> f64 {
    let (ax, ay) = at.sub(prev);
    let (bx, by) = next.sub(at);
    let norm = ax.hypot(ay) * bx.hypot(by);
    if norm <= f64::EPSILON {
        return 0.0;
    }
    (ax * by - ay * bx) / norm
}

/// Reduce a closed contour to four corners, loosening the tolerance a few
/// times before giving up. `epsilon_fraction` is relative to the perimeter.
pub fn approximate_quad(points: &[Point<Pixel>], epsilon_fraction: f64) -> Option<QuadOutline<Pixel>> {
    let perimeter = closed_arc_length(points);
    if perimeter <= f64::EPSILON {
        return None;
    }
    for factor in [1.0, 1.5, 2.0, 3.0] {
        let simplified = simplify_closed(points, epsilon_fraction * factor * perimeter);
        let vertices = prune_collinear(simplified, 0.1);
        match vertices.len() {
            4 => {
                let corners = [vertices[0], vertices[1], vertices[2], vertices[3]];
                return Some(QuadOutline::from_unordered(corners));
            }
            n if n < 4 => return None,
            _ => continue,
        }
    }
    None
}

/// Mean |sin| of the four corner angles: 1 for a rectangle, towards 0 as
/// the quad collapses.
pub fn rectangularity(quad: &QuadOutline<Pixel>) -> f64 {
    let c = quad.corners();
    (0..4)
        .map(|i| turn_sin(&c[(i + 3) % 4], &c[i], &c[(i + 1) % 4]).abs())
        .sum::<f64>()
        / 4.0
}
