// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Span grouping: chain text contours left to right into text lines.

use folio_core::config::DewarpConfig;
use folio_core::geometry::{Pixel, Point};
use tracing::debug;

use super::contour::TextContour;
use super::fit::Polynomial;

/// One visual text line.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// Indices into the analysed contour list, left to right.
    pub contours: Vec<usize>,
    /// Contour centers and midline samples the baseline was fitted to.
    pub key_points: Vec<Point<Pixel>>,
    /// Fitted `y = f(x)` in working pixels.
    pub curve: Polynomial,
    pub min_x: f64,
    pub max_x: f64,
}

impl TextSpan {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Points on the fitted curve every `interval` pixels, ends included.
    pub fn sample_curve(&self, interval: u32) -> Vec<Point<Pixel>> {
        let step = interval.max(1) as f64;
        let mut xs = Vec::new();
        let mut x = self.min_x;
        while x < self.max_x {
            xs.push(x);
            x += step;
        }
        xs.push(self.max_x);
        xs.into_iter()
            .map(|x| Point::new(x, self.curve.eval(x)))
            .collect()
    }

    fn mean_y(&self) -> f64 {
        self.curve.eval((self.min_x + self.max_x) * 0.5)
    }
}

/// A possible left-to-right link between two contours.
struct Edge {
    cost: f64,
    left: usize,
    right: usize,
}

fn angle_delta(a: f64, b: f64) -> f64 {
    let mut d = (a - b).abs() % std::f64::consts::PI;
    if d > std::f64::consts::FRAC_PI_2 {
        d = std::f64::consts::PI - d;
    }
    d
}

/// Cost of linking `a` to `b`, or `None` when the pair cannot be on the
/// same line.
fn link_cost(a: &TextContour, b: &TextContour, config: &DewarpConfig) -> Option<f64> {
    if b.center.x <= a.center.x {
        return None;
    }
    let gap = b.bounds.min_x - a.bounds.max_x - 1.0;
    if gap > config.max_gap || -gap > config.max_overlap {
        return None;
    }
    let dy = b.center.y - a.center.y;
    if dy.abs() > config.vertical_tolerance {
        return None;
    }

    let max_angle = config.max_angle_degrees.to_radians();
    let direction = dy.atan2(b.center.x - a.center.x);
    let mut angle_penalty = 0.0;
    for angle in [a.angle, b.angle].into_iter().flatten() {
        let delta = angle_delta(angle, direction);
        if delta > max_angle {
            return None;
        }
        angle_penalty += delta;
    }
    if let (Some(aa), Some(ba)) = (a.angle, b.angle) {
        if angle_delta(aa, ba) > max_angle {
            return None;
        }
    }

    Some(gap.max(0.0).hypot(dy) + angle_penalty.to_degrees())
}

/// Greedily link contours by ascending cost into chains, fit each chain's
/// baseline, and keep chains at least `min_span_width` wide. Spans are
/// returned top to bottom.
pub fn group_spans(contours: &[TextContour], config: &DewarpConfig) -> Vec<TextSpan> {
    let n = contours.len();
    let mut edges = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if let Some(cost) = link_cost(&contours[i], &contours[j], config) {
                edges.push(Edge {
                    cost,
                    left: i,
                    right: j,
                });
            }
        }
    }
    edges.sort_by(|a, b| a.cost.total_cmp(&b.cost));

    let mut next: Vec<Option<usize>> = vec![None; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    for e in &edges {
        // Links always point rightwards, so chains cannot close into cycles.
        if next[e.left].is_none() && prev[e.right].is_none() {
            next[e.left] = Some(e.right);
            prev[e.right] = Some(e.left);
        }
    }

    let mut spans = Vec::new();
    for start in (0..n).filter(|&i| prev[i].is_none()) {
        let mut chain = vec![start];
        let mut at = start;
        while let Some(following) = next[at] {
            chain.push(following);
            at = following;
        }
        if let Some(span) = build_span(chain, contours, config) {
            spans.push(span);
        }
    }
    spans.sort_by(|a, b| a.mean_y().total_cmp(&b.mean_y()));

    debug!(
        contours = n,
        links = edges.len(),
        spans = spans.len(),
        "Text spans grouped"
    );
    spans
}

fn build_span(chain: Vec<usize>, contours: &[TextContour], config: &DewarpConfig) -> Option<TextSpan> {
    let min_x = chain
        .iter()
        .map(|&i| contours[i].bounds.min_x)
        .fold(f64::INFINITY, f64::min);
    let max_x = chain
        .iter()
        .map(|&i| contours[i].bounds.max_x)
        .fold(f64::NEG_INFINITY, f64::max);
    if max_x - min_x < config.min_span_width {
        return None;
    }

    let mut key_points = Vec::new();
    for &i in &chain {
        key_points.push(contours[i].center);
        key_points.extend(contours[i].midline_samples(config.sampling_interval));
    }
    let degree = config.span_degree.min(key_points.len().saturating_sub(1));
    let curve = (0..=degree)
        .rev()
        .find_map(|d| Polynomial::fit(&key_points, d))?;

    Some(TextSpan {
        contours: chain,
        key_points,
        curve,
        min_x,
        max_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(x0: f64, y0: f64, w: f64, h: f64) -> TextContour {
        let mut pts = Vec::new();
        let (x1, y1) = (x0 + w - 1.0, y0 + h - 1.0);
        let mut x = x0;
        while x <= x1 {
            pts.push(Point::new(x, y0));
            pts.push(Point::new(x, y1));
            x += 1.0;
        }
        let mut y = y0 + 1.0;
        while y < y1 {
            pts.push(Point::new(x0, y));
            pts.push(Point::new(x1, y));
            y += 1.0;
        }
        TextContour::from_points(pts).unwrap()
    }

    #[test]
    fn words_on_two_lines_form_two_spans() {
        let config = DewarpConfig::default();
        let mut contours = Vec::new();
        for k in 0..5 {
            contours.push(word(60.0 + k as f64 * 50.0, 100.0, 40.0, 8.0));
            contours.push(word(60.0 + k as f64 * 50.0, 160.0, 40.0, 8.0));
        }
        let spans = group_spans(&contours, &config);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].contours.len(), 5);
        assert!(spans[0].curve.eval(150.0) < spans[1].curve.eval(150.0));
        assert!((spans[0].curve.eval(150.0) - 103.5).abs() < 0.5);
    }

    #[test]
    fn far_apart_words_do_not_link() {
        let config = DewarpConfig::default();
        let contours = vec![word(60.0, 100.0, 40.0, 8.0), word(300.0, 100.0, 40.0, 8.0)];
        let spans = group_spans(&contours, &config);
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().all(|s| s.contours.len() == 1));
    }

    #[test]
    fn narrow_isolated_blob_is_dropped() {
        let config = DewarpConfig::default();
        let spans = group_spans(&[word(60.0, 100.0, 12.0, 8.0)], &config);
        assert!(spans.is_empty());
    }

    #[test]
    fn curve_samples_cover_span_ends() {
        let config = DewarpConfig::default();
        let spans = group_spans(&[word(60.0, 100.0, 45.0, 8.0)], &config);
        let samples = spans[0].sample_curve(20);
        assert_eq!(samples.first().unwrap().x, 60.0);
        assert_eq!(samples.last().unwrap().x, 104.0);
    }
}
