// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Least-squares curve fitting: per-span baselines and the global page model.

use folio_core::config::DewarpConfig;
use folio_core::error::{FolioError, Result};
use folio_core::geometry::{Pixel, Point};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, instrument};

use super::span::TextSpan;

/// Ratio of smallest to largest singular value below which a system is
/// treated as singular.
const SINGULAR_RATIO: f64 = 1e-9;

/// Solve `a * x ~= b` in the least-squares sense, or `None` when `a` is
/// rank deficient.
fn least_squares(a: DMatrix<f64>, b: DVector<f64>) -> Option<DVector<f64>> {
    if a.nrows() < a.ncols() || a.ncols() == 0 {
        return None;
    }
    let svd = a.svd(true, true);
    let max = svd.singular_values.max();
    let min = svd.singular_values.min();
    if max.is_nan() || max <= 0.0 || min / max < SINGULAR_RATIO {
        return None;
    }
    svd.solve(&b, max * SINGULAR_RATIO).ok()
}

/// `y = sum c_k u^k` with `u = (x - center) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    center: f64,
    scale: f64,
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Fit a polynomial of at most `degree` through `points`. The degree
    /// drops to zero when all points share one x.
    pub fn fit(points: &[Point<Pixel>], degree: usize) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let center = points.iter().map(|p| p.x).sum::<f64>() / n;
        let spread = points
            .iter()
            .map(|p| (p.x - center).abs())
            .fold(0.0, f64::max);
        let (scale, degree) = if spread < 1e-6 { (1.0, 0) } else { (spread, degree) };

        let a = DMatrix::from_fn(points.len(), degree + 1, |r, c| {
            ((points[r].x - center) / scale).powi(c as i32)
        });
        let b = DVector::from_iterator(points.len(), points.iter().map(|p| p.y));
        let solution = least_squares(a, b)?;

        Some(Self {
            center,
            scale,
            coefficients: solution.iter().copied().collect(),
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let u = (x - self.center) / self.scale;
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * u + c)
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }
}

/// Maps working-image pixels to page coordinates in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub width: f64,
    pub height: f64,
}

impl PageFrame {
    pub fn to_page(&self, p: &Point<Pixel>) -> (f64, f64) {
        (
            2.0 * p.x / self.width - 1.0,
            2.0 * p.y / self.height - 1.0,
        )
    }

    pub fn to_pixel(&self, px: f64, py: f64) -> Point<Pixel> {
        Point::new((px + 1.0) * 0.5 * self.width, (py + 1.0) * 0.5 * self.height)
    }
}

/// Page curvature model in normalized page coordinates.
///
/// Span `k` is observed at `y = offset_k + sum_j (a_j + b_j * ybar_k) x^j`
/// for `j = 1..=degree`, where `ybar_k` is the span's mean height. A flat
/// output line at height `y` therefore comes from source height
/// `y + displacement(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DewarpModel {
    pub offsets: Vec<f64>,
    pub span_heights: Vec<f64>,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
    /// Root-mean-square residual of the fit, in page units.
    pub rms_residual: f64,
}

impl DewarpModel {
    /// Vertical shift from output to source at page position `(x, y)`.
    pub fn displacement(&self, x: f64, y: f64) -> f64 {
        let mut power = 1.0;
        let mut sum = 0.0;
        for (a, b) in self.a.iter().zip(&self.b) {
            power *= x;
            sum += (a + b * y) * power;
        }
        sum
    }

    /// Where the model places span `k` at page position `x`.
    pub fn predict(&self, span: usize, x: f64) -> Option<f64> {
        let offset = *self.offsets.get(span)?;
        let height = *self.span_heights.get(span)?;
        Some(offset + self.displacement(x, height))
    }

    /// Largest absolute displacement over a grid covering the page.
    pub fn max_displacement(&self) -> f64 {
        const STEPS: usize = 16;
        let mut worst: f64 = 0.0;
        for i in 0..=STEPS {
            for j in 0..=STEPS {
                let x = -1.0 + 2.0 * i as f64 / STEPS as f64;
                let y = -1.0 + 2.0 * j as f64 / STEPS as f64;
                worst = worst.max(self.displacement(x, y).abs());
            }
        }
        worst
    }
}

/// Solve the global system: one offset per span plus `a_j`, `b_j`.
#[instrument(skip_all, fields(spans = spans.len()))]
pub fn fit_model(spans: &[TextSpan], frame: PageFrame, config: &DewarpConfig) -> Result<DewarpModel> {
    if spans.len() < config.min_spans {
        return Err(FolioError::DewarpDegenerate {
            spans: spans.len(),
            required: config.min_spans,
        });
    }

    let degree = config.global_degree;
    let samples: Vec<Vec<(f64, f64)>> = spans
        .iter()
        .map(|s| {
            s.sample_curve(config.sampling_interval)
                .iter()
                .map(|p| frame.to_page(p))
                .collect()
        })
        .collect();
    let span_heights: Vec<f64> = samples
        .iter()
        .map(|pts| pts.iter().map(|(_, y)| y).sum::<f64>() / pts.len().max(1) as f64)
        .collect();

    let rows: usize = samples.iter().map(Vec::len).sum();
    let cols = spans.len() + 2 * degree;
    let mut a = DMatrix::<f64>::zeros(rows, cols);
    let mut b = DVector::<f64>::zeros(rows);

    let mut r = 0;
    for (k, pts) in samples.iter().enumerate() {
        let ybar = span_heights[k];
        for &(x, y) in pts {
            a[(r, k)] = 1.0;
            let mut power = 1.0;
            for j in 0..degree {
                power *= x;
                a[(r, spans.len() + j)] = power;
                a[(r, spans.len() + degree + j)] = power * ybar;
            }
            b[r] = y;
            r += 1;
        }
    }

    let solution = least_squares(a.clone(), b.clone())
        .ok_or_else(|| FolioError::DewarpUnstable("singular least-squares system".into()))?;
    let residual = &a * &solution - &b;
    let rms_residual = (residual.norm_squared() / rows as f64).sqrt();

    let model = DewarpModel {
        offsets: solution.rows(0, spans.len()).iter().copied().collect(),
        span_heights,
        a: solution.rows(spans.len(), degree).iter().copied().collect(),
        b: solution.rows(spans.len() + degree, degree).iter().copied().collect(),
        rms_residual,
    };

    // Page units span 2 over the full height.
    let max_shift = model.max_displacement() * 0.5;
    debug!(max_shift, rms_residual, "Page model fitted");
    if !max_shift.is_finite() || max_shift > config.max_shift_fraction {
        return Err(FolioError::DewarpUnstable(format!(
            "maximum shift {:.3} of page height exceeds {:.3}",
            max_shift, config.max_shift_fraction
        )));
    }
    Ok(model)
}
