//! Natural cubic splines through control points, and Bezier flattening.

use crate::coords::PointF;

/// Chords per spline segment when a curve is flattened.
pub const CURVE_STEPS: usize = 24;

/// One segment `a + b*u + c*u^2 + d*u^3`, with the knot derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubic {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    pub d1: f64,
    pub d2: f64,
}

impl Cubic {
    fn new(a: f64, b: f64, c: f64, d: f64, d1: f64, d2: f64) -> Self {
        Self { a, b, c, d, d1, d2 }
    }

    pub fn eval(&self, u: f64) -> f64 {
        ((self.d * u + self.c) * u + self.b) * u + self.a
    }
}

/// Open natural spline through all of `x`. Fewer than two knots give no
/// segments.
pub fn natural_cubic(x: &[f64]) -> Vec<Cubic> {
    if x.len() < 2 {
        return Vec::new();
    }
    let n = x.len() - 1;
    let mut gamma = vec![0.0; n + 1];
    let mut delta = vec![0.0; n + 1];
    let mut dd = vec![0.0; n + 1];

    gamma[0] = 0.5;
    for i in 1..n {
        gamma[i] = 1.0 / (4.0 - gamma[i - 1]);
    }
    gamma[n] = 1.0 / (2.0 - gamma[n - 1]);

    delta[0] = 3.0 * (x[1] - x[0]) * gamma[0];
    for i in 1..n {
        delta[i] = (3.0 * (x[i + 1] - x[i - 1]) - delta[i - 1]) * gamma[i];
    }
    delta[n] = (3.0 * (x[n] - x[n - 1]) - delta[n - 1]) * gamma[n];

    dd[n] = delta[n];
    for i in (0..n).rev() {
        dd[i] = delta[i] - gamma[i] * dd[i + 1];
    }

    (0..n)
        .map(|i| {
            Cubic::new(
                x[i],
                dd[i],
                3.0 * (x[i + 1] - x[i]) - 2.0 * dd[i] - dd[i + 1],
                2.0 * (x[i] - x[i + 1]) + dd[i] + dd[i + 1],
                dd[i],
                dd[i + 1],
            )
        })
        .collect()
}

/// Closed natural spline; the last segment joins the final knot back to the
/// first one.
pub fn natural_cubic_closed(x: &[f64]) -> Vec<Cubic> {
    if x.len() < 2 {
        return Vec::new();
    }
    let n = x.len() - 1;
    let mut w = vec![0.0; n + 1];
    let mut v = vec![0.0; n + 1];
    let mut y = vec![0.0; n + 1];
    let mut dd = vec![0.0; n + 1];

    let mut z = 0.25;
    w[1] = z;
    v[1] = z;
    y[0] = z * 3.0 * (x[1] - x[n]);
    let mut hh = 4.0;
    let mut ff = 3.0 * (x[0] - x[n - 1]);
    let mut gg = 1.0;
    for k in 1..n {
        z = 1.0 / (4.0 - v[k]);
        v[k + 1] = z;
        w[k + 1] = -z * w[k];
        y[k] = z * (3.0 * (x[k + 1] - x[k - 1]) - y[k - 1]);
        hh -= gg * w[k];
        ff -= gg * y[k - 1];
        gg *= -v[k];
    }
    hh -= (gg + 1.0) * (v[n] + w[n]);
    y[n] = ff - (gg + 1.0) * y[n - 1];

    dd[n] = y[n] / hh;
    dd[n - 1] = y[n - 1] - (v[n] + w[n]) * dd[n];
    for k in (0..n.saturating_sub(1)).rev() {
        dd[k] = y[k] - v[k + 1] * dd[k + 1] - w[k + 1] * dd[n];
    }

    let mut cubics: Vec<Cubic> = (0..n)
        .map(|k| {
            Cubic::new(
                x[k] as f32 as f64,
                dd[k],
                3.0 * (x[k + 1] - x[k]) - 2.0 * dd[k] - dd[k + 1],
                2.0 * (x[k] - x[k + 1]) + dd[k] + dd[k + 1],
                dd[k],
                dd[k + 1],
            )
        })
        .collect();
    cubics.push(Cubic::new(
        x[n] as f32 as f64,
        dd[n],
        3.0 * (x[0] - x[n]) - 2.0 * dd[n] - dd[0],
        2.0 * (x[n] - x[0]) + dd[n] + dd[0],
        dd[n],
        dd[0],
    ));
    cubics
}

/// Evaluates paired x/y splines into `segments * CURVE_STEPS + 1` vertices.
pub fn flatten_spline(xx: &[Cubic], yy: &[Cubic]) -> Vec<PointF> {
    let (Some(fx), Some(fy)) = (xx.first(), yy.first()) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(xx.len() * CURVE_STEPS + 1);
    out.push(PointF::new(fx.eval(0.0), fy.eval(0.0)));
    for (cx, cy) in xx.iter().zip(yy) {
        for j in 1..=CURVE_STEPS {
            let u = j as f64 / CURVE_STEPS as f64;
            out.push(PointF::new(cx.eval(u), cy.eval(u)));
        }
    }
    out
}

/// Splines for both axes through `points`.
pub fn spline_through(points: &[PointF], closed: bool) -> (Vec<Cubic>, Vec<Cubic>) {
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    if closed {
        (natural_cubic_closed(&xs), natural_cubic_closed(&ys))
    } else {
        (natural_cubic(&xs), natural_cubic(&ys))
    }
}

/// Cubic Bezier evaluated at `segments + 1` evenly spaced parameters.
pub fn bezier_points(p: [PointF; 4], segments: usize) -> Vec<PointF> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let u = i as f64 / segments as f64;
            let umu = 1.0 - u;
            let b = [umu * umu * umu, 3.0 * u * umu * umu, 3.0 * u * u * umu, u * u * u];
            PointF::new(
                p.iter().zip(b).map(|(q, w)| q.x * w).sum(),
                p.iter().zip(b).map(|(q, w)| q.y * w).sum(),
            )
        })
        .collect()
}
