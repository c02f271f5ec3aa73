//! 2-D trilateration from three anchors
//!
//! The default [`Method::Linear`] subtracts the circle equations of anchors
//! 1/2 and 2/3, which leaves two linear equations (the radical lines):
//!
//! ```text
//! A = 2(x2-x1); B = 2(y2-y1); C = d1²-d2²-x1²+x2²-y1²+y2²
//! D = 2(x3-x2); E = 2(y3-y2); F = d2²-d3²-x2²+x3²-y2²+y3²
//! x = (F·B - E·C) / (B·D - E·A)
//! y = (F·A - D·C) / (A·E - D·B)
//! ```
//!
//! A denominator that vanishes relative to its two products means the anchors
//! are collinear and no unique position exists.

use core::fmt;

/// Tolerance (metres) below which the geometric method treats anchors as collinear
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Rounding headroom, in units of `f64::EPSILON`, for the linear denominators
const DENOMINATOR_ULPS: f64 = 16.0;

/// Fixed position of an anchor, in metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        libm::sqrt(dx * dx + dy * dy)
    }
}

/// Solver input: an anchor position with the range measured to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub distance: f64,
}

impl Anchor {
    pub const fn new(x: f64, y: f64, distance: f64) -> Self {
        Self { x, y, distance }
    }
}

/// Solved tag position, in metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Root-mean-square mismatch between measured ranges and the ranges this
    /// position implies
    pub fn residual(&self, anchors: &[Anchor; 3]) -> f64 {
        let here = Point::new(self.x, self.y);
        let sum: f64 = anchors
            .iter()
            .map(|a| {
                let error = here.distance_to(&Point::new(a.x, a.y)) - a.distance;
                error * error
            })
            .sum();
        libm::sqrt(sum / anchors.len() as f64)
    }
}

/// Reasons a position cannot be solved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverError {
    /// Anchor geometry admits no unique solution (collinear or coincident anchors)
    Degenerate,
    /// A range was zero, negative or not a number
    NonPositiveDistance,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Degenerate => f.write_str("degenerate anchor geometry"),
            SolverError::NonPositiveDistance => f.write_str("non-positive distance"),
        }
    }
}

/// Trilateration algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Intersection of the two radical lines (closed form)
    #[default]
    Linear,
    /// Solve in a local frame spanned by anchors 1 and 2, then map back
    Geometric,
}

/// Solve with the chosen method after checking every range is positive
pub fn solve(method: Method, anchors: &[Anchor; 3]) -> Result<Position, SolverError> {
    if !anchors.iter().all(|a| a.distance > 0.0) {
        return Err(SolverError::NonPositiveDistance);
    }

    match method {
        Method::Linear => trilaterate(anchors),
        Method::Geometric => trilaterate_geometric(anchors),
    }
}

/// True when `value` is within rounding noise of the products it came from
fn is_negligible(value: f64, scale: f64) -> bool {
    value.abs() <= f64::EPSILON * DENOMINATOR_ULPS * scale
}

/// Radical-line intersection of anchors 1/2 and 2/3
pub fn trilaterate(anchors: &[Anchor; 3]) -> Result<Position, SolverError> {
    let [a1, a2, a3] = anchors;

    let a = 2.0 * (a2.x - a1.x);
    let b = 2.0 * (a2.y - a1.y);
    let c = a1.distance * a1.distance - a2.distance * a2.distance - a1.x * a1.x + a2.x * a2.x
        - a1.y * a1.y
        + a2.y * a2.y;
    let d = 2.0 * (a3.x - a2.x);
    let e = 2.0 * (a3.y - a2.y);
    let f = a2.distance * a2.distance - a3.distance * a3.distance - a2.x * a2.x + a3.x * a3.x
        - a2.y * a2.y
        + a3.y * a3.y;

    let x_den = b * d - e * a;
    let y_den = a * e - d * b;
    let scale = (b * d).abs().max((e * a).abs());
    if is_negligible(x_den, scale) || is_negligible(y_den, scale) {
        return Err(SolverError::Degenerate);
    }

    Ok(Position {
        x: (f * b - e * c) / x_den,
        y: (f * a - d * c) / y_den,
    })
}

/// Solve in the frame with `ex` pointing from anchor 1 to anchor 2
pub fn trilaterate_geometric(anchors: &[Anchor; 3]) -> Result<Position, SolverError> {
    let [a1, a2, a3] = anchors;
    let p1 = Point::new(a1.x, a1.y);

    let baseline = p1.distance_to(&Point::new(a2.x, a2.y));
    if baseline <= COLLINEAR_TOLERANCE {
        return Err(SolverError::Degenerate);
    }
    let ex = ((a2.x - a1.x) / baseline, (a2.y - a1.y) / baseline);

    let aux = (a3.x - a1.x, a3.y - a1.y);
    let i = ex.0 * aux.0 + ex.1 * aux.1;

    let perp = (aux.0 - i * ex.0, aux.1 - i * ex.1);
    let perp_len = libm::sqrt(perp.0 * perp.0 + perp.1 * perp.1);
    if perp_len <= COLLINEAR_TOLERANCE {
        return Err(SolverError::Degenerate);
    }
    let ey = (perp.0 / perp_len, perp.1 / perp_len);
    let j = ey.0 * aux.0 + ey.1 * aux.1;

    let (d1, d2, d3) = (a1.distance, a2.distance, a3.distance);
    let x = (d1 * d1 - d2 * d2 + baseline * baseline) / (2.0 * baseline);
    let y = (d1 * d1 - d3 * d3 + i * i + j * j) / (2.0 * j) - i * x / j;

    Ok(Position {
        x: a1.x + x * ex.0 + y * ey.0,
        y: a1.y + x * ex.1 + y * ey.1,
    })
}
