//! Gas flow math utilities.
//!
//! Steady-state relations used across the pipeline model:
//!
//! - the squared-pressure drop constant `k = f·L/(D⁵·1000)` that couples
//!   segment flow to `P²(u) − P²(v)`
//! - Weymouth and Panhandle A capacity estimates
//! - Papay Z-factor and Swamee–Jain friction factor correlations
//! - piecewise-linear interpolation and the secant segments used to
//!   linearize `y = k·f²` for an LP back-end
//! - a quadratic root solver
//!
//! Pressures are absolute (psia), flows are MMscfd, lengths are miles, and
//! diameters are inches throughout.

use crate::units::{Inches, Miles, Mmscfd, Psia};

/// Standard (base) temperature in degrees Rankine
pub const BASE_TEMPERATURE_R: f64 = 520.0;
/// Standard (base) pressure in psia
pub const BASE_PRESSURE_PSIA: f64 = 14.73;
/// Pseudo-critical pressure of typical transmission-quality gas (psia)
pub const PSEUDO_CRITICAL_PRESSURE_PSIA: f64 = 667.0;
/// Pseudo-critical temperature of typical transmission-quality gas (°R)
pub const PSEUDO_CRITICAL_TEMPERATURE_R: f64 = 408.0;

/// Squared-pressure drop constant for a segment.
///
/// `k = f·L / (D⁵·1000)` with `L` in miles and `D` in inches, so that
/// `P²(u) − P²(v) = k·f·|f|` for a flow `f` in MMscfd. Computed once per
/// segment after loading.
pub fn pressure_drop_constant(friction_factor: f64, length: Miles, diameter: Inches) -> f64 {
    friction_factor * length.value() / (diameter.value().powi(5) * 1000.0)
}

/// Squared-pressure drop across a segment for a signed flow.
///
/// The drop follows the flow direction: reverse flow on a bidirectional
/// segment raises the downstream-squared pressure instead of lowering it.
pub fn squared_pressure_drop(k: f64, flow: Mmscfd) -> f64 {
    let f = flow.value();
    k * f * f.abs()
}

/// Downstream pressure given an upstream pressure, drop constant, and flow.
///
/// Returns `None` when the drop exceeds the available upstream pressure
/// (the flow is not physically sustainable without compression).
pub fn downstream_pressure(upstream: Psia, k: f64, flow: Mmscfd) -> Option<Psia> {
    let p2_squared = upstream.squared() - squared_pressure_drop(k, flow);
    if p2_squared < 0.0 {
        None
    } else {
        Some(Psia::from_squared(p2_squared))
    }
}

/// Weymouth capacity estimate for a segment (MMscfd).
///
/// `Q = 433.5·(Tb/Pb)·√[(P₁² − P₂²)·D^(16/3) / (G·Tf·L·Z)] / 10⁶`
///
/// with base conditions `Tb`/`Pb`, gas gravity `G`, flowing temperature `Tf`
/// (°R), and compressibility `Z`. The classic high-pressure transmission
/// correlation; conservative for small diameters.
#[allow(clippy::too_many_arguments)]
pub fn weymouth_capacity(
    upstream: Psia,
    downstream: Psia,
    diameter: Inches,
    length: Miles,
    gas_gravity: f64,
    flowing_temperature_r: f64,
    z_factor: f64,
) -> Mmscfd {
    let dp2 = (upstream.squared() - downstream.squared()).max(0.0);
    let scfd = 433.5 * (BASE_TEMPERATURE_R / BASE_PRESSURE_PSIA)
        * (dp2 * diameter.value().powf(16.0 / 3.0)
            / (gas_gravity * flowing_temperature_r * length.value() * z_factor))
            .sqrt();
    Mmscfd(scfd / 1.0e6)
}

/// Panhandle A capacity estimate for a segment (MMscfd).
///
/// Partially turbulent correlation; more optimistic than Weymouth at large
/// diameters. Uses a pipeline efficiency of 0.92.
#[allow(clippy::too_many_arguments)]
pub fn panhandle_a_capacity(
    upstream: Psia,
    downstream: Psia,
    diameter: Inches,
    length: Miles,
    gas_gravity: f64,
    flowing_temperature_r: f64,
    z_factor: f64,
) -> Mmscfd {
    let efficiency = 0.92;
    let dp2 = (upstream.squared() - downstream.squared()).max(0.0);
    let scfd = 435.87
        * efficiency
        * (BASE_TEMPERATURE_R / BASE_PRESSURE_PSIA).powf(1.0788)
        * (dp2 / (gas_gravity.powf(0.8539) * flowing_temperature_r * length.value() * z_factor))
            .powf(0.5394)
        * diameter.value().powf(2.6182);
    Mmscfd(scfd / 1.0e6)
}

/// Gas compressibility factor by the Papay correlation.
///
/// `Z = 1 − 3.53·Pr/10^(0.9813·Tr) + 0.274·Pr²/10^(0.8157·Tr)`
///
/// where `Pr`/`Tr` are pseudo-reduced pressure and temperature. Accurate to a
/// few percent for transmission conditions (Pr < 3).
pub fn z_factor(pressure: Psia, temperature_r: f64) -> f64 {
    let pr = pressure.value() / PSEUDO_CRITICAL_PRESSURE_PSIA;
    let tr = temperature_r / PSEUDO_CRITICAL_TEMPERATURE_R;
    1.0 - 3.53 * pr / 10.0_f64.powf(0.9813 * tr) + 0.274 * pr * pr / 10.0_f64.powf(0.8157 * tr)
}

/// Darcy friction factor by the Swamee–Jain explicit approximation.
///
/// `f = 0.25 / [log₁₀(ε/(3.7·D) + 5.74/Re^0.9)]²`
///
/// Valid for 5×10³ < Re < 10⁸ and 10⁻⁶ < ε/D < 10⁻². Laminar flows
/// (Re < 2300) fall back to `64/Re`.
pub fn friction_factor(reynolds: f64, relative_roughness: f64) -> f64 {
    if reynolds <= 0.0 {
        return 0.0;
    }
    if reynolds < 2300.0 {
        return 64.0 / reynolds;
    }
    let log_term = (relative_roughness / 3.7 + 5.74 / reynolds.powf(0.9)).log10();
    0.25 / (log_term * log_term)
}

/// A chord of the curve `y = k·x²` over one discretization interval.
///
/// Each secant lies above the curve inside its interval, so the family of
/// constraints `y ≥ slope·x + intercept` bounds `x²` from below in an LP.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Secant {
    pub x_lo: f64,
    pub x_hi: f64,
    pub slope: f64,
    pub intercept: f64,
}

impl Secant {
    /// Evaluate the chord at `x`
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Secant segments approximating `y = k·x²` over `[0, x_max]`.
///
/// The chord over `[xᵢ, xᵢ₊₁]` has slope `k·(xᵢ + xᵢ₊₁)` and intercept
/// `−k·xᵢ·xᵢ₊₁`. Used to emit the piecewise-linear pressure-drop
/// constraints; fidelity is controlled by `segments` (clamped to 1..=100).
pub fn quadratic_secants(k: f64, x_max: f64, segments: usize) -> Vec<Secant> {
    let n = segments.clamp(1, 100);
    let step = x_max / n as f64;
    (0..n)
        .map(|i| {
            let x_lo = step * i as f64;
            let x_hi = step * (i + 1) as f64;
            Secant {
                x_lo,
                x_hi,
                slope: k * (x_lo + x_hi),
                intercept: -k * x_lo * x_hi,
            }
        })
        .collect()
}

/// Piecewise-linear function given by breakpoints `(x, y)`, sorted by `x`.
///
/// Evaluation clamps outside the breakpoint range to the end values.
#[derive(Debug, Clone, Default)]
pub struct PiecewiseLinear {
    points: Vec<(f64, f64)>,
}

impl PiecewiseLinear {
    /// Build from breakpoints; sorts by x.
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Sample a function over `[lo, hi]` at `n + 1` evenly spaced breakpoints.
    pub fn sample(lo: f64, hi: f64, n: usize, f: impl Fn(f64) -> f64) -> Self {
        let n = n.max(1);
        let step = (hi - lo) / n as f64;
        let points = (0..=n)
            .map(|i| {
                let x = lo + step * i as f64;
                (x, f(x))
            })
            .collect();
        Self { points }
    }

    /// Interpolate at `x`
    pub fn eval(&self, x: f64) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        if x <= self.points[0].0 {
            return self.points[0].1;
        }
        if x >= self.points[self.points.len() - 1].0 {
            return self.points[self.points.len() - 1].1;
        }
        for window in self.points.windows(2) {
            let (x0, y0) = window[0];
            let (x1, y1) = window[1];
            if x >= x0 && x <= x1 {
                let t = (x - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        0.0
    }

    /// Breakpoints
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

/// Real roots of `a·x² + b·x + c = 0`, sorted ascending.
///
/// A degenerate leading coefficient falls back to the linear case; returns
/// `None` when there is no real solution.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    if a.abs() < 1e-14 {
        if b.abs() < 1e-14 {
            return None;
        }
        let root = -c / b;
        return Some((root, root));
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let r1 = (-b - sqrt_d) / (2.0 * a);
    let r2 = (-b + sqrt_d) / (2.0 * a);
    Some((r1.min(r2), r1.max(r2)))
}
