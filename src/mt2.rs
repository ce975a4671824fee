//! Asymmetric stransverse mass (MT2) via precision-bounded bisection
//!
//! MT2 bounds the mass of a pair-produced parent when each decay leg ends in
//! an invisible particle: it is the smallest parent-mass hypothesis for
//! which the observed missing transverse momentum can be split between the
//! two legs so that neither leg's transverse mass exceeds the hypothesis.
//!
//! For a trial value the set of invisible transverse momenta compatible
//! with one leg is the interior of a conic; the trial is feasible exactly
//! when the two legs' conics (one of them reflected through the measured
//! missing momentum) intersect. Feasibility is monotonic in the trial
//! value, so a bisection between the unconstrained lower bound and a
//! geometrically grown upper bound converges to MT2. Conic intersection is
//! decided algebraically from the characteristic cubic of the conic pencil,
//! which keeps the whole computation deterministic: identical inputs give
//! bit-identical results.

use crate::{
    momentum::{Kinematics, Momentum, X, Y},
    numeric::Float,
};
use nalgebra::Matrix3;
use prefix_num_ops::real::*;

/// Which visible mass enters each side of the MT2 computation
///
/// The analysis variants disagree on this: some reuse the first visible's
/// mass on both sides, some fix a light-lepton mass, some use each side's
/// own reconstructed mass. The convention is therefore an explicit input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VisibleMass {
    /// Each side uses its own reconstructed invariant mass
    Own,

    /// Both sides reuse the first (leading) visible's invariant mass
    Leading,

    /// Both sides use a fixed mass value
    Fixed(Float),
}
//
impl VisibleMass {
    /// Resolve the convention into the two masses entering the computation
    pub fn resolve(&self, vis_a: &Momentum, vis_b: &Momentum) -> (Float, Float) {
        match self {
            VisibleMass::Own => (vis_a.invariant_mass(), vis_b.invariant_mass()),
            VisibleMass::Leading => {
                let leading = vis_a.invariant_mass();
                (leading, leading)
            }
            VisibleMass::Fixed(mass) => (*mass, *mass),
        }
    }
}

/// Bisection step cap; 64 halvings exhaust a double-precision interval
const MAX_BISECTIONS: usize = 128;

/// Relative floor applied to the visible masses, in units of the event
/// scale. A massless visible turns its boundary conic into a parabola, for
/// which the pencil separation criterion breaks down; the floor keeps the
/// conics elliptical at a cost far below the precision anyone requests.
const MASS_FLOOR: Float = 1e-8;

/// Compute the asymmetric stransverse mass
///
/// `m_vis_*`/`p*_vis_*` describe the two visible legs, `p*_miss` the
/// missing transverse momentum, `chi_a`/`chi_b` the invisible-mass
/// hypotheses, and `precision` the absolute tolerance on the result
/// (`0.` asks for machine precision).
///
/// Degenerate input is handled with defined fallbacks rather than NaN:
/// an all-zero input returns 0, and configurations whose balancing search
/// cannot tighten the bound return the unconstrained lower bound
/// `max(m_vis_a + chi_a, m_vis_b + chi_b)`.
#[allow(clippy::too_many_arguments)]
pub fn mt2(
    m_vis_a: Float,
    px_vis_a: Float,
    py_vis_a: Float,
    m_vis_b: Float,
    px_vis_b: Float,
    py_vis_b: Float,
    px_miss: Float,
    py_miss: Float,
    chi_a: Float,
    chi_b: Float,
    precision: Float,
) -> Float {
    // Normalize by the overall momentum scale for numerical conditioning.
    // An all-zero (or non-finite) input has no scale and yields 0.
    let scale_sq = m_vis_a * m_vis_a
        + px_vis_a * px_vis_a
        + py_vis_a * py_vis_a
        + m_vis_b * m_vis_b
        + px_vis_b * px_vis_b
        + py_vis_b * py_vis_b
        + px_miss * px_miss
        + py_miss * py_miss
        + chi_a * chi_a
        + chi_b * chi_b;
    if !(scale_sq > 0. && scale_sq.is_finite()) {
        return 0.;
    }
    let scale = sqrt(scale_sq);
    let inv_scale = 1. / scale;

    let side_a = Side::new(
        (m_vis_a * inv_scale).max(MASS_FLOOR),
        px_vis_a * inv_scale,
        py_vis_a * inv_scale,
        (chi_a * inv_scale).max(0.),
    );
    let side_b = Side::new(
        (m_vis_b * inv_scale).max(MASS_FLOOR),
        px_vis_b * inv_scale,
        py_vis_b * inv_scale,
        (chi_b * inv_scale).max(0.),
    );
    let miss_x = px_miss * inv_scale;
    let miss_y = py_miss * inv_scale;

    // No splitting can push a leg below its unconstrained minimum
    let lower = side_a.min_mass().max(side_b.min_mass());

    let feasible = |mu: Float| {
        let conic_a = side_a.boundary_conic(mu);
        let conic_b = side_b.boundary_conic(mu).reflect_through(miss_x, miss_y);
        !disjoint(&conic_a, &conic_b)
    };

    // Grow the upper bound until the two regions meet. This always
    // terminates for finite kinematics; the growth cap is a safety net for
    // degenerate configurations, which then fall back to the lower bound.
    let mut hi = 2. * lower + 1.;
    let mut growths = 0;
    while !feasible(hi) {
        hi *= 2.;
        growths += 1;
        if growths > 64 {
            return lower * scale;
        }
    }

    // Bisect down to the requested precision (normalized units)
    let tol = if precision > 0. {
        precision * inv_scale
    } else {
        0.
    };
    let mut lo = lower;
    for _ in 0..MAX_BISECTIONS {
        let width = hi - lo;
        if width <= tol || width <= hi * 8. * Float::EPSILON {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if feasible(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi * scale
}

/// MT2 of two visible 4-momenta against a missing-momentum pseudo-object,
/// with massless invisibles and the given visible-mass convention
pub fn mt2_of(
    vis_a: &Momentum,
    vis_b: &Momentum,
    miss: &Momentum,
    visible_mass: VisibleMass,
    precision: Float,
) -> Float {
    let (mass_a, mass_b) = visible_mass.resolve(vis_a, vis_b);
    mt2(
        mass_a, vis_a[X], vis_a[Y], mass_b, vis_b[X], vis_b[Y], miss[X], miss[Y], 0., 0., precision,
    )
}

/// One decay leg: visible kinematics plus the invisible-mass hypothesis
struct Side {
    mass: Float,
    px: Float,
    py: Float,
    chi: Float,
    et_sq: Float,
}
//
impl Side {
    fn new(mass: Float, px: Float, py: Float, chi: Float) -> Self {
        Self {
            mass,
            px,
            py,
            chi,
            et_sq: mass * mass + px * px + py * py,
        }
    }

    /// Smallest transverse mass this leg can reach over all invisible momenta
    fn min_mass(&self) -> Float {
        self.mass + self.chi
    }

    /// Conic whose interior is the set of invisible transverse momenta
    /// giving this leg a transverse mass at most `mu`
    ///
    /// Squaring `mT^2 <= mu^2` around the invisible transverse energy turns
    /// the constraint into `F(q) <= 0` with F the quadratic form below
    /// (coefficients divided by a common factor 4).
    fn boundary_conic(&self, mu: Float) -> Conic {
        let d = mu * mu - self.mass * self.mass - self.chi * self.chi;
        Conic {
            xx: self.mass * self.mass + self.py * self.py,
            yy: self.mass * self.mass + self.px * self.px,
            xy: -self.px * self.py,
            x: -0.5 * d * self.px,
            y: -0.5 * d * self.py,
            cc: self.et_sq * self.chi * self.chi - 0.25 * d * d,
        }
    }
}

/// Symmetric conic `xx qx^2 + 2 xy qx qy + yy qy^2 + 2 x qx + 2 y qy + cc`,
/// interior where the form is negative
struct Conic {
    xx: Float,
    yy: Float,
    xy: Float,
    x: Float,
    y: Float,
    cc: Float,
}
//
impl Conic {
    /// Rewrite the conic in the other leg's variable: the legs share the
    /// missing momentum, `q_other = miss - q`
    fn reflect_through(&self, miss_x: Float, miss_y: Float) -> Conic {
        Conic {
            xx: self.xx,
            yy: self.yy,
            xy: self.xy,
            x: -(self.xx * miss_x + self.xy * miss_y + self.x),
            y: -(self.xy * miss_x + self.yy * miss_y + self.y),
            cc: self.xx * miss_x * miss_x
                + 2. * self.xy * miss_x * miss_y
                + self.yy * miss_y * miss_y
                + 2. * self.x * miss_x
                + 2. * self.y * miss_y
                + self.cc,
        }
    }

    fn matrix(&self) -> Matrix3<Float> {
        Matrix3::new(
            self.xx, self.xy, self.x, self.xy, self.yy, self.y, self.x, self.y, self.cc,
        )
    }
}

/// Adjugate of a 3x3 matrix (transposed cofactor matrix)
fn adjugate(m: &Matrix3<Float>) -> Matrix3<Float> {
    let c = |r1: usize, c1: usize, r2: usize, c2: usize| m[(r1, c1)] * m[(r2, c2)];
    Matrix3::new(
        c(1, 1, 2, 2) - c(1, 2, 2, 1),
        c(0, 2, 2, 1) - c(0, 1, 2, 2),
        c(0, 1, 1, 2) - c(0, 2, 1, 1),
        c(1, 2, 2, 0) - c(1, 0, 2, 2),
        c(0, 0, 2, 2) - c(0, 2, 2, 0),
        c(0, 2, 1, 0) - c(0, 0, 1, 2),
        c(1, 0, 2, 1) - c(1, 1, 2, 0),
        c(0, 1, 2, 0) - c(0, 0, 2, 1),
        c(0, 0, 1, 1) - c(0, 1, 1, 0),
    )
}

/// Decide whether two interior-negative ellipses are disjoint
///
/// Characteristic-cubic criterion: with `f(l) = det(l A + B)` made monic,
/// the ellipses are separated exactly when f has two distinct positive
/// roots (the remaining root of an ellipse pencil is negative). Tangency
/// produces a repeated root and counts as intersecting, which is the
/// conservative direction for the bisection.
fn disjoint(first: &Conic, second: &Conic) -> bool {
    let a = first.matrix();
    let b = second.matrix();
    let l3 = a.determinant();
    if l3 == 0. {
        return false;
    }
    let l2 = (adjugate(&a) * b).trace();
    let l1 = (adjugate(&b) * a).trace();
    let l0 = b.determinant();

    let ca = l2 / l3;
    let cb = l1 / l3;
    let cc = l0 / l3;

    // Cubic discriminant of the monic l^3 + ca l^2 + cb l + cc
    let disc = 18. * ca * cb * cc - 4. * ca * ca * ca * cc + ca * ca * cb * cb
        - 4. * cb * cb * cb
        - 27. * cc * cc;

    // Two distinct positive roots: all roots real and distinct (disc > 0),
    // root product positive-negative split (cc > 0), and not the
    // all-roots-negative sign pattern (ca > 0 and cb > 0)
    disc > 0. && cc > 0. && !(ca > 0. && cb > 0.)
}
