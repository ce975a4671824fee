//! This module implements some domain-specific 4-momentum handling logic.
//!
//! Reconstructed objects come out of the event decoder in collider
//! coordinates (pt, eta, phi, mass-or-energy); everything downstream works
//! with cartesian 4-momenta, so the constructors here do the translation
//! once per object.

use crate::numeric::{floats::consts::PI, Float};
use nalgebra::{SVector, Vector3};
use prefix_num_ops::real::*;

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Relativistic 4-momentum
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Build a 4-momentum from collider coordinates and a total energy
pub fn from_pt_eta_phi_energy(pt: Float, eta: Float, phi: Float, energy: Float) -> Momentum {
    Momentum::new(pt * cos(phi), pt * sin(phi), pt * sinh(eta), energy)
}

/// Build a 4-momentum from collider coordinates and an invariant mass
pub fn from_pt_eta_phi_mass(pt: Float, eta: Float, phi: Float, mass: Float) -> Momentum {
    let pz = pt * sinh(eta);
    let energy = sqrt(mass * mass + pt * pt + pz * pz);
    Momentum::new(pt * cos(phi), pt * sin(phi), pz, energy)
}

/// Wrap an azimuthal angle difference into (-pi, pi]
pub fn wrap_phi(dphi: Float) -> Float {
    let wrapped = (dphi + PI).rem_euclid(2. * PI) - PI;
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// Kinematic operations on reconstructed 4-momenta
pub trait Kinematics {
    /// Spatial part of the 4-momentum
    fn xyz(&self) -> Vector3<Float>;

    /// Transverse momentum
    fn pt(&self) -> Float;

    /// Azimuthal angle, in (-pi, pi]
    fn phi(&self) -> Float;

    /// Pseudorapidity
    ///
    /// A vector without transverse momentum has no defined pseudorapidity;
    /// 0 is returned in that case so that |eta| threshold cuts stay finite.
    fn eta(&self) -> Float;

    /// Invariant mass `sqrt(E^2 - |p|^2)`
    ///
    /// The radicand is clamped at zero: reconstructed objects can end up a
    /// rounding error below the light cone after coordinate translation.
    fn invariant_mass(&self) -> Float;

    /// Azimuthal separation from another momentum, wrapped into (-pi, pi]
    fn delta_phi(&self, other: &Momentum) -> Float;

    /// Angular separation `sqrt(deta^2 + dphi^2)` from another momentum
    fn delta_r(&self, other: &Momentum) -> Float;

    /// Re-express the spatial components in the orthonormal frame spanned
    /// by `b1` and the plane normal of (`b1`, `b2`), keeping the energy
    ///
    /// The frame is e1 = b1_hat, e3 = (b1 x b2)_hat, e2 = e3 x e1. When the
    /// spanning vectors are degenerate (zero or collinear) no frame exists
    /// and the input is returned unchanged.
    fn change_basis(&self, b1: &Momentum, b2: &Momentum) -> Momentum;

    /// Project the spatial components into the plane spanned by `b1` and
    /// `b2`, keeping the energy
    ///
    /// Degenerate spanning vectors return the input unchanged.
    fn plane_projection(&self, b1: &Momentum, b2: &Momentum) -> Momentum;
}
//
impl Kinematics for Momentum {
    fn xyz(&self) -> Vector3<Float> {
        Vector3::new(self[X], self[Y], self[Z])
    }

    fn pt(&self) -> Float {
        self[X].hypot(self[Y])
    }

    fn phi(&self) -> Float {
        self[Y].atan2(self[X])
    }

    fn eta(&self) -> Float {
        let pt = self.pt();
        if pt == 0. {
            0.
        } else {
            (self[Z] / pt).asinh()
        }
    }

    fn invariant_mass(&self) -> Float {
        let mass_sq = self[E] * self[E] - self.xyz().norm_squared();
        sqrt(mass_sq.max(0.))
    }

    fn delta_phi(&self, other: &Momentum) -> Float {
        wrap_phi(self.phi() - other.phi())
    }

    fn delta_r(&self, other: &Momentum) -> Float {
        let deta = self.eta() - other.eta();
        let dphi = self.delta_phi(other);
        deta.hypot(dphi)
    }

    fn change_basis(&self, b1: &Momentum, b2: &Momentum) -> Momentum {
        let b1v = b1.xyz();
        let normal = b1v.cross(&b2.xyz());
        let b1_mag = b1v.norm();
        let normal_mag = normal.norm();
        if b1_mag == 0. || normal_mag == 0. {
            return *self;
        }
        let e1 = b1v / b1_mag;
        let e3 = normal / normal_mag;
        let e2 = e3.cross(&e1);
        let v = self.xyz();
        Momentum::new(v.dot(&e1), v.dot(&e2), v.dot(&e3), self[E])
    }

    fn plane_projection(&self, b1: &Momentum, b2: &Momentum) -> Momentum {
        let normal = b1.xyz().cross(&b2.xyz());
        let normal_sq = normal.norm_squared();
        if normal_sq == 0. {
            return *self;
        }
        let v = self.xyz();
        let projected = v - normal * (v.dot(&normal) / normal_sq);
        Momentum::new(projected[0], projected[1], projected[2], self[E])
    }
}
