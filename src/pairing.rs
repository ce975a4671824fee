//! Resolution of the jet-lepton pairing ambiguity
//!
//! With two jet-like and two lepton-like objects there are two ways to pair
//! them up. The right one (in the resonance-decay sense) is picked by mass
//! symmetrization: a correct assignment reconstructs two legs of comparable
//! mass, so the permutation whose two pair masses are closer together wins,
//! and the heavier of its two masses is the pair-mass discriminant.

use crate::{
    momentum::{Kinematics, Momentum},
    numeric::Float,
};
use prefix_num_ops::real::*;

/// Which of the two jet-lepton assignments the resolver picked
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permutation {
    /// (J1, L1) with (J2, L2)
    Direct,

    /// (J1, L2) with (J2, L1)
    Swapped,
}

/// Outcome of the pairing resolution
#[derive(Clone, Copy, Debug)]
pub struct ResolvedPair {
    /// The winning assignment
    pub permutation: Permutation,

    /// Lepton-like partner assigned to the first jet-like object
    pub partner_of_first: Momentum,

    /// The larger pair mass of the winning permutation
    pub pair_mass: Float,
}

/// Resolve the jet-lepton assignment for (`jet1`, `jet2`) x (`lep1`, `lep2`)
///
/// Pure and deterministic: an exact tie between the two permutations' mass
/// differences keeps the direct assignment.
pub fn resolve(
    jet1: &Momentum,
    jet2: &Momentum,
    lep1: &Momentum,
    lep2: &Momentum,
) -> ResolvedPair {
    let m_11 = (jet1 + lep1).invariant_mass();
    let m_22 = (jet2 + lep2).invariant_mass();
    let m_12 = (jet1 + lep2).invariant_mass();
    let m_21 = (jet2 + lep1).invariant_mass();

    if abs(m_11 - m_22) <= abs(m_12 - m_21) {
        ResolvedPair {
            permutation: Permutation::Direct,
            partner_of_first: *lep1,
            pair_mass: m_11.max(m_22),
        }
    } else {
        ResolvedPair {
            permutation: Permutation::Swapped,
            partner_of_first: *lep2,
            pair_mass: m_12.max(m_21),
        }
    }
}

/// The pair-mass discriminant alone, for callers that only need the scalar
pub fn symmetrized_pair_mass(
    jet1: &Momentum,
    jet2: &Momentum,
    lep1: &Momentum,
    lep2: &Momentum,
) -> Float {
    resolve(jet1, jet2, lep1, lep2).pair_mass
}
