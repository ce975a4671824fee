//! This module defines the properties and storage of reconstructed events
//!
//! An [`EventRecord`] is the decoded form of one collider event as handed
//! over by the upstream ntuple reader: per-category candidate lists, the
//! missing-transverse-energy pseudo-object and the generator weight. The
//! object classifier turns it into a [`SelectedEvent`] with one object per
//! analysis role, or into an explicit [`Rejection`].

use crate::{
    momentum::{Kinematics, Momentum},
    numeric::Float,
};
use std::fmt::{self, Display};

/// One reconstructed physics object, immutable once decoded
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Reconstructed 4-momentum
    pub momentum: Momentum,

    /// Electric charge in units of e
    pub charge: i32,

    /// Identified as originating from a bottom quark
    pub b_tag: bool,

    /// Identified as a hadronically decaying tau
    pub tau_tag: bool,
}
//
impl Candidate {
    /// An untagged, chargeless candidate (light leptons carry their charge
    /// but no jet tags)
    pub fn new(momentum: Momentum, charge: i32) -> Self {
        Self {
            momentum,
            charge,
            b_tag: false,
            tau_tag: false,
        }
    }
}

/// Decoded per-event object collections, in the categories exposed by the
/// upstream reader
#[derive(Clone, Debug)]
pub struct EventRecord {
    /// Reconstructed jets (including b-tagged and tau-tagged ones)
    pub jets: Vec<Candidate>,

    /// Reconstructed electrons
    pub electrons: Vec<Candidate>,

    /// Reconstructed muons
    pub muons: Vec<Candidate>,

    /// Missing transverse energy pseudo-object
    pub met: Momentum,

    /// Generator weight (cross-section normalization)
    pub weight: Float,
}

/// Analysis roles that the classifier must fill for an event to survive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Leading b-tagged jet
    BTag,

    /// Leading remaining jet, distinct from the chosen b-tagged jet
    SecondaryJet,

    /// Leading positively charged tau candidate
    TauPlus,

    /// Leading negatively charged tau candidate
    TauMinus,
}
//
impl Display for Role {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::BTag => "b-tagged jet",
            Role::SecondaryJet => "secondary jet",
            Role::TauPlus => "tau+ candidate",
            Role::TauMinus => "tau- candidate",
        };
        write!(fmt, "{}", name)
    }
}

/// Why an event fell out of the pipeline before any kinematic cut
///
/// These are expected physics outcomes, not errors: they are tallied by the
/// cutflow and never propagated as failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Missing transverse energy below the preselection threshold
    SoftMet,

    /// No candidate survived the thresholds for this role
    Unfilled(Role),
}
//
impl Display for Rejection {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SoftMet => write!(fmt, "missing energy below threshold"),
            Rejection::Unfilled(role) => write!(fmt, "no {}", role),
        }
    }
}

/// The complete, disjoint role assignment for one accepted event
///
/// Every field holds a distinct reconstructed object; the classifier
/// guarantees that the secondary jet is not the b-tagged jet (by identity,
/// not just by tag) and that the tau pair is opposite-sign.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedEvent {
    /// Leading b-tagged jet
    pub btag: Candidate,

    /// Secondary jet
    pub jet: Candidate,

    /// Leading tau+ candidate
    pub tau_plus: Candidate,

    /// Leading tau- candidate
    pub tau_minus: Candidate,

    /// Missing transverse energy pseudo-object
    pub met: Momentum,

    /// Generator weight carried through from the record
    pub weight: Float,
}
//
impl SelectedEvent {
    /// The higher-pt tau candidate of the pair
    pub fn leading_tau(&self) -> &Candidate {
        if self.tau_plus.momentum.pt() >= self.tau_minus.momentum.pt() {
            &self.tau_plus
        } else {
            &self.tau_minus
        }
    }
}
