//! Per-event object classification into analysis roles
//!
//! Scans the decoded candidate collections and fills the four analysis
//! roles under configurable kinematic thresholds. Within a role the
//! leading-pt candidate wins; an exact pt tie keeps the candidate seen
//! first, which is an arbitrary but harmless choice since exact collisions
//! of reconstructed pt values do not occur in practice.

use crate::{
    event::{Candidate, EventRecord, Rejection, Role, SelectedEvent},
    momentum::Kinematics,
    numeric::Float,
};
use prefix_num_ops::real::*;

/// Kinematic thresholds for the object roles
///
/// Tau candidates are drawn from a pool of tau-tagged jets, electrons and
/// muons, each category with its own thresholds; the opposite-sign pair is
/// the leading positive and leading negative candidate of that pool.
#[derive(Debug)]
pub struct ObjectSelection {
    /// Minimum pt of the b-tagged jet
    pub btag_pt_min: Float,

    /// |eta| bound for the b-tagged jet
    pub btag_eta_max: Float,

    /// Minimum pt of the secondary jet
    pub jet_pt_min: Float,

    /// |eta| bound for the secondary jet
    pub jet_eta_max: Float,

    /// Minimum pt of a tau-tagged jet
    pub tau_pt_min: Float,

    /// |eta| bound for a tau-tagged jet
    pub tau_eta_max: Float,

    /// Minimum pt of an electron tau-candidate
    pub electron_pt_min: Float,

    /// |eta| bound for an electron tau-candidate
    pub electron_eta_max: Float,

    /// Minimum pt of a muon tau-candidate
    pub muon_pt_min: Float,

    /// |eta| bound for a muon tau-candidate
    pub muon_eta_max: Float,
}
//
impl ObjectSelection {
    /// Classify one event's candidates into a complete role assignment,
    /// or name the first role that could not be filled
    pub fn classify(&self, event: &EventRecord) -> Result<SelectedEvent, Rejection> {
        // Opposite-sign tau pair from the pooled tau candidates
        let mut tau_plus: Option<Candidate> = None;
        let mut tau_minus: Option<Candidate> = None;
        for jet in &event.jets {
            if jet.tau_tag
                && !jet.b_tag
                && passes(jet, self.tau_pt_min, self.tau_eta_max)
            {
                keep_leading_by_charge(&mut tau_plus, &mut tau_minus, jet);
            }
        }
        for electron in &event.electrons {
            if passes(electron, self.electron_pt_min, self.electron_eta_max) {
                keep_leading_by_charge(&mut tau_plus, &mut tau_minus, electron);
            }
        }
        for muon in &event.muons {
            if passes(muon, self.muon_pt_min, self.muon_eta_max) {
                keep_leading_by_charge(&mut tau_plus, &mut tau_minus, muon);
            }
        }
        let tau_plus = tau_plus.ok_or(Rejection::Unfilled(Role::TauPlus))?;
        let tau_minus = tau_minus.ok_or(Rejection::Unfilled(Role::TauMinus))?;

        // Leading b-tagged jet
        let mut btag: Option<(usize, Candidate)> = None;
        for (index, jet) in event.jets.iter().enumerate() {
            if jet.b_tag
                && !jet.tau_tag
                && passes(jet, self.btag_pt_min, self.btag_eta_max)
                && btag.map_or(true, |(_, best)| {
                    jet.momentum.pt() > best.momentum.pt()
                })
            {
                btag = Some((index, *jet));
            }
        }
        let (btag_index, btag) = btag.ok_or(Rejection::Unfilled(Role::BTag))?;

        // Leading remaining jet. The chosen b-jet is excluded by identity,
        // not by tag: another b-tagged jet is a valid secondary jet.
        let mut jet: Option<Candidate> = None;
        for (index, candidate) in event.jets.iter().enumerate() {
            if index != btag_index
                && !candidate.tau_tag
                && passes(candidate, self.jet_pt_min, self.jet_eta_max)
                && jet.map_or(true, |best| candidate.momentum.pt() > best.momentum.pt())
            {
                jet = Some(*candidate);
            }
        }
        let jet = jet.ok_or(Rejection::Unfilled(Role::SecondaryJet))?;

        Ok(SelectedEvent {
            btag,
            jet,
            tau_plus,
            tau_minus,
            met: event.met,
            weight: event.weight,
        })
    }
}

/// Threshold check shared by every role
fn passes(candidate: &Candidate, pt_min: Float, eta_max: Float) -> bool {
    let momentum = &candidate.momentum;
    momentum.pt() >= pt_min && abs(momentum.eta()) <= eta_max
}

/// Route a tau candidate into the slot of its charge sign, keeping the
/// leading-pt candidate per slot (chargeless candidates have no slot)
fn keep_leading_by_charge(
    plus: &mut Option<Candidate>,
    minus: &mut Option<Candidate>,
    candidate: &Candidate,
) {
    let slot = match candidate.charge {
        charge if charge > 0 => plus,
        charge if charge < 0 => minus,
        _ => return,
    };
    if slot.map_or(true, |best| candidate.momentum.pt() > best.momentum.pt()) {
        *slot = Some(*candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::momentum::{from_pt_eta_phi_mass, Momentum};

    fn thresholds() -> ObjectSelection {
        ObjectSelection {
            btag_pt_min: 20.,
            btag_eta_max: 2.4,
            jet_pt_min: 30.,
            jet_eta_max: 2.4,
            tau_pt_min: 70.,
            tau_eta_max: 2.4,
            electron_pt_min: 26.,
            electron_eta_max: 2.1,
            muon_pt_min: 23.,
            muon_eta_max: 2.4,
        }
    }

    fn jet(pt: Float, eta: Float, phi: Float, charge: i32, b_tag: bool, tau_tag: bool) -> Candidate {
        Candidate {
            momentum: from_pt_eta_phi_mass(pt, eta, phi, if b_tag { 4.8 } else { 1.0 }),
            charge,
            b_tag,
            tau_tag,
        }
    }

    fn complete_event() -> EventRecord {
        EventRecord {
            jets: vec![
                jet(50., 0.2, 0.1, 0, true, false),
                jet(45., -0.3, 2.9, 0, false, false),
                jet(80., 0., 0., 1, false, true),
                jet(75., 0.1, 3.0, -1, false, true),
            ],
            electrons: vec![],
            muons: vec![],
            met: from_pt_eta_phi_mass(40., 0., 1.5, 0.),
            weight: 1.,
        }
    }

    #[test]
    fn complete_event_fills_every_role() {
        let selected = thresholds().classify(&complete_event()).unwrap();
        assert!(selected.btag.b_tag);
        assert_eq!(selected.btag.momentum.pt().round(), 50.);
        assert_eq!(selected.jet.momentum.pt().round(), 45.);
        assert_eq!(selected.tau_plus.charge, 1);
        assert_eq!(selected.tau_minus.charge, -1);
    }

    #[test]
    fn missing_btag_is_reported_as_such() {
        let mut event = complete_event();
        event.jets.retain(|jet| !jet.b_tag);
        assert_eq!(
            thresholds().classify(&event),
            Err(Rejection::Unfilled(Role::BTag))
        );
    }

    #[test]
    fn same_sign_pair_fails_the_opposite_sign_requirement() {
        let mut event = complete_event();
        for jet in event.jets.iter_mut().filter(|jet| jet.tau_tag) {
            jet.charge = 1;
        }
        assert_eq!(
            thresholds().classify(&event),
            Err(Rejection::Unfilled(Role::TauMinus))
        );
    }

    #[test]
    fn below_threshold_tau_is_ignored() {
        let mut event = complete_event();
        // Drop the tau- below the 70 GeV threshold
        for jet in event.jets.iter_mut().filter(|jet| jet.charge == -1) {
            jet.momentum = from_pt_eta_phi_mass(60., 0.1, 3.0, 1.0);
        }
        assert_eq!(
            thresholds().classify(&event),
            Err(Rejection::Unfilled(Role::TauMinus))
        );
    }

    #[test]
    fn light_leptons_can_fill_a_tau_slot() {
        let mut event = complete_event();
        event.jets.retain(|jet| !(jet.tau_tag && jet.charge == -1));
        event.muons.push(Candidate::new(
            from_pt_eta_phi_mass(35., 0.4, -2.0, 0.1057),
            -1,
        ));
        let selected = thresholds().classify(&event).unwrap();
        assert_eq!(selected.tau_minus.charge, -1);
        assert_eq!(selected.tau_minus.momentum.pt().round(), 35.);
    }

    #[test]
    fn secondary_jet_excludes_the_chosen_btag_by_identity() {
        // Two b-tagged jets: the subleading one is a valid secondary jet
        let event = EventRecord {
            jets: vec![
                jet(50., 0.2, 0.1, 0, true, false),
                jet(40., -0.5, 1.2, 0, true, false),
                jet(80., 0., 0., 1, false, true),
                jet(75., 0.1, 3.0, -1, false, true),
            ],
            electrons: vec![],
            muons: vec![],
            met: Momentum::zeros(),
            weight: 1.,
        };
        let selected = thresholds().classify(&event).unwrap();
        assert_eq!(selected.btag.momentum.pt().round(), 50.);
        assert_eq!(selected.jet.momentum.pt().round(), 40.);
        assert!(selected.jet.b_tag);

        // With the b-jet alone on the jet side there is no secondary jet
        let mut lone = event;
        lone.jets.remove(1);
        assert_eq!(
            thresholds().classify(&lone),
            Err(Rejection::Unfilled(Role::SecondaryJet))
        );
    }

    #[test]
    fn eta_bound_applies_per_role() {
        let mut event = complete_event();
        // Push the secondary jet outside the tracker acceptance
        event.jets[1] = jet(45., 3.0, 2.9, 0, false, false);
        assert_eq!(
            thresholds().classify(&event),
            Err(Rejection::Unfilled(Role::SecondaryJet))
        );
    }
}
