//! Derived kinematic observables for selected events
//!
//! Everything in here is a pure function of the selected 4-momenta. The
//! per-variant numeric differences of the production studies (bisector
//! projection fractions, visible-mass conventions, hypothesis masses) are
//! explicit configuration, not per-copy constants.

use crate::{
    event::SelectedEvent,
    momentum::{Kinematics, Momentum, X, Y},
    mt2::{mt2, mt2_of, VisibleMass},
    numeric::Float,
    pairing,
};
use nalgebra::Vector2;
use prefix_num_ops::real::*;

/// Number of bisector projection fractions evaluated per event
pub const NUM_DZETA_ALPHAS: usize = 3;

/// Configuration of the discriminant suite
#[derive(Debug)]
pub struct DiscriminantConfig {
    /// Bisector projection fractions for the DZeta family
    pub dzeta_alphas: [Float; NUM_DZETA_ALPHAS],

    /// Visible-mass convention entering MT2
    pub visible_mass: VisibleMass,

    /// Absolute MT2 tolerance (0 = machine precision)
    pub mt2_precision: Float,
}

/// The full set of per-event scalar observables
///
/// Produced once per selected event and handed to the downstream
/// histogramming collaborator together with the event weight.
#[derive(Clone, Debug)]
pub struct DiscriminantSet {
    /// Resolved pair mass, max M of the winning jet-tau permutation
    pub pair_mass: Float,

    /// Invariant mass of the tau pair
    pub ditau_mass: Float,

    /// Transverse momentum of the tau pair
    pub ditau_pt: Float,

    /// Missing transverse energy
    pub met: Float,

    /// Missing transverse energy over the ditau mass
    pub normalized_met: Float,

    /// Scalar hadronic minus leptonic transverse momentum sum
    pub ht_lt: Float,

    /// Stransverse mass of the tau pair against the missing momentum
    pub mt2: Float,

    /// MT2 recomputed in the ditau-plane frame after recoil compensation
    pub unboosted_mt2: Float,

    /// HT - LT style sum of the ditau-plane projected objects, minus the
    /// projected missing energy
    pub primed_ht_lt: Float,

    /// DZeta at each configured projection fraction
    pub dzeta: [Float; NUM_DZETA_ALPHAS],

    /// Transverse mass of the leading tau against the missing momentum
    pub mt_lead: Float,

    /// Total transverse mass of the tau pair plus missing momentum
    pub total_mt: Float,

    /// Symmetrized heavy pair mass of the (tau, tau) x (b, jet) system
    pub mass_hypothesis: Float,

    /// Angular separation of the tau pair
    pub dr_taus: Float,

    /// Angular separation of the two jets
    pub dr_jets: Float,

    /// Angular separation of the resolved b-tau pair
    pub dr_pair: Float,

    /// |delta phi| between the leading tau and the missing momentum
    pub dphi_lead_tau_met: Float,

    /// max |delta phi(tau, met)| - |delta phi(tau, tau)|, separating
    /// back-to-back topologies from recoiling ones
    pub topology: Float,
}
//
impl DiscriminantConfig {
    /// Compute the full discriminant set for one selected event
    pub fn compute(&self, event: &SelectedEvent) -> DiscriminantSet {
        let btag = &event.btag.momentum;
        let jet = &event.jet.momentum;
        let tau_plus = &event.tau_plus.momentum;
        let tau_minus = &event.tau_minus.momentum;
        let met = &event.met;
        let lead_tau = &event.leading_tau().momentum;

        let resolved = pairing::resolve(btag, jet, tau_plus, tau_minus);
        let ditau = tau_plus + tau_minus;
        let ditau_mass = ditau.invariant_mass();

        let mut dzeta_values = [0.; NUM_DZETA_ALPHAS];
        for (value, &alpha) in dzeta_values.iter_mut().zip(self.dzeta_alphas.iter()) {
            *value = dzeta(tau_plus, tau_minus, met, alpha);
        }

        let unboosted = UnboostedSystem::build(event);

        DiscriminantSet {
            pair_mass: resolved.pair_mass,
            ditau_mass,
            ditau_pt: ditau.pt(),
            met: met.pt(),
            normalized_met: if ditau_mass > 0. {
                met.pt() / ditau_mass
            } else {
                0.
            },
            ht_lt: btag.pt() + jet.pt() - tau_plus.pt() - tau_minus.pt(),
            mt2: mt2_of(tau_plus, tau_minus, met, self.visible_mass, self.mt2_precision),
            unboosted_mt2: unboosted.mt2(
                tau_plus,
                tau_minus,
                self.visible_mass,
                self.mt2_precision,
            ),
            primed_ht_lt: unboosted.primed_ht_lt,
            dzeta: dzeta_values,
            mt_lead: transverse_mass(lead_tau, met),
            total_mt: total_transverse_mass(tau_plus, tau_minus, met),
            mass_hypothesis: mass_hypothesis(tau_plus, tau_minus, btag, jet),
            dr_taus: tau_plus.delta_r(tau_minus),
            dr_jets: btag.delta_r(jet),
            dr_pair: btag.delta_r(&resolved.partner_of_first),
            dphi_lead_tau_met: abs(lead_tau.delta_phi(met)),
            topology: abs(tau_plus.delta_phi(met)).max(abs(tau_minus.delta_phi(met)))
                - abs(tau_plus.delta_phi(tau_minus)),
        }
    }
}

/// DZeta: missing and visible transverse momenta projected on the bisector
/// of the two visible objects, combined as `p_miss - alpha * p_vis`
///
/// The bisector is `|p2| p1 + |p1| p2` in the transverse plane. A
/// degenerate bisector (back-to-back visibles of equal momentum, or zero
/// vectors) has no direction to project on; 0 is returned.
pub fn dzeta(vis1: &Momentum, vis2: &Momentum, miss: &Momentum, alpha: Float) -> Float {
    let p1 = Vector2::new(vis1[X], vis1[Y]);
    let p2 = Vector2::new(vis2[X], vis2[Y]);
    let zeta = p1 * p2.norm() + p2 * p1.norm();
    let zeta_mag = zeta.norm();
    if zeta_mag == 0. {
        return 0.;
    }
    let zeta_hat = zeta / zeta_mag;
    let p_vis = (p1 + p2).dot(&zeta_hat);
    let p_miss = Vector2::new(miss[X], miss[Y]).dot(&zeta_hat);
    p_miss - alpha * p_vis
}

/// Transverse mass of a visible object against the missing momentum
pub fn transverse_mass(k: &Momentum, miss: &Momentum) -> Float {
    let radicand = 2. * k.pt() * miss.pt() * (1. - cos(k.delta_phi(miss)));
    sqrt(radicand.max(0.))
}

/// Total transverse mass of two visibles plus the missing momentum:
/// the scalar pt sum squared minus the squared invariant mass of the
/// summed 4-vector
pub fn total_transverse_mass(p1: &Momentum, p2: &Momentum, miss: &Momentum) -> Float {
    let scalar = p1.pt() + p2.pt() + miss.pt();
    let sum = p1 + p2 + miss;
    let mass = sum.invariant_mass();
    sqrt((scalar * scalar - mass * mass).max(0.))
}

/// Candidate mass for reconstructing a heavy two-body decay
///
/// Both jet assignments are tried; the permutation with the more symmetric
/// mass pair wins and its heavier mass is reported. Callers compare the
/// result to the mass region of the decay they are after (top, W) via the
/// configured thresholds; the target mass itself does not enter the
/// arithmetic.
pub fn mass_hypothesis(
    tau: &Momentum,
    lepton: &Momentum,
    jet1: &Momentum,
    jet2: &Momentum,
) -> Float {
    pairing::symmetrized_pair_mass(jet1, jet2, tau, lepton)
}

/// The event re-expressed in the frame of the ditau plane, with the dijet
/// recoil added to every leg to compensate the parent system's boost
struct UnboostedSystem {
    visible_plus: Momentum,
    visible_minus: Momentum,
    missing: Momentum,
    primed_ht_lt: Float,
}
//
impl UnboostedSystem {
    fn build(event: &SelectedEvent) -> Self {
        let btag = &event.btag.momentum;
        let jet = &event.jet.momentum;
        let tau_plus = &event.tau_plus.momentum;
        let tau_minus = &event.tau_minus.momentum;

        // The recoil and the missing momentum live partly out of the ditau
        // plane; project them in before the change of basis
        let dijet = btag + jet;
        let recoil = dijet
            .plane_projection(tau_plus, tau_minus)
            .change_basis(tau_plus, tau_minus);
        let met_prime = event
            .met
            .plane_projection(tau_plus, tau_minus)
            .change_basis(tau_plus, tau_minus);

        let tau_plus_prime = tau_plus.change_basis(tau_plus, tau_minus);
        let tau_minus_prime = tau_minus.change_basis(tau_plus, tau_minus);
        let btag_prime = btag.change_basis(tau_plus, tau_minus);
        let jet_prime = jet.change_basis(tau_plus, tau_minus);

        Self {
            visible_plus: tau_plus_prime + recoil,
            visible_minus: tau_minus_prime + recoil,
            missing: met_prime + recoil,
            primed_ht_lt: btag_prime.pt() + jet_prime.pt()
                - tau_plus_prime.pt()
                - tau_minus_prime.pt()
                - met_prime.pt(),
        }
    }

    /// MT2 of the unboosted legs; the visible-mass convention is resolved
    /// on the lab-frame taus, the transverse momenta are the unboosted ones
    fn mt2(
        &self,
        tau_plus: &Momentum,
        tau_minus: &Momentum,
        visible_mass: VisibleMass,
        precision: Float,
    ) -> Float {
        let (mass_a, mass_b) = visible_mass.resolve(tau_plus, tau_minus);
        mt2(
            mass_a,
            self.visible_plus[X],
            self.visible_plus[Y],
            mass_b,
            self.visible_minus[X],
            self.visible_minus[Y],
            self.missing[X],
            self.missing[Y],
            0.,
            0.,
            precision,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Candidate;
    use crate::momentum::{from_pt_eta_phi_energy, from_pt_eta_phi_mass};
    use crate::numeric::floats::consts::PI;

    fn config() -> DiscriminantConfig {
        DiscriminantConfig {
            dzeta_alphas: [0.85, 0.50, 0.15],
            visible_mass: VisibleMass::Leading,
            mt2_precision: 0.,
        }
    }

    fn tau_candidate(pt: Float, eta: Float, phi: Float, charge: i32) -> Candidate {
        Candidate {
            momentum: from_pt_eta_phi_mass(pt, eta, phi, 1.77682),
            charge,
            b_tag: false,
            tau_tag: true,
        }
    }

    fn selected_event() -> SelectedEvent {
        SelectedEvent {
            btag: Candidate {
                momentum: from_pt_eta_phi_mass(50., 0.2, 0.1, 4.8),
                charge: 0,
                b_tag: true,
                tau_tag: false,
            },
            jet: Candidate {
                momentum: from_pt_eta_phi_mass(45., -0.3, 2.9, 1.0),
                charge: 0,
                b_tag: false,
                tau_tag: false,
            },
            tau_plus: tau_candidate(80., 0., 0., 1),
            tau_minus: tau_candidate(75., 0.1, 3.0, -1),
            met: from_pt_eta_phi_energy(40., 0., 1.5, 40.),
            weight: 1.,
        }
    }

    #[test]
    fn transverse_mass_matches_the_closed_form() {
        let k = from_pt_eta_phi_mass(60., 0.5, 0.3, 0.);
        let miss = from_pt_eta_phi_energy(40., 0., 2.0, 40.);
        let expected = sqrt(2. * 60. * 40. * (1. - cos(0.3 - 2.0)));
        assert!((transverse_mass(&k, &miss) - expected).abs() < 1e-9);
    }

    #[test]
    fn transverse_mass_of_zero_vectors_is_zero() {
        let zero = Momentum::zeros();
        assert_eq!(transverse_mass(&zero, &zero), 0.);
    }

    #[test]
    fn dzeta_is_monotonic_in_alpha() {
        // Symmetric visibles with the missing momentum along the bisector:
        // the visible projection is positive, so DZeta falls with alpha
        let vis1 = from_pt_eta_phi_mass(70., 0., 0.5, 0.);
        let vis2 = from_pt_eta_phi_mass(70., 0., -0.5, 0.);
        let miss = from_pt_eta_phi_energy(30., 0., 0., 30.);
        let high = dzeta(&vis1, &vis2, &miss, 0.15);
        let mid = dzeta(&vis1, &vis2, &miss, 0.50);
        let low = dzeta(&vis1, &vis2, &miss, 0.85);
        assert!(high > mid && mid > low);
        // Linearity in alpha: equal spacing in alpha, equal spacing in value
        assert!(((high - mid) - (mid - low)).abs() < 1e-9);
    }

    #[test]
    fn dzeta_with_degenerate_bisector_is_zero() {
        let vis1 = from_pt_eta_phi_mass(70., 0., 0., 0.);
        let vis2 = from_pt_eta_phi_mass(70., 0., PI, 0.);
        let miss = from_pt_eta_phi_energy(30., 0., 1., 30.);
        assert_eq!(dzeta(&vis1, &vis2, &miss, 0.85), 0.);
        assert_eq!(dzeta(&Momentum::zeros(), &vis2, &Momentum::zeros(), 0.85), 0.);
    }

    #[test]
    fn mass_hypothesis_reports_the_symmetric_permutation() {
        let tau = from_pt_eta_phi_mass(80., 0., 0., 1.777);
        let lepton = from_pt_eta_phi_mass(40., 0.4, -2.5, 0.1057);
        let jet1 = from_pt_eta_phi_mass(60., 0.2, 0.1, 4.8);
        let jet2 = from_pt_eta_phi_mass(45., -0.3, 2.9, 0.);

        let m_11 = (tau + jet1).invariant_mass();
        let m_22 = (lepton + jet2).invariant_mass();
        let m_12 = (tau + jet2).invariant_mass();
        let m_21 = (lepton + jet1).invariant_mass();
        let expected = if (m_11 - m_22).abs() <= (m_12 - m_21).abs() {
            m_11.max(m_22)
        } else {
            m_12.max(m_21)
        };
        assert!((mass_hypothesis(&tau, &lepton, &jet1, &jet2) - expected).abs() < 1e-9);
    }

    #[test]
    fn full_set_is_finite_and_consistent() {
        let set = config().compute(&selected_event());
        assert!(set.pair_mass > 0.);
        assert!(set.ditau_mass > 0.);
        assert!(set.mt2 > 0.);
        assert!(set.unboosted_mt2.is_finite());
        assert!(set.primed_ht_lt.is_finite());
        assert!((set.met - 40.).abs() < 1e-9);
        assert!((set.normalized_met - 40. / set.ditau_mass).abs() < 1e-9);
        assert!((set.ht_lt - (50. + 45. - 80. - 75.)).abs() < 1e-9);
        assert!(set.dr_taus > 0.);
        assert!(set.dphi_lead_tau_met >= 0. && set.dphi_lead_tau_met <= PI);
        for value in set.dzeta {
            assert!(value.is_finite());
        }
    }

    #[test]
    fn zeroed_event_yields_defined_values_everywhere() {
        let zero_candidate = Candidate::new(Momentum::zeros(), 0);
        let event = SelectedEvent {
            btag: zero_candidate,
            jet: zero_candidate,
            tau_plus: Candidate::new(Momentum::zeros(), 1),
            tau_minus: Candidate::new(Momentum::zeros(), -1),
            met: Momentum::zeros(),
            weight: 1.,
        };
        let set = config().compute(&event);
        assert!(set.mt2 == 0.);
        assert!(set.unboosted_mt2 == 0.);
        assert!(set.normalized_met == 0.);
        for value in [
            set.pair_mass,
            set.ditau_mass,
            set.ht_lt,
            set.primed_ht_lt,
            set.mt_lead,
            set.total_mt,
            set.mass_hypothesis,
            set.dr_taus,
            set.dr_jets,
            set.dr_pair,
            set.dphi_lead_tau_met,
            set.topology,
        ] {
            assert!(value.is_finite());
        }
    }

    #[test]
    fn unboosted_recoil_compensation_shifts_every_leg_equally() {
        let event = selected_event();
        let system = UnboostedSystem::build(&event);
        let shift_plus = system.visible_plus
            - event
                .tau_plus
                .momentum
                .change_basis(&event.tau_plus.momentum, &event.tau_minus.momentum);
        let shift_minus = system.visible_minus
            - event
                .tau_minus
                .momentum
                .change_basis(&event.tau_plus.momentum, &event.tau_minus.momentum);
        assert!((shift_plus - shift_minus).norm() < 1e-9);
    }
}
