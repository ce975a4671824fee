//! Ordered selection cuts and their weighted bookkeeping
//!
//! Per event the pipeline evaluates every cut predicate independently (for
//! the correlation matrix) and gates the cumulative cutflow sequentially:
//! an event contributes to stage k only if it passed stages 0..k. All
//! tallies are weighted sums; an unweighted sample is the weight = 1 case.

use crate::{
    discrim::DiscriminantSet,
    event::{Rejection, Role},
    numeric::Float,
};
use prefix_num_ops::real::*;

/// One configured selection cut over the discriminant set
#[derive(Clone, Copy, Debug)]
pub enum Cut {
    /// Resolved pair mass above a threshold (heavy-resonance region)
    PairMass {
        /// Lower bound on the pair mass
        min: Float,
    },

    /// Missing energy small compared to the ditau mass
    NormalizedMet {
        /// Upper bound on met / M(tau, tau)
        max: Float,
    },

    /// Hadronic activity below the leptonic one
    HtLt {
        /// Upper bound on HT - LT
        max: Float,
    },

    /// Small stransverse mass in the unboosted frame
    UnboostedMt2 {
        /// Upper bound on the unboosted MT2
        max: Float,
    },
}
//
impl Cut {
    /// Stable stage name for reports
    pub fn name(&self) -> &'static str {
        match self {
            Cut::PairMass { .. } => "pair_mass",
            Cut::NormalizedMet { .. } => "normalized_met",
            Cut::HtLt { .. } => "ht_lt",
            Cut::UnboostedMt2 { .. } => "unboosted_mt2",
        }
    }

    /// Evaluate the cut predicate on one event's discriminants
    pub fn passes(&self, set: &DiscriminantSet) -> bool {
        match self {
            Cut::PairMass { min } => set.pair_mass > *min,
            Cut::NormalizedMet { max } => set.normalized_met < *max,
            Cut::HtLt { max } => set.ht_lt < *max,
            Cut::UnboostedMt2 { max } => set.unboosted_mt2 < *max,
        }
    }
}

/// The ordered cut sequence of the analysis
#[derive(Debug)]
pub struct Cutflow {
    /// Cut stages in gating order
    pub cuts: Vec<Cut>,
}
//
impl Cutflow {
    /// Evaluate every cut independently on one event
    pub fn evaluate(&self, set: &DiscriminantSet) -> Vec<bool> {
        self.cuts.iter().map(|cut| cut.passes(set)).collect()
    }

    /// Stage names in gating order
    pub fn names(&self) -> Vec<&'static str> {
        self.cuts.iter().map(Cut::name).collect()
    }
}

/// Number of distinct pre-cut rejection reasons
const NUM_REJECTIONS: usize = 5;

/// Report labels of the pre-cut rejection reasons, indexed like
/// [`rejection_index`]
const REJECTION_NAMES: [&str; NUM_REJECTIONS] = [
    "soft missing energy",
    "no b-tagged jet",
    "no secondary jet",
    "no tau+ candidate",
    "no tau- candidate",
];

/// Tally slot of a rejection reason
fn rejection_index(rejection: Rejection) -> usize {
    match rejection {
        Rejection::SoftMet => 0,
        Rejection::Unfilled(Role::BTag) => 1,
        Rejection::Unfilled(Role::SecondaryJet) => 2,
        Rejection::Unfilled(Role::TauPlus) => 3,
        Rejection::Unfilled(Role::TauMinus) => 4,
    }
}

/// Weighted cutflow statistics, accumulated per batch and merged in order
///
/// Single-writer within a batch; merging is a plain component-wise sum, so
/// batch results combine associatively into the same totals regardless of
/// how the event set was partitioned.
pub struct CutflowAccumulator {
    /// Number of cut stages (fixes the matrix dimensions)
    num_cuts: usize,

    /// Events seen, including rejected ones
    processed: usize,

    /// Total weight seen
    total_weight: Float,

    /// Weight rejected before any cut, per reason
    rejection_weights: [Float; NUM_REJECTIONS],

    /// Events that reached the cut stage
    selected: usize,

    /// Weight that reached the cut stage
    selected_weight: Float,

    /// Cumulative (gated) pass weight per stage
    cumulative: Vec<Float>,

    /// Independent pass weight per stage
    marginal: Vec<Float>,

    /// Joint independent pass weight per stage pair, row-major
    joint: Vec<Float>,

    /// Events passing every stage
    accepted: usize,

    /// Weight passing every stage
    accepted_weight: Float,
}
//
impl CutflowAccumulator {
    /// Set up an empty accumulator for the given number of cut stages
    pub fn new(num_cuts: usize) -> Self {
        Self {
            num_cuts,
            processed: 0,
            total_weight: 0.,
            rejection_weights: [0.; NUM_REJECTIONS],
            selected: 0,
            selected_weight: 0.,
            cumulative: vec![0.; num_cuts],
            marginal: vec![0.; num_cuts],
            joint: vec![0.; num_cuts * num_cuts],
            accepted: 0,
            accepted_weight: 0.,
        }
    }

    /// Tally an event rejected before the cut stage
    pub fn record_rejection(&mut self, rejection: Rejection, weight: Float) {
        self.processed += 1;
        self.total_weight += weight;
        self.rejection_weights[rejection_index(rejection)] += weight;
    }

    /// Tally a scored event from its independent cut decisions
    pub fn record_scored(&mut self, flags: &[bool], weight: Float) {
        assert_eq!(flags.len(), self.num_cuts, "Cut count mismatch");
        self.processed += 1;
        self.total_weight += weight;
        self.selected += 1;
        self.selected_weight += weight;

        // Gated cutflow: count a stage only if all earlier stages passed
        for (cumulative, &passed) in self.cumulative.iter_mut().zip(flags.iter()) {
            if !passed {
                break;
            }
            *cumulative += weight;
        }
        if flags.iter().all(|&passed| passed) {
            self.accepted += 1;
            self.accepted_weight += weight;
        }

        // Ungated marginals and joint pass weights for the correlations
        for (i, &pass_i) in flags.iter().enumerate() {
            if !pass_i {
                continue;
            }
            self.marginal[i] += weight;
            for (j, &pass_j) in flags.iter().enumerate() {
                if pass_j {
                    self.joint[i * self.num_cuts + j] += weight;
                }
            }
        }
    }

    /// Fold another batch's statistics into this one
    pub fn merge(&mut self, other: Self) {
        assert_eq!(self.num_cuts, other.num_cuts, "Cut count mismatch");
        self.processed += other.processed;
        self.total_weight += other.total_weight;
        for (mine, theirs) in self
            .rejection_weights
            .iter_mut()
            .zip(other.rejection_weights)
        {
            *mine += theirs;
        }
        self.selected += other.selected;
        self.selected_weight += other.selected_weight;
        for (mine, theirs) in self.cumulative.iter_mut().zip(other.cumulative) {
            *mine += theirs;
        }
        for (mine, theirs) in self.marginal.iter_mut().zip(other.marginal) {
            *mine += theirs;
        }
        for (mine, theirs) in self.joint.iter_mut().zip(other.joint) {
            *mine += theirs;
        }
        self.accepted += other.accepted;
        self.accepted_weight += other.accepted_weight;
    }

    /// Turn the accumulated statistics into the final report
    pub fn finalize(&self, cutflow: &Cutflow) -> CutflowReport {
        assert_eq!(cutflow.cuts.len(), self.num_cuts, "Cut count mismatch");
        let stages = cutflow
            .names()
            .into_iter()
            .zip(self.cumulative.iter())
            .map(|(name, &cumulative_weight)| StageReport {
                name,
                cumulative_weight,
                efficiency: if self.total_weight > 0. {
                    cumulative_weight / self.total_weight
                } else {
                    0.
                },
            })
            .collect();

        let n = self.num_cuts;
        let mut correlation = vec![0.; n * n];
        for i in 0..n {
            for j in 0..n {
                correlation[i * n + j] = self.correlation(i, j);
            }
        }

        CutflowReport {
            processed: self.processed,
            total_weight: self.total_weight,
            rejections: REJECTION_NAMES
                .iter()
                .zip(self.rejection_weights)
                .map(|(&name, weight)| (name, weight))
                .collect(),
            selected: self.selected,
            selected_weight: self.selected_weight,
            stages,
            accepted: self.accepted,
            accepted_weight: self.accepted_weight,
            correlation,
        }
    }

    /// Pearson correlation of the Bernoulli pass indicators of two stages,
    /// over the events that reached the cut stage
    ///
    /// Degenerate stages (pass probability 0 or 1) have no variance; their
    /// correlation is defined as 1 on the diagonal and 0 elsewhere.
    fn correlation(&self, i: usize, j: usize) -> Float {
        if self.selected_weight <= 0. {
            return if i == j { 1. } else { 0. };
        }
        let p_i = self.marginal[i] / self.selected_weight;
        let p_j = self.marginal[j] / self.selected_weight;
        let p_ij = self.joint[i * self.num_cuts + j] / self.selected_weight;
        let variance = p_i * (1. - p_i) * p_j * (1. - p_j);
        if variance <= 0. {
            return if i == j { 1. } else { 0. };
        }
        (p_ij - p_i * p_j) / sqrt(variance)
    }
}

/// One stage of the final cutflow table
pub struct StageReport {
    /// Stage name
    pub name: &'static str,

    /// Weight passing this stage and every stage before it
    pub cumulative_weight: Float,

    /// Cumulative pass weight over the total weight
    pub efficiency: Float,
}

/// Final cutflow statistics of a run
pub struct CutflowReport {
    /// Events seen
    pub processed: usize,

    /// Total weight seen
    pub total_weight: Float,

    /// Pre-cut rejection tallies, (reason, weight)
    pub rejections: Vec<(&'static str, Float)>,

    /// Events that reached the cut stage
    pub selected: usize,

    /// Weight that reached the cut stage
    pub selected_weight: Float,

    /// Per-stage cumulative weights and efficiencies
    pub stages: Vec<StageReport>,

    /// Events accepted by the full sequence
    pub accepted: usize,

    /// Weight accepted by the full sequence
    pub accepted_weight: Float,

    /// Pairwise cut correlations, row-major over the stages
    pub correlation: Vec<Float>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_cuts() -> Cutflow {
        Cutflow {
            cuts: vec![
                Cut::PairMass { min: 170. },
                Cut::NormalizedMet { max: 0.2 },
                Cut::HtLt { max: 0. },
                Cut::UnboostedMt2 { max: 10. },
            ],
        }
    }

    fn record_flag_patterns(
        accumulator: &mut CutflowAccumulator,
        patterns: &[(Vec<bool>, Float)],
    ) {
        for (flags, weight) in patterns {
            accumulator.record_scored(flags, *weight);
        }
    }

    #[test]
    fn cumulative_weights_never_increase_along_the_sequence() {
        let mut accumulator = CutflowAccumulator::new(4);
        record_flag_patterns(
            &mut accumulator,
            &[
                (vec![true, true, true, true], 1.5),
                (vec![true, true, false, true], 0.7),
                (vec![true, false, true, true], 2.0),
                (vec![false, true, true, true], 0.3),
            ],
        );
        let report = accumulator.finalize(&four_cuts());
        for pair in report.stages.windows(2) {
            assert!(pair[1].cumulative_weight <= pair[0].cumulative_weight + 1e-12);
        }
        assert!((report.stages[0].cumulative_weight - 4.2).abs() < 1e-12);
        assert!((report.accepted_weight - 1.5).abs() < 1e-12);
    }

    #[test]
    fn correlation_diagonal_is_one() {
        let mut accumulator = CutflowAccumulator::new(4);
        record_flag_patterns(
            &mut accumulator,
            &[
                (vec![true, true, false, true], 1.),
                (vec![false, true, true, false], 2.),
                (vec![true, false, true, true], 1.),
            ],
        );
        let report = accumulator.finalize(&four_cuts());
        for i in 0..4 {
            assert!((report.correlation[i * 4 + i] - 1.).abs() < 1e-12);
        }
    }

    #[test]
    fn perfectly_anticorrelated_cuts_reach_minus_one() {
        let mut accumulator = CutflowAccumulator::new(2);
        accumulator.record_scored(&[true, false], 1.);
        accumulator.record_scored(&[false, true], 1.);
        let cutflow = Cutflow {
            cuts: vec![Cut::PairMass { min: 170. }, Cut::HtLt { max: 0. }],
        };
        let report = accumulator.finalize(&cutflow);
        assert!((report.correlation[1] - (-1.)).abs() < 1e-12);
        assert!((report.correlation[2] - (-1.)).abs() < 1e-12);
    }

    #[test]
    fn degenerate_stage_has_zero_off_diagonal_correlation() {
        let mut accumulator = CutflowAccumulator::new(2);
        accumulator.record_scored(&[true, true], 1.);
        accumulator.record_scored(&[true, false], 1.);
        let cutflow = Cutflow {
            cuts: vec![Cut::PairMass { min: 170. }, Cut::HtLt { max: 0. }],
        };
        let report = accumulator.finalize(&cutflow);
        // Stage 0 always passes: no variance to correlate against
        assert_eq!(report.correlation[1], 0.);
        assert_eq!(report.correlation[0], 1.);
    }

    #[test]
    fn merge_reproduces_the_unpartitioned_totals() {
        let patterns = [
            (vec![true, true, true, true], 1.5),
            (vec![true, false, true, true], 0.5),
            (vec![false, true, false, true], 2.5),
            (vec![true, true, false, false], 1.0),
        ];

        let mut whole = CutflowAccumulator::new(4);
        record_flag_patterns(&mut whole, &patterns);
        whole.record_rejection(Rejection::SoftMet, 0.25);

        let mut first = CutflowAccumulator::new(4);
        record_flag_patterns(&mut first, &patterns[..2]);
        let mut second = CutflowAccumulator::new(4);
        record_flag_patterns(&mut second, &patterns[2..]);
        second.record_rejection(Rejection::SoftMet, 0.25);
        first.merge(second);

        let cutflow = four_cuts();
        let merged = first.finalize(&cutflow);
        let reference = whole.finalize(&cutflow);
        assert_eq!(merged.processed, reference.processed);
        assert!((merged.total_weight - reference.total_weight).abs() < 1e-12);
        assert!((merged.accepted_weight - reference.accepted_weight).abs() < 1e-12);
        for (a, b) in merged.correlation.iter().zip(reference.correlation.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn rejections_count_toward_the_total_but_not_the_selection() {
        let mut accumulator = CutflowAccumulator::new(4);
        accumulator.record_rejection(Rejection::Unfilled(Role::BTag), 2.);
        accumulator.record_scored(&[true, true, true, true], 1.);
        let report = accumulator.finalize(&four_cuts());
        assert_eq!(report.processed, 2);
        assert!((report.total_weight - 3.).abs() < 1e-12);
        assert!((report.selected_weight - 1.).abs() < 1e-12);
        assert!((report.rejections[1].1 - 2.).abs() < 1e-12);
        // Efficiency is normalized to the total weight
        assert!((report.stages[0].efficiency - 1. / 3.).abs() < 1e-12);
    }
}
