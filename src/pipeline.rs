//! The per-event analysis pipeline
//!
//! One event flows through preselection, classification, pairing and
//! scoring as a pure function of its decoded record: no state is shared
//! between events, which is what lets the scheduling layer map the pipeline
//! over event batches in any order. Everything mutable lives in the
//! [`RunAccumulator`], which is filled per batch and merged afterwards.

use crate::{
    config::Configuration,
    cutflow::CutflowAccumulator,
    discrim::DiscriminantSet,
    event::{EventRecord, Rejection},
    momentum::Kinematics,
    numeric::Float,
};

/// What became of one event
#[derive(Clone, Debug)]
pub enum Verdict {
    /// Fell out before the cut stage, for the recorded reason
    Rejected(Rejection),

    /// Survived selection; carries the discriminants and the independent
    /// decision of every cut stage
    Scored {
        /// The full discriminant set of the event
        discriminants: DiscriminantSet,

        /// Per-stage cut decisions, evaluated without gating
        flags: Vec<bool>,
    },
}

/// The configured analysis, wrapping the pure per-event pipeline
pub struct Analysis<'cfg> {
    /// Configuration of the selection, discriminants and cuts
    cfg: &'cfg Configuration,
}
//
impl<'cfg> Analysis<'cfg> {
    /// Set up the pipeline for a configuration
    pub fn new(cfg: &'cfg Configuration) -> Self {
        Self { cfg }
    }

    /// Run one event through the full pipeline
    pub fn process(&self, event: &EventRecord) -> Verdict {
        let cfg = self.cfg;

        // Preselection on the missing energy alone
        if event.met.pt() < cfg.met_min {
            return Verdict::Rejected(Rejection::SoftMet);
        }

        // Role assignment; an incomplete assignment is an expected outcome
        let selected = match cfg.selection.classify(event) {
            Ok(selected) => selected,
            Err(rejection) => return Verdict::Rejected(rejection),
        };

        // Score the event and evaluate every cut independently
        let discriminants = cfg.discriminants.compute(&selected);
        let flags = cfg.cutflow.evaluate(&discriminants);
        Verdict::Scored {
            discriminants,
            flags,
        }
    }

    /// The weight an event contributes to every tally
    pub fn weight(&self, event: &EventRecord) -> Float {
        if self.cfg.weighted {
            event.weight
        } else {
            1.
        }
    }

    /// Number of configured cut stages
    pub fn num_cuts(&self) -> usize {
        self.cfg.cutflow.cuts.len()
    }
}

/// One accepted event's output row for the histogramming collaborator
#[derive(Clone, Debug)]
pub struct AcceptedEvent {
    /// The full discriminant set
    pub discriminants: DiscriminantSet,

    /// The weight to histogram it with
    pub weight: Float,
}

/// Everything a batch of events accumulates into
pub struct RunAccumulator {
    /// Weighted cutflow statistics
    pub cutflow: CutflowAccumulator,

    /// Discriminant rows of the accepted events, in processing order
    pub accepted: Vec<AcceptedEvent>,

    /// Events dropped for schema violations before reaching the pipeline
    pub malformed: usize,
}
//
impl RunAccumulator {
    /// Set up an empty accumulator for the given number of cut stages
    pub fn new(num_cuts: usize) -> Self {
        Self {
            cutflow: CutflowAccumulator::new(num_cuts),
            accepted: Vec::new(),
            malformed: 0,
        }
    }

    /// Fold one event's verdict into the statistics
    pub fn record(&mut self, verdict: Verdict, weight: Float) {
        match verdict {
            Verdict::Rejected(rejection) => self.cutflow.record_rejection(rejection, weight),
            Verdict::Scored {
                discriminants,
                flags,
            } => {
                self.cutflow.record_scored(&flags, weight);
                if flags.iter().all(|&passed| passed) {
                    self.accepted.push(AcceptedEvent {
                        discriminants,
                        weight,
                    });
                }
            }
        }
    }

    /// Tally an event that failed to decode
    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    /// Fold another batch's accumulator into this one
    ///
    /// Merging in batch order reproduces the sequential run exactly.
    pub fn merge(&mut self, other: Self) {
        self.cutflow.merge(other.cutflow);
        self.accepted.extend(other.accepted);
        self.malformed += other.malformed;
    }
}
