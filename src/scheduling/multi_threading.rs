//! Multi-threaded back-end of the analysis
//!
//! Every event is processed by a pure function of its own record, so the
//! event set can be partitioned freely across threads. Each batch fills its
//! own accumulator; the batch results are then merged in partition order,
//! which makes the parallel run reproduce the sequential one exactly (the
//! floating-point sums are folded over identical operand sequences).

use crate::{
    input::ParsedEvent,
    pipeline::{Analysis, RunAccumulator},
    scheduling::{analyze_batch, EVENT_BATCH_SIZE},
};

use rayon::prelude::*;

/// Analyze the event batches in parallel, merging the results in order
pub fn run_analysis_impl(events: &[ParsedEvent], analysis: &Analysis) -> RunAccumulator {
    events
        .par_chunks(EVENT_BATCH_SIZE)
        .map(|batch| analyze_batch(batch, analysis))
        .collect::<Vec<_>>()
        .into_iter()
        .fold(
            RunAccumulator::new(analysis.num_cuts()),
            |mut merged, batch_result| {
                merged.merge(batch_result);
                merged
            },
        )
}
