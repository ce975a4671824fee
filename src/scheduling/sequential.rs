//! Sequential back-end of the analysis
//!
//! We use batched logic even in sequential mode, in order to achieve
//! reproducibility with respect to multi-threaded runs: both modes fold
//! their statistics over the same event partitions, in the same order.

use crate::{
    input::ParsedEvent,
    pipeline::{Analysis, RunAccumulator},
    scheduling::{analyze_batch, EVENT_BATCH_SIZE},
};

/// Analyze the event set one batch at a time
pub fn run_analysis_impl(events: &[ParsedEvent], analysis: &Analysis) -> RunAccumulator {
    let mut accumulator = RunAccumulator::new(analysis.num_cuts());
    for batch in events.chunks(EVENT_BATCH_SIZE) {
        accumulator.merge(analyze_batch(batch, analysis));
    }
    accumulator
}
