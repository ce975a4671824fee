//! This module takes care of scheduling the analysis work, encapsulating use
//! of multiple threads and anything else that will come in the future

#[cfg(feature = "multi-threading")]
mod multi_threading;
#[cfg(not(feature = "multi-threading"))]
mod sequential;

use crate::{
    input::ParsedEvent,
    pipeline::{Analysis, RunAccumulator},
};

/// Size of the analyzed event batches
///
/// Events are processed in batches of a fixed size so that the sequential
/// and multi-threaded runs fold their statistics over identical partitions,
/// which makes the accumulated sums reproducible between the two modes.
/// Batching also keeps floating-point accumulation error in check: the
/// per-batch sums stay commensurate with the accumulated values.
const EVENT_BATCH_SIZE: usize = 10_000;

/// Run the analysis in the manner that was configured at build time
///
/// Takes the decoded event blocks and the configured pipeline, and returns
/// the merged run statistics.
pub fn run_analysis(events: &[ParsedEvent], analysis: &Analysis) -> RunAccumulator {
    #[cfg(not(feature = "multi-threading"))]
    {
        sequential::run_analysis_impl(events, analysis)
    }

    #[cfg(feature = "multi-threading")]
    {
        multi_threading::run_analysis_impl(events, analysis)
    }
}

/// Process one batch of decoded events into a fresh accumulator
///
/// Blocks that failed to decode are reported and tallied as malformed; the
/// rest flow through the per-event pipeline.
fn analyze_batch(events: &[ParsedEvent], analysis: &Analysis) -> RunAccumulator {
    let mut accumulator = RunAccumulator::new(analysis.num_cuts());
    for parsed in events {
        match parsed {
            Ok(event) => accumulator.record(analysis.process(event), analysis.weight(event)),
            Err(error) => {
                eprintln!("Skipping malformed event: {:#}", error);
                accumulator.record_malformed();
            }
        }
    }
    accumulator
}
