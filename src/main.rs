//! Z' -> tau tau event reconstruction and kinematic discriminants
//!
//!
//! # Introduction (for the physicist)
//!
//! This program reconstructs candidate events for a heavy neutral boson
//! decaying to a tau pair produced in association with b-jets, and
//! separates them from the Standard Model backgrounds (top pairs, W/Z plus
//! jets, dibosons) on event-level kinematics alone.
//!
//! Per event it identifies one b-tagged jet, one secondary jet and an
//! opposite-sign pair of tau candidates, resolves the jet-tau pairing
//! ambiguity by mass symmetrization, and computes the discriminating
//! observables: the stransverse mass MT2 (in the lab frame and in an
//! unboosted frame built from the ditau plane), DZeta bisector projections,
//! transverse and invariant masses, and angular separations. An ordered cut
//! sequence tallies weighted acceptances and the pairwise correlation of
//! the cuts.
//!
//!
//! # Introduction (for the numerical guy)
//!
//! The only numerically delicate part is MT2, computed by a bisection over
//! parent-mass hypotheses with an algebraic conic-intersection feasibility
//! test, deterministic and precision-bounded.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The program is a batch pipeline:
//!
//! * read in the configuration and the decoded event file
//! * loop over events,
//!     * classifying reconstructed objects into analysis roles,
//!     * resolving the combinatorial pairing ambiguity,
//!     * computing the discriminant set,
//!     * folding pass/fail decisions into the cutflow accumulator
//! * then display / store the cutflow table and the discriminant rows.
//!
//! Each event is processed by a pure function of its own record, so the
//! event loop parallelizes trivially (enable the `multi-threading` cargo
//! feature); batch results merge in a fixed order for reproducibility.

#![warn(missing_docs)]

mod classify;
mod config;
mod cutflow;
mod discrim;
mod event;
mod input;
mod momentum;
mod mt2;
mod numeric;
mod output;
mod pairing;
mod pipeline;
mod scheduling;

use eyre::WrapErr;

use crate::{config::Configuration, pipeline::Analysis};

use std::time::Instant;

/// We'll use eyre's type-erased result type throughout the application
type Result<T> = eyre::Result<T>;

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    // ### CONFIGURATION READOUT ###

    let cfg =
        Configuration::load("analysis.conf").wrap_err("Failed to load the configuration")?;

    // ### EVENT DECODING ###

    // Schema violations are per-event: decoding gives one result per block
    // and the bad ones only cost their own event.
    let events = input::read_events(&cfg.input_file).wrap_err("Failed to read the event file")?;

    // ### ANALYSIS EXECUTION ###

    // NOTE: The clock starts after the I/O, to avoid timing fluctuations
    let saved_time = Instant::now();

    let analysis = Analysis::new(&cfg);
    let results = scheduling::run_analysis(&events, &analysis);

    // ### RESULTS DISPLAY AND STORAGE ###

    let elapsed_time = saved_time.elapsed();

    let report = results.cutflow.finalize(&cfg.cutflow);
    if results.malformed > 0 {
        eprintln!("{} events were dropped as malformed", results.malformed);
    }
    output::dump_results(&cfg, &report, &results.accepted, elapsed_time)
        .wrap_err("Failed to output the results")?;

    // ...and we're done
    Ok(())
}
