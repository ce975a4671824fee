//! This module is in charge of outputting the final analysis results to the
//! standard output and various files
//!
//! Two plain numeric tables are written per run: `cutflow.dat` with the
//! stage statistics and cut correlations, and `discriminants.dat` with one
//! row of observables plus weight per accepted event, ready for the
//! downstream histogramming step.

use crate::{
    config::Configuration,
    cutflow::CutflowReport,
    discrim::NUM_DZETA_ALPHAS,
    pipeline::AcceptedEvent,
    Result,
};

use eyre::WrapErr;

use std::{fs::File, io::Write, time::Duration};

use time::{format_description::well_known::Rfc2822, OffsetDateTime};

/// Column order of the discriminant table, followed by the event weight
const DISCRIMINANT_COLUMNS: [&str; 17 + NUM_DZETA_ALPHAS] = [
    "pair_mass",
    "ditau_mass",
    "ditau_pt",
    "met",
    "normalized_met",
    "ht_lt",
    "mt2",
    "unboosted_mt2",
    "primed_ht_lt",
    "dzeta_1",
    "dzeta_2",
    "dzeta_3",
    "mt_lead",
    "total_mt",
    "mass_hypothesis",
    "dr_taus",
    "dr_jets",
    "dr_pair",
    "dphi_tau_met",
    "topology",
];

/// Output the run results to the console and to disk
pub fn dump_results(
    cfg: &Configuration,
    report: &CutflowReport,
    accepted: &[AcceptedEvent],
    elapsed: Duration,
) -> Result<()> {
    // Short summary on stdout
    println!();
    println!(
        "{} / {} events selected, {} accepted",
        report.selected, report.processed, report.accepted
    );
    for stage in &report.stages {
        println!(
            "  {:<16}: {:>12.6} ({:.4} of total weight)",
            stage.name, stage.cumulative_weight, stage.efficiency
        );
    }

    // Timestamp of when the run ended, for the result files
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc2822)
        .wrap_err("Could not format the run timestamp")?;

    write_cutflow_table(cfg, report, elapsed, &timestamp)
        .wrap_err("Could not write the cutflow table")?;
    write_discriminant_table(accepted, &timestamp)
        .wrap_err("Could not write the discriminant table")?;
    Ok(())
}

/// Write the cutflow stage table and the cut correlation matrix
fn write_cutflow_table(
    cfg: &Configuration,
    report: &CutflowReport,
    elapsed: Duration,
    timestamp: &str,
) -> Result<()> {
    let mut file = File::create("cutflow.dat")?;
    let file = &mut file;

    writeln!(file, " {}", timestamp)?;
    writeln!(file, " {:<24}: {}", "input file", cfg.input_file)?;
    writeln!(file, " {:<24}: {}", "weighted", cfg.weighted)?;
    writeln!(file, " {:<24}: {:.3}", "elapsed (s)", elapsed.as_secs_f64())?;
    writeln!(file, " ---------------------------------------------")?;
    writeln!(file, " {:<24}: {}", "events processed", report.processed)?;
    writeln!(file, " {:<24}: {}", "total weight", report.total_weight)?;
    for (reason, weight) in &report.rejections {
        writeln!(file, " {:<24}: {}", reason, weight)?;
    }
    writeln!(file, " {:<24}: {}", "events selected", report.selected)?;
    writeln!(file, " {:<24}: {}", "selected weight", report.selected_weight)?;
    writeln!(file, " ---------------------------------------------")?;
    writeln!(
        file,
        " {:<16}{:>16}{:>12}",
        "stage", "pass weight", "efficiency"
    )?;
    for stage in &report.stages {
        writeln!(
            file,
            " {:<16}{:>16.6}{:>12.6}",
            stage.name, stage.cumulative_weight, stage.efficiency
        )?;
    }
    writeln!(file, " {:<24}: {}", "events accepted", report.accepted)?;
    writeln!(file, " {:<24}: {}", "accepted weight", report.accepted_weight)?;

    // Pairwise cut correlations, one matrix row per line
    writeln!(file, " ---------------------------------------------")?;
    writeln!(file, " cut correlations")?;
    let num_stages = report.stages.len();
    for row in 0..num_stages {
        write!(file, " ")?;
        for column in 0..num_stages {
            write!(file, "{:>10.6}", report.correlation[row * num_stages + column])?;
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Write one named-column row of discriminants plus weight per accepted
/// event, for the histogramming collaborator
fn write_discriminant_table(accepted: &[AcceptedEvent], timestamp: &str) -> Result<()> {
    let mut file = File::create("discriminants.dat")?;
    let file = &mut file;

    writeln!(file, "# {}", timestamp)?;
    write!(file, "#")?;
    for column in DISCRIMINANT_COLUMNS {
        write!(file, " {:>14}", column)?;
    }
    writeln!(file, " {:>14}", "weight")?;

    for event in accepted {
        let set = &event.discriminants;
        let values = [
            set.pair_mass,
            set.ditau_mass,
            set.ditau_pt,
            set.met,
            set.normalized_met,
            set.ht_lt,
            set.mt2,
            set.unboosted_mt2,
            set.primed_ht_lt,
            set.dzeta[0],
            set.dzeta[1],
            set.dzeta[2],
            set.mt_lead,
            set.total_mt,
            set.mass_hypothesis,
            set.dr_taus,
            set.dr_jets,
            set.dr_pair,
            set.dphi_lead_tau_met,
            set.topology,
            event.weight,
        ];
        write!(file, " ")?;
        for value in values {
            write!(file, " {:>14.6e}", value)?;
        }
        writeln!(file)?;
    }
    Ok(())
}
