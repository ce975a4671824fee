//! Decoded-event input
//!
//! Stand-in for the upstream ntuple reader: a line-oriented text format
//! with one block per event,
//!
//! ```text
//! event <weight>
//! jet <pt> <eta> <phi> <mass> <charge> <btag> <tautag>
//! electron <pt> <eta> <phi> <mass> <charge>
//! muon <pt> <eta> <phi> <mass> <charge>
//! met <pt> <phi>
//! end
//! ```
//!
//! Blank lines and `#` comments are ignored. Each block is decoded
//! independently: a schema violation fails that event fast, with an error
//! naming the offending line and field, and leaves the rest of the run
//! untouched.

use crate::{
    event::{Candidate, EventRecord},
    momentum::{from_pt_eta_phi_energy, from_pt_eta_phi_mass, Momentum},
    numeric::Float,
    Result,
};

use eyre::{bail, ensure, eyre, Report, WrapErr};

use std::{fs, str::FromStr};

/// One event block's decoding outcome
pub type ParsedEvent = Result<EventRecord>;

/// Read and decode every event block of a file
pub fn read_events(path: &str) -> Result<Vec<ParsedEvent>> {
    let text =
        fs::read_to_string(path).wrap_err_with(|| format!("Could not read event file {}", path))?;
    Ok(parse_events(&text))
}

/// Decode every event block of a text, one result per block
pub fn parse_events(text: &str) -> Vec<ParsedEvent> {
    // Strip comments and blanks, keep line numbers for error reporting
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let mut events = Vec::new();
    let mut position = 0;
    while position < lines.len() {
        let (number, line) = lines[position];

        // Anything outside an event block is one malformed entry; resync at
        // the next event header
        if first_token(line) != "event" {
            events.push(Err(eyre!(
                "Line {}: expected an event header, got {:?}",
                number,
                line
            )));
            position += 1;
            while position < lines.len() && first_token(lines[position].1) != "event" {
                position += 1;
            }
            continue;
        }

        // Delimit the block body at its end marker; a new header before the
        // end marker means the block was truncated
        let mut body_end = position + 1;
        let mut terminated = false;
        while body_end < lines.len() {
            match first_token(lines[body_end].1) {
                "end" => {
                    terminated = true;
                    break;
                }
                "event" => break,
                _ => body_end += 1,
            }
        }
        if terminated {
            events.push(parse_block(lines[position], &lines[position + 1..body_end]));
            position = body_end + 1;
        } else {
            events.push(Err(eyre!(
                "Line {}: event block is missing its end marker",
                number
            )));
            position = body_end;
        }
    }
    events
}

/// First whitespace-separated token of a non-empty line
fn first_token(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

/// Decode one delimited event block
fn parse_block(header: (usize, &str), body: &[(usize, &str)]) -> ParsedEvent {
    let (header_number, header_line) = header;
    let mut tokens = header_line.split_whitespace();
    tokens.next(); // the "event" keyword
    let weight = field::<Float>(&mut tokens, "weight", header_number)?;
    no_trailing(&mut tokens, header_number)?;

    let mut record = EventRecord {
        jets: Vec::new(),
        electrons: Vec::new(),
        muons: Vec::new(),
        met: Momentum::zeros(),
        weight,
    };
    let mut met_seen = false;
    for &(number, line) in body {
        let mut tokens = line.split_whitespace();
        let kind = tokens.next().unwrap_or("");
        match kind {
            "jet" => record.jets.push(parse_jet(&mut tokens, number)?),
            "electron" => record.electrons.push(parse_lepton(&mut tokens, number)?),
            "muon" => record.muons.push(parse_lepton(&mut tokens, number)?),
            "met" => {
                ensure!(!met_seen, "Line {}: duplicate met record", number);
                let pt = field::<Float>(&mut tokens, "met pt", number)?;
                let phi = field::<Float>(&mut tokens, "met phi", number)?;
                ensure!(pt >= 0., "Line {}: met pt must not be negative", number);
                record.met = from_pt_eta_phi_energy(pt, 0., phi, pt);
                met_seen = true;
            }
            other => bail!("Line {}: unknown record type {:?}", number, other),
        }
        no_trailing(&mut tokens, number)?;
    }
    ensure!(
        met_seen,
        "Event at line {}: missing met record",
        header_number
    );
    Ok(record)
}

/// Decode a jet record's fields into a candidate
fn parse_jet<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    number: usize,
) -> Result<Candidate> {
    let pt = field::<Float>(tokens, "jet pt", number)?;
    let eta = field::<Float>(tokens, "jet eta", number)?;
    let phi = field::<Float>(tokens, "jet phi", number)?;
    let mass = field::<Float>(tokens, "jet mass", number)?;
    let charge = field::<i32>(tokens, "jet charge", number)?;
    let b_tag = field::<u8>(tokens, "jet btag", number)? != 0;
    let tau_tag = field::<u8>(tokens, "jet tautag", number)? != 0;
    ensure!(pt >= 0., "Line {}: jet pt must not be negative", number);
    Ok(Candidate {
        momentum: from_pt_eta_phi_mass(pt, eta, phi, mass),
        charge,
        b_tag,
        tau_tag,
    })
}

/// Decode an electron or muon record's fields into a candidate
fn parse_lepton<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    number: usize,
) -> Result<Candidate> {
    let pt = field::<Float>(tokens, "lepton pt", number)?;
    let eta = field::<Float>(tokens, "lepton eta", number)?;
    let phi = field::<Float>(tokens, "lepton phi", number)?;
    let mass = field::<Float>(tokens, "lepton mass", number)?;
    let charge = field::<i32>(tokens, "lepton charge", number)?;
    ensure!(pt >= 0., "Line {}: lepton pt must not be negative", number);
    Ok(Candidate::new(
        from_pt_eta_phi_mass(pt, eta, phi, mass),
        charge,
    ))
}

/// Fetch and parse the next field of a record, by name for error reporting
fn field<'a, T: FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
    number: usize,
) -> Result<T>
where
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let token = tokens
        .next()
        .ok_or_else(|| eyre!("Line {}: missing {}", number, name))?;
    token
        .parse::<T>()
        .map_err(Report::new)
        .wrap_err_with(|| format!("Line {}: could not parse {}", number, name))
}

/// Reject records with extra fields, which indicate a schema mismatch
fn no_trailing<'a>(tokens: &mut impl Iterator<Item = &'a str>, number: usize) -> Result<()> {
    ensure!(
        tokens.next().is_none(),
        "Line {}: unexpected trailing data",
        number
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::momentum::Kinematics;

    const GOOD_BLOCK: &str = "# synthetic signal-like event
                              event 0.25
                              jet 50. 0.2 0.1 4.8 0 1 0
                              jet 45. -0.3 2.9 1.0 0 0 0
                              jet 80. 0. 0. 1.777 1 0 1
                              jet 75. 0.1 3.0 1.777 -1 0 1
                              met 40. 1.5
                              end";

    #[test]
    fn a_complete_block_decodes() {
        let events = parse_events(GOOD_BLOCK);
        assert_eq!(events.len(), 1);
        let record = events[0].as_ref().unwrap();
        assert_eq!(record.jets.len(), 4);
        assert!((record.weight - 0.25).abs() < 1e-12);
        assert!((record.met.pt() - 40.).abs() < 1e-9);
        assert!(record.jets[0].b_tag);
        assert_eq!(record.jets[2].charge, 1);
    }

    #[test]
    fn a_schema_violation_names_line_and_field() {
        let broken = GOOD_BLOCK.replacen("jet 45. -0.3", "jet oops -0.3", 1);
        let events = parse_events(&broken);
        assert_eq!(events.len(), 1);
        let message = format!("{:#}", events[0].as_ref().unwrap_err());
        assert!(message.contains("jet pt"), "got: {}", message);
        assert!(message.contains("Line 4"), "got: {}", message);
    }

    #[test]
    fn a_bad_block_does_not_take_down_its_neighbors() {
        let text = format!(
            "{}\n event not_a_number\n jet 1. 0. 0. 0. 0 0 0\n met 5. 0.\n end\n{}",
            GOOD_BLOCK, GOOD_BLOCK
        );
        let events = parse_events(&text);
        assert_eq!(events.len(), 3);
        assert!(events[0].is_ok());
        assert!(events[1].is_err());
        assert!(events[2].is_ok());
    }

    #[test]
    fn a_missing_end_marker_is_reported() {
        let truncated = GOOD_BLOCK.replacen("end", "", 1);
        let events = parse_events(&truncated);
        assert_eq!(events.len(), 1);
        let message = format!("{}", events[0].as_ref().unwrap_err());
        assert!(message.contains("end marker"), "got: {}", message);
    }

    #[test]
    fn a_missing_met_record_is_a_schema_violation() {
        let without_met = GOOD_BLOCK.replacen("met 40. 1.5", "", 1);
        let events = parse_events(&without_met);
        let message = format!("{}", events[0].as_ref().unwrap_err());
        assert!(message.contains("met"), "got: {}", message);
    }

    #[test]
    fn stray_lines_resync_at_the_next_header() {
        let text = format!("jet 1. 0. 0. 0. 0 0 0\n{}", GOOD_BLOCK);
        let events = parse_events(&text);
        assert_eq!(events.len(), 2);
        assert!(events[0].is_err());
        assert!(events[1].is_ok());
    }
}
