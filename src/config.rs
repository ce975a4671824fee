//! Mechanism for loading and sharing the analysis configuration
//!
//! Every threshold, projection fraction and mode flag of the analysis lives
//! here, loaded once at startup and passed by reference into the pipeline.
//! Nothing in the physics code reads module-level state.

use crate::{
    classify::ObjectSelection,
    cutflow::{Cut, Cutflow},
    discrim::{DiscriminantConfig, NUM_DZETA_ALPHAS},
    mt2::VisibleMass,
    numeric::Float,
    Result,
};

use eyre::{ensure, eyre, Report, WrapErr};

use std::{fs, str::FromStr};

/// Analysis configuration
#[derive(Debug)]
pub struct Configuration {
    /// Path of the decoded event file
    pub input_file: String,

    /// Whether events carry Monte-Carlo weights (false tallies every event
    /// with weight 1)
    pub weighted: bool,

    /// Preselection threshold on the missing transverse energy (GeV)
    pub met_min: Float,

    /// Kinematic thresholds of the object roles
    pub selection: ObjectSelection,

    /// Configuration of the discriminant suite
    pub discriminants: DiscriminantConfig,

    /// The ordered cut sequence
    pub cutflow: Cutflow,
}
//
impl Configuration {
    /// Load the configuration from a file, check it, and print it out
    pub fn load(file_name: &str) -> Result<Self> {
        let config_str = fs::read_to_string(file_name)
            .wrap_err_with(|| format!("Could not read configuration file {}", file_name))?;
        let config = Self::parse(&config_str)?;

        // Display it before validation so a bad value is visible in context
        config.print();

        ensure!(
            config.met_min >= 0.,
            "The missing-energy preselection threshold must not be negative"
        );
        let selection = &config.selection;
        for (name, value) in [
            ("btag_pt_min", selection.btag_pt_min),
            ("jet_pt_min", selection.jet_pt_min),
            ("tau_pt_min", selection.tau_pt_min),
            ("electron_pt_min", selection.electron_pt_min),
            ("muon_pt_min", selection.muon_pt_min),
        ] {
            ensure!(value >= 0., "{} must not be negative", name);
        }
        for (name, value) in [
            ("btag_eta_max", selection.btag_eta_max),
            ("jet_eta_max", selection.jet_eta_max),
            ("tau_eta_max", selection.tau_eta_max),
            ("electron_eta_max", selection.electron_eta_max),
            ("muon_eta_max", selection.muon_eta_max),
        ] {
            ensure!(value >= 0., "{} must not be negative", name);
        }
        ensure!(
            config.discriminants.mt2_precision >= 0.,
            "The MT2 precision must not be negative"
        );
        ensure!(
            config
                .discriminants
                .dzeta_alphas
                .iter()
                .all(|alpha| alpha.is_finite()),
            "The DZeta projection fractions must be finite"
        );

        Ok(config)
    }

    /// Decode the configuration items from the file contents
    ///
    /// The file format is one value per line, first whitespace-separated
    /// chunk wins, so the rest of each line is free for annotations. Blank
    /// lines are ignored. Items are positional.
    fn parse(config_str: &str) -> Result<Self> {
        let mut config_iter = config_str
            .lines()
            .filter_map(|line| line.split_whitespace().next());

        // Fetch the next configuration item, tagged with the name of the
        // field it is supposed to fill to ease error reporting
        let mut next_item = |name: &'static str| -> Result<ConfigItem> {
            config_iter
                .next()
                .map(|data| ConfigItem::new(name, data))
                .ok_or_else(|| eyre!("Missing configuration of {}", name))
        };

        let input_file = next_item("input_file")?.data.to_owned();
        let weighted = next_item("weighted")?.parse::<bool>()?;
        let met_min = next_item("met_min")?.parse::<Float>()?;
        let selection = ObjectSelection {
            btag_pt_min: next_item("btag_pt_min")?.parse::<Float>()?,
            btag_eta_max: next_item("btag_eta_max")?.parse::<Float>()?,
            jet_pt_min: next_item("jet_pt_min")?.parse::<Float>()?,
            jet_eta_max: next_item("jet_eta_max")?.parse::<Float>()?,
            tau_pt_min: next_item("tau_pt_min")?.parse::<Float>()?,
            tau_eta_max: next_item("tau_eta_max")?.parse::<Float>()?,
            electron_pt_min: next_item("electron_pt_min")?.parse::<Float>()?,
            electron_eta_max: next_item("electron_eta_max")?.parse::<Float>()?,
            muon_pt_min: next_item("muon_pt_min")?.parse::<Float>()?,
            muon_eta_max: next_item("muon_eta_max")?.parse::<Float>()?,
        };
        let mut dzeta_alphas = [0.; NUM_DZETA_ALPHAS];
        for (index, alpha) in dzeta_alphas.iter_mut().enumerate() {
            let names = ["dzeta_alpha_1", "dzeta_alpha_2", "dzeta_alpha_3"];
            *alpha = next_item(names[index])?.parse::<Float>()?;
        }
        let discriminants = DiscriminantConfig {
            dzeta_alphas,
            visible_mass: next_item("visible_mass")?.parse_visible_mass()?,
            mt2_precision: next_item("mt2_precision")?.parse::<Float>()?,
        };
        let cutflow = Cutflow {
            cuts: vec![
                Cut::PairMass {
                    min: next_item("pair_mass_min")?.parse::<Float>()?,
                },
                Cut::NormalizedMet {
                    max: next_item("met_ratio_max")?.parse::<Float>()?,
                },
                Cut::HtLt {
                    max: next_item("ht_lt_max")?.parse::<Float>()?,
                },
                Cut::UnboostedMt2 {
                    max: next_item("unboosted_mt2_max")?.parse::<Float>()?,
                },
            ],
        };

        Ok(Configuration {
            input_file,
            weighted,
            met_min,
            selection,
            discriminants,
            cutflow,
        })
    }

    /// Display the configuration in the same key/value layout as the
    /// result files
    pub fn print(&self) {
        let selection = &self.selection;
        let discriminants = &self.discriminants;
        println!("input_file        : {}", self.input_file);
        println!("weighted          : {}", self.weighted);
        println!("met_min           : {}", self.met_min);
        println!("btag_pt_min       : {}", selection.btag_pt_min);
        println!("btag_eta_max      : {}", selection.btag_eta_max);
        println!("jet_pt_min        : {}", selection.jet_pt_min);
        println!("jet_eta_max       : {}", selection.jet_eta_max);
        println!("tau_pt_min        : {}", selection.tau_pt_min);
        println!("tau_eta_max       : {}", selection.tau_eta_max);
        println!("electron_pt_min   : {}", selection.electron_pt_min);
        println!("electron_eta_max  : {}", selection.electron_eta_max);
        println!("muon_pt_min       : {}", selection.muon_pt_min);
        println!("muon_eta_max      : {}", selection.muon_eta_max);
        println!("dzeta_alphas      : {:?}", discriminants.dzeta_alphas);
        println!("visible_mass      : {:?}", discriminants.visible_mass);
        println!("mt2_precision     : {}", discriminants.mt2_precision);
        for cut in &self.cutflow.cuts {
            println!("cut               : {:?}", cut);
        }
    }
}

/// A value from the configuration file, tagged with the struct field which
/// it is supposed to map for error reporting purposes
struct ConfigItem<'data> {
    name: &'static str,
    data: &'data str,
}
//
impl<'data> ConfigItem<'data> {
    /// Build a config item from a struct field tag and raw iterator data
    fn new(name: &'static str, data: &'data str) -> Self {
        Self { name, data }
    }

    /// Parse this data using Rust's standard parsing logic
    fn parse<T: FromStr>(self) -> Result<T>
    where
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        self.data
            .parse::<T>()
            .map_err(Report::new)
            .wrap_err_with(|| format!("Could not parse configuration of {}", self.name))
    }

    /// Parse a visible-mass convention: "own", "leading", or a fixed mass
    fn parse_visible_mass(self) -> Result<VisibleMass> {
        match self.data {
            "own" => Ok(VisibleMass::Own),
            "leading" => Ok(VisibleMass::Leading),
            _ => self.parse::<Float>().map(VisibleMass::Fixed),
        }
    }
}
