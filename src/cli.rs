//! `nr-l2sm` CLI application
//!
//! The CLI application is organized in several subcommands. The
//! supported subcommands can be seen by running `nr-l2sm`.
//! See the modules below for examples and more information about
//! how to use each subcommand.
//!
//! Log messages are written to stderr. The verbosity is controlled with the
//! `RUST_LOG` environment variable, which defaults to `warn`.

use crate::{
    error_model::{ErrorModel, ErrorModelConfig},
    harq::HarqMethod,
    mcs::McsTable,
};
use clap::Parser;
use std::error::Error;

pub mod bler;
pub mod harq;
pub mod segment;
pub mod tbs;

/// Trait to run a CLI subcommand
pub trait Run {
    /// Run the CLI subcommand
    fn run(&self) -> Result<(), Box<dyn Error>>;
}

/// CLI arguments.
#[derive(Debug, Parser)]
#[command(author, version, name = "nr-l2sm", about = "NR EESM link-to-system mapping")]
pub enum Args {
    /// bler subcommand
    Bler(bler::Args),
    /// harq subcommand
    Harq(harq::Args),
    /// segment subcommand
    Segment(segment::Args),
    /// tbs subcommand
    Tbs(tbs::Args),
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        match self {
            Args::Bler(x) => x.run(),
            Args::Harq(x) => x.run(),
            Args::Segment(x) => x.run(),
            Args::Tbs(x) => x.run(),
        }
    }
}

/// Error model arguments.
///
/// These arguments are shared by the subcommands that use the error model.
#[derive(Debug, Clone, clap::Args)]
pub struct ModelArgs {
    /// MCS table
    #[arg(long, default_value_t = McsTable::Table1)]
    pub mcs_table: McsTable,
    /// HARQ combining method
    #[arg(long, default_value_t = HarqMethod::IncrementalRedundancy)]
    pub harq_method: HarqMethod,
}

impl ModelArgs {
    /// Returns the error model configuration given by the arguments.
    pub fn config(&self) -> ErrorModelConfig {
        ErrorModelConfig {
            mcs_table: self.mcs_table,
            harq_method: self.harq_method,
        }
    }

    /// Builds an error model with the built-in curves.
    pub fn model(&self) -> ErrorModel {
        ErrorModel::new(self.config())
    }

    /// Builds an error model and checks that it supports an MCS.
    pub fn model_for_mcs(&self, mcs: u8) -> Result<ErrorModel, String> {
        let model = self.model();
        if mcs > model.max_mcs() {
            return Err(format!(
                "MCS {mcs} out of range [0, {}] for {}",
                model.max_mcs(),
                self.mcs_table
            ));
        }
        Ok(model)
    }
}

/// Returns a list of SINRs in dB.
///
/// The list goes from `min` to `max`, both included, in steps of `step`.
pub fn sinr_range(min: f64, max: f64, step: f64) -> Result<Vec<f64>, &'static str> {
    if step.is_nan() || step <= 0.0 {
        return Err("the SINR step must be positive");
    }
    if max < min {
        return Err("the maximum SINR cannot be smaller than the minimum SINR");
    }
    let num_sinrs = ((max - min) / step + 1e-9).floor() as usize + 1;
    Ok((0..num_sinrs).map(|k| min + k as f64 * step).collect())
}
