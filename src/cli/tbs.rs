//! TBS CLI subcommand.
//!
//! This subcommand prints the payload and transport block sizes of each MCS
//! for an allocation, and optionally the CQI feedback for a SINR.
//!
//! # Examples
//!
//! The transport block sizes for 25 RBs with MCS Table 2 are obtained with
//! ```shell
//! $ nr-l2sm tbs --num-rbs 25 --mcs-table Table2
//! ```
//! Adding `--feedback-sinr 12.5` also prints the CQI and MCS reported for a
//! flat channel with a SINR of 12.5 dB.

use crate::{
    amc::{Amc, AmcConfig, AmcModel},
    cli::*,
    eesm::from_db,
    error_model::{ErrorModel, ErrorModelConfig},
    mcs::McsTable,
};
use clap::Parser;
use std::error::Error;

/// TBS CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Computes transport block sizes and CQI feedback")]
pub struct Args {
    /// MCS table
    #[arg(long, default_value_t = McsTable::Table1)]
    mcs_table: McsTable,
    /// Number of RBs
    #[arg(long, default_value = "1")]
    num_rbs: u32,
    /// Number of subcarriers per RB
    #[arg(long, default_value = "12")]
    num_sc_per_rb: u32,
    /// Number of reference signal subcarriers per RB
    #[arg(long, default_value = "3")]
    num_ref_sc_per_rb: u32,
    /// SINR for the CQI feedback (dB)
    #[arg(long, allow_negative_numbers = true)]
    feedback_sinr: Option<f64>,
    /// AMC model for the CQI feedback
    #[arg(long, value_enum, default_value_t = AmcModel::ErrorModel)]
    amc_model: AmcModel,
    /// Transport block size for the CQI feedback (bytes)
    #[arg(long, default_value = "500")]
    feedback_tb_size: u32,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let amc = self.amc()?;
        let table = self.mcs_table;
        println!("{}", Self::format_header());
        for mcs in 0..=table.max_mcs() {
            let m = usize::from(mcs);
            println!(
                "{:4} | {:4} | {:6.2} | {:8.4} | {:8} | {:8}",
                mcs,
                table.modulation_order()[m],
                table.ecr()[m],
                table.spectral_efficiency_for_mcs()[m],
                amc.payload_size(mcs, self.num_rbs),
                amc.calculate_tb_size(mcs, self.num_rbs)
            );
        }
        if let Some(sinr_db) = self.feedback_sinr {
            let sinr = vec![from_db(sinr_db); self.num_rbs as usize];
            let feedback = amc.create_cqi_feedback_wb(&sinr, self.feedback_tb_size);
            println!();
            println!("CQI feedback at {sinr_db:.2} dB ({:?} model):", self.amc_model);
            println!(" - CQI: {}", feedback.cqi);
            println!(" - MCS: {}", feedback.mcs);
        }
        Ok(())
    }
}

impl Args {
    fn amc(&self) -> Result<Amc, &'static str> {
        if self.num_ref_sc_per_rb > self.num_sc_per_rb {
            return Err("more reference subcarriers than subcarriers per RB");
        }
        if self.feedback_tb_size == 0 {
            return Err("the transport block size for the CQI feedback cannot be 0");
        }
        let model = ErrorModel::new(ErrorModelConfig {
            mcs_table: self.mcs_table,
            ..ErrorModelConfig::default()
        });
        Ok(Amc::new(
            model,
            AmcConfig {
                model: self.amc_model,
                num_sc_per_rb: self.num_sc_per_rb,
                num_ref_sc_per_rb: self.num_ref_sc_per_rb,
                ..AmcConfig::default()
            },
        ))
    }

    fn format_header() -> &'static str {
        " MCS |   Qm |    ECR |       SE |  Payload |      TBS\n\
         -----|------|--------|----------|----------|----------"
    }
}
