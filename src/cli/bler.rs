//! BLER CLI subcommand.
//!
//! This subcommand evaluates the error model over a range of SINRs on a flat
//! channel, in which all the RBs have the same SINR.
//!
//! # Examples
//!
//! The TBLER of MCS 14 for a transport block of 4000 bits on 10 RBs can be
//! obtained with
//! ```shell
//! $ nr-l2sm bler --mcs 14 --tb-size 4000 --num-rbs 10 \
//!       --min-sinr 7.0 --max-sinr 11.0 --step-sinr 0.25
//! ```
//!
//! With `--transmissions 2`, the TBLER of the first retransmission is
//! computed instead, using the first transmission as HARQ history.

use crate::{
    cli::*,
    eesm::{from_db, to_db},
    error_model::{DecodeOutcome, ErrorModel},
    lookup::cb_bler,
    mcs::McsTable,
    segmentation::Segmentation,
};
use clap::Parser;
use std::{error::Error, fs::File, io::Write};

/// BLER CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Evaluates the TBLER on a flat channel")]
pub struct Args {
    #[command(flatten)]
    model: ModelArgs,
    /// MCS
    #[arg(long)]
    mcs: u8,
    /// Transport block size (bits)
    #[arg(long)]
    tb_size: u32,
    /// Number of RBs
    #[arg(long, default_value = "1")]
    num_rbs: usize,
    /// Number of transmissions of the transport block
    #[arg(long, default_value = "1")]
    transmissions: usize,
    /// Minimum SINR (dB)
    #[arg(long, allow_negative_numbers = true)]
    min_sinr: f64,
    /// Maximum SINR (dB)
    #[arg(long, allow_negative_numbers = true)]
    max_sinr: f64,
    /// SINR step (dB)
    #[arg(long, default_value = "0.1")]
    step_sinr: f64,
    /// Output file for the results
    #[arg(long)]
    output_file: Option<String>,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let model = self.model.model_for_mcs(self.mcs)?;
        if self.tb_size == 0 {
            return Err("the transport block size cannot be 0".into());
        }
        if self.num_rbs == 0 {
            return Err("the number of RBs cannot be 0".into());
        }
        if self.transmissions == 0 {
            return Err("the number of transmissions cannot be 0".into());
        }
        let sinrs = sinr_range(self.min_sinr, self.max_sinr, self.step_sinr)?;
        let mut output_file = if let Some(f) = &self.output_file {
            Some(File::create(f)?)
        } else {
            None
        };
        self.write_details(std::io::stdout(), &model)?;
        if let Some(f) = &mut output_file {
            self.write_details(&*f, &model)?;
        }
        println!("{}", Self::format_header());
        if let Some(f) = &mut output_file {
            writeln!(f, "{}", Self::format_header())?;
        }
        for sinr_db in sinrs {
            let outcome = self.evaluate(&model, sinr_db);
            let row = self.format_row(&model, sinr_db, &outcome);
            println!("{row}");
            if let Some(f) = &mut output_file {
                writeln!(f, "{row}")?;
            }
        }
        Ok(())
    }
}

impl Args {
    fn evaluate(&self, model: &ErrorModel, sinr_db: f64) -> DecodeOutcome {
        let sinr = vec![from_db(sinr_db); self.num_rbs];
        let map = (0..self.num_rbs).collect::<Vec<_>>();
        let mut history = Vec::with_capacity(self.transmissions);
        loop {
            let outcome =
                model.tb_decodification_stats(&sinr, &map, self.tb_size, self.mcs, &history);
            if history.len() + 1 == self.transmissions {
                return outcome;
            }
            history.push(outcome);
        }
    }

    fn write_details<W: Write>(&self, mut f: W, model: &ErrorModel) -> std::io::Result<()> {
        let table: McsTable = model.mcs_table();
        let mcs = usize::from(self.mcs);
        let segmentation = Segmentation::new(self.tb_size, table.ecr()[mcs]);
        writeln!(f, "BLER PARAMETERS")?;
        writeln!(f, "---------------")?;
        writeln!(f, "Error model:")?;
        writeln!(f, " - MCS table: {}", table)?;
        writeln!(f, " - HARQ method: {}", model.config().harq_method)?;
        writeln!(f, "Transmission:")?;
        writeln!(f, " - MCS: {}", self.mcs)?;
        writeln!(f, " - Modulation order: {}", table.modulation_order()[mcs])?;
        writeln!(f, " - Code rate: {:.2}", table.ecr()[mcs])?;
        writeln!(f, " - Transport block size: {} bits", self.tb_size)?;
        writeln!(f, " - Number of RBs: {}", self.num_rbs)?;
        writeln!(f, " - Transmissions: {}", self.transmissions)?;
        writeln!(f, "Segmentation:")?;
        writeln!(f, " - Base graph: {}", segmentation.base_graph)?;
        writeln!(f, " - Code blocks: {}", segmentation.num_cbs)?;
        writeln!(f, " - Code block size: {} bits", segmentation.cb_size)?;
        writeln!(f)?;
        Ok(())
    }

    fn format_header() -> &'static str {
        "   SINR | Eff SINR |   MCS eq |    CBLER |    TBLER\n\
         --------|----------|----------|----------|----------"
    }

    fn format_row(&self, model: &ErrorModel, sinr_db: f64, outcome: &DecodeOutcome) -> String {
        let ecr = model.mcs_table().ecr()[usize::from(self.mcs)];
        let base_graph = Segmentation::new(outcome.info_bits, ecr).base_graph;
        let cbler = cb_bler(
            model.dataset(),
            base_graph,
            outcome.mcs_eq,
            outcome.cb_size,
            outcome.sinr_eff,
        );
        format!(
            "{:7.2} | {:8.2} | {:8} | {:8.2e} | {:8.2e}",
            sinr_db,
            to_db(outcome.sinr_eff),
            outcome.mcs_eq,
            cbler,
            outcome.tbler
        )
    }
}
