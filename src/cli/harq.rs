//! HARQ test CLI subcommand.
//!
//! This subcommand can be used to run a HARQ link simulation over a Rayleigh
//! fading channel using the error model.
//!
//! # Examples
//!
//! A simulation of MCS 14 with incremental redundancy can be run with
//! ```shell
//! $ nr-l2sm harq --mcs 14 --tb-size 4000 --num-rbs 10 \
//!       --min-sinr 0.0 --max-sinr 20.0 --step-sinr 1.0 \
//!       --harq-method IncrementalRedundancy --output-file harq.txt
//! ```
//!
//! The mean SINRs are simulated in parallel, so the progress lines are
//! printed in the order in which they finish. The output file lists them in
//! ascending order.

use crate::{
    cli::*,
    error_model::ErrorModel,
    simulation::harq::{HarqTest, HarqTestParameters, Report, Reporter, Statistics},
};
use clap::Parser;
use std::{
    error::Error,
    fs::File,
    io::Write,
    sync::mpsc::{self, Receiver},
    time::Duration,
};

/// HARQ test CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Performs a HARQ link simulation")]
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
    #[arg(long, default_value = "25")]
    num_rbs: usize,
    /// Maximum number of retransmissions
    #[arg(long, default_value = "3")]
    max_retx: u32,
    /// Number of transport blocks for each SINR
    #[arg(long, default_value = "10000")]
    num_tbs: u64,
    /// Minimum mean SINR (dB)
    #[arg(long, allow_negative_numbers = true)]
    min_sinr: f64,
    /// Maximum mean SINR (dB)
    #[arg(long, allow_negative_numbers = true)]
    max_sinr: f64,
    /// Mean SINR step (dB)
    #[arg(long, default_value = "1.0")]
    step_sinr: f64,
    /// Seed of the RNG
    #[arg(long, default_value = "0")]
    seed: u64,
    /// Output file for simulation results
    #[arg(long)]
    output_file: Option<String>,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let model = self.model.model_for_mcs(self.mcs)?;
        let sinrs_db = sinr_range(self.min_sinr, self.max_sinr, self.step_sinr)?;
        let mut output_file = if let Some(f) = &self.output_file {
            Some(File::create(f)?)
        } else {
            None
        };
        let test = HarqTest::new(HarqTestParameters {
            model: model.clone(),
            mcs: self.mcs,
            tb_size_bits: self.tb_size,
            num_rbs: self.num_rbs,
            max_retx: self.max_retx,
            num_tbs: self.num_tbs,
            sinrs_db,
            seed: self.seed,
        })?;
        self.write_details(std::io::stdout(), &model)?;
        if let Some(f) = &mut output_file {
            self.write_details(&*f, &model)?;
        }
        let (report_tx, report_rx) = mpsc::channel();
        let progress = std::thread::spawn(move || Progress::new(report_rx).run());
        let statistics = test.run(Some(Reporter { tx: report_tx }));
        progress
            .join()
            .map_err(|_| "progress thread panicked")??;
        if let Some(f) = &mut output_file {
            writeln!(f, "{}", format_header())?;
            for stats in &statistics {
                writeln!(f, "{}", format_statistics(stats))?;
            }
        }
        Ok(())
    }
}

impl Args {
    fn write_details<W: Write>(&self, mut f: W, model: &ErrorModel) -> std::io::Result<()> {
        let table = model.mcs_table();
        let mcs = usize::from(self.mcs);
        writeln!(f, "HARQ TEST PARAMETERS")?;
        writeln!(f, "--------------------")?;
        writeln!(f, "Simulation:")?;
        writeln!(f, " - Minimum mean SINR: {:.2} dB", self.min_sinr)?;
        writeln!(f, " - Maximum mean SINR: {:.2} dB", self.max_sinr)?;
        writeln!(f, " - Mean SINR step: {:.2} dB", self.step_sinr)?;
        writeln!(f, " - Transport blocks per SINR: {}", self.num_tbs)?;
        writeln!(f, " - Seed: {}", self.seed)?;
        writeln!(f, "Channel:")?;
        writeln!(f, " - Rayleigh block fading")?;
        writeln!(f, " - Number of RBs: {}", self.num_rbs)?;
        writeln!(f, "Transmission:")?;
        writeln!(f, " - MCS table: {table}")?;
        writeln!(f, " - MCS: {}", self.mcs)?;
        writeln!(f, " - Modulation order: {}", table.modulation_order()[mcs])?;
        writeln!(f, " - Code rate: {:.2}", table.ecr()[mcs])?;
        writeln!(f, " - Transport block size: {} bits", self.tb_size)?;
        writeln!(f, "HARQ:")?;
        writeln!(f, " - Method: {}", model.config().harq_method)?;
        writeln!(f, " - Maximum retransmissions: {}", self.max_retx)?;
        writeln!(f)?;
        Ok(())
    }
}

fn format_header() -> &'static str {
    "   SINR |      TBs |   Transm |  1st err |  Res err |  1st BLER |  Res BLER | Avg tx | Pred BLER |  Goodput | Elapsed\n\
     --------|----------|----------|----------|----------|-----------|-----------|--------|-----------|----------|----------"
}

fn format_statistics(stats: &Statistics) -> String {
    format!(
        "{:7.2} | {:8} | {:8} | {:8} | {:8} | {:9.2e} | {:9.2e} | {:6.3} | {:9.2e} | {:8.1} | {}",
        stats.sinr_db,
        stats.num_tbs,
        stats.transmissions,
        stats.first_tx_errors,
        stats.residual_errors,
        stats.first_tx_bler,
        stats.residual_bler,
        stats.average_transmissions,
        stats.average_predicted_tbler,
        stats.goodput_bits,
        humantime::format_duration(Duration::from_millis(stats.elapsed.as_millis() as u64))
    )
}

#[derive(Debug)]
struct Progress {
    rx: Receiver<Report>,
}

impl Progress {
    fn new(rx: Receiver<Report>) -> Progress {
        Progress { rx }
    }

    fn run(self) -> std::io::Result<()> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", format_header())?;
        for report in self.rx.iter() {
            match report {
                Report::Statistics(stats) => writeln!(stdout, "{}", format_statistics(&stats))?,
                Report::Finished => break,
            }
        }
        Ok(())
    }
}
