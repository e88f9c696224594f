//! Segmentation CLI subcommand.
//!
//! This subcommand prints the LDPC code block segmentation of a transport
//! block.
//!
//! # Examples
//!
//! ```shell
//! $ nr-l2sm segment --tb-size 20000 --mcs 20
//! ```
//! The segmentation can also be printed as JSON with `--json`.

use crate::{cli::*, mcs::McsTable, segmentation::Segmentation};
use clap::Parser;
use std::error::Error;

/// Segmentation CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Computes the code block segmentation of a transport block")]
pub struct Args {
    /// Transport block size (bits)
    #[arg(long)]
    tb_size: u32,
    /// MCS
    #[arg(long)]
    mcs: u8,
    /// MCS table
    #[arg(long, default_value_t = McsTable::Table1)]
    mcs_table: McsTable,
    /// Print the segmentation as JSON
    #[arg(long)]
    json: bool,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let segmentation = self.segmentation()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&segmentation)?);
        } else {
            println!("Base graph: {}", segmentation.base_graph);
            println!("Code blocks (C): {}", segmentation.num_cbs);
            println!("CRC bits per code block (L): {}", segmentation.crc_len);
            println!("Total bits (B'): {}", segmentation.total_bits);
            println!("Lifting size (Zc): {}", segmentation.lifting_size);
            println!("Code block size (K): {}", segmentation.cb_size);
        }
        Ok(())
    }
}

impl Args {
    fn segmentation(&self) -> Result<Segmentation, String> {
        let max_mcs = self.mcs_table.max_mcs();
        if self.mcs > max_mcs {
            return Err(format!(
                "MCS {} out of range [0, {max_mcs}] for {}",
                self.mcs, self.mcs_table
            ));
        }
        if self.tb_size == 0 {
            return Err("the transport block size cannot be 0".to_string());
        }
        Ok(Segmentation::new(
            self.tb_size,
            self.mcs_table.ecr()[usize::from(self.mcs)],
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{cli::Args as Cli, segmentation::BaseGraph};

    fn parse(args: &[&str]) -> Args {
        let argv = ["nr-l2sm", "segment"].into_iter().chain(args.iter().copied());
        match Cli::try_parse_from(argv) {
            Ok(Cli::Segment(args)) => args,
            _ => panic!("wrong arguments"),
        }
    }

    #[test]
    fn segmentation() {
        let s = parse(&["--tb-size", "20000", "--mcs", "20"])
            .segmentation()
            .unwrap();
        assert_eq!(s.base_graph, BaseGraph::One);
        assert_eq!(s.num_cbs, 3);
        assert_eq!(s.cb_size, 7040);
    }

    #[test]
    fn invalid() {
        assert!(parse(&["--tb-size", "0", "--mcs", "20"])
            .segmentation()
            .is_err());
        assert!(parse(&["--tb-size", "100", "--mcs", "28", "--mcs-table", "Table2"])
            .segmentation()
            .is_err());
    }
}
