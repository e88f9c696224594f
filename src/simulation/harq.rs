//! HARQ link simulation.
//!
//! This module contains a Monte Carlo simulation of a HARQ link that uses the
//! [`ErrorModel`] to decide whether each transmission of a transport block is
//! decoded. The SINR of each RB is drawn from a [`RayleighChannel`] for every
//! transmission. Failed transport blocks are retransmitted with the outcomes
//! of the failed attempts as HARQ history, until they are decoded or the
//! maximum number of retransmissions is reached.

use super::channel::RayleighChannel;
use crate::{
    eesm::from_db,
    error_model::{DecodeOutcome, ErrorModel},
    rand::{Rng, SeedableRng},
};
use rand::Rng as _;
use rayon::prelude::*;
use std::{
    sync::mpsc::Sender,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::debug;

/// HARQ test error.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum Error {
    /// The MCS is not supported by the error model.
    #[error("MCS {mcs} out of range [0, {max}]")]
    McsOutOfRange {
        /// MCS.
        mcs: u8,
        /// Highest supported MCS.
        max: u8,
    },
    /// The allocation has no RBs.
    #[error("the number of RBs cannot be 0")]
    NoRbs,
    /// The transport block size is zero.
    #[error("the transport block size cannot be 0")]
    ZeroTbSize,
    /// The number of transport blocks is zero.
    #[error("the number of transport blocks cannot be 0")]
    NoTbs,
}

/// HARQ test parameters.
#[derive(Debug, Clone)]
pub struct HarqTestParameters {
    /// Error model.
    pub model: ErrorModel,
    /// MCS of every transmission.
    pub mcs: u8,
    /// Transport block size in bits.
    pub tb_size_bits: u32,
    /// Number of RBs allocated to each transmission.
    pub num_rbs: usize,
    /// Maximum number of retransmissions of a transport block.
    pub max_retx: u32,
    /// Number of transport blocks to simulate for each SINR.
    pub num_tbs: u64,
    /// Mean SINRs in dB.
    pub sinrs_db: Vec<f64>,
    /// Seed of the RNG.
    ///
    /// Each mean SINR uses its own RNG, seeded with this seed plus the index
    /// of the SINR.
    pub seed: u64,
}

/// HARQ test.
///
/// This struct is used to configure and run a HARQ test.
#[derive(Debug, Clone)]
pub struct HarqTest {
    parameters: HarqTestParameters,
}

/// Progress report.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Statistics of a mean SINR that has finished.
    Statistics(Statistics),
    /// The HARQ test has finished.
    Finished,
}

/// Progress reporter.
///
/// A reporter is used to send the statistics of each mean SINR as soon as it
/// finishes. Since the mean SINRs are simulated in parallel, the reports
/// can arrive in any order.
#[derive(Debug, Clone)]
pub struct Reporter {
    /// Sender element of the channel used to send the reports.
    pub tx: Sender<Report>,
}

impl Reporter {
    fn send(&self, report: Report) {
        // the receiver may have been dropped if nobody is interested in the
        // progress
        let _ = self.tx.send(report);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CurrentStatistics {
    num_tbs: u64,
    transmissions: u64,
    first_tx_errors: u64,
    residual_errors: u64,
    predicted_tbler_sum: f64,
    start: Instant,
}

/// HARQ test statistics.
///
/// This structure contains the statistics for a single mean SINR in a HARQ
/// test.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Mean SINR in dB units.
    pub sinr_db: f64,
    /// Number of transport blocks tested.
    pub num_tbs: u64,
    /// Number of transmissions, including retransmissions.
    pub transmissions: u64,
    /// Number of transport blocks that failed in the first transmission.
    pub first_tx_errors: u64,
    /// Number of transport blocks that failed in all the transmissions.
    pub residual_errors: u64,
    /// Block error rate of the first transmission.
    pub first_tx_bler: f64,
    /// Block error rate after all the retransmissions.
    pub residual_bler: f64,
    /// Average number of transmissions per transport block.
    pub average_transmissions: f64,
    /// Average TBLER of the first transmission predicted by the error model.
    pub average_predicted_tbler: f64,
    /// Decoded information bits per transmission.
    pub goodput_bits: f64,
    /// Elapsed time for this test case.
    pub elapsed: Duration,
}

impl HarqTest {
    /// Creates a new HARQ test.
    ///
    /// This function only defines the HARQ test. To run it it is necessary to
    /// call the [`HarqTest::run`] method.
    pub fn new(parameters: HarqTestParameters) -> Result<HarqTest, Error> {
        let max = parameters.model.max_mcs();
        if parameters.mcs > max {
            return Err(Error::McsOutOfRange {
                mcs: parameters.mcs,
                max,
            });
        }
        if parameters.num_rbs == 0 {
            return Err(Error::NoRbs);
        }
        if parameters.tb_size_bits == 0 {
            return Err(Error::ZeroTbSize);
        }
        if parameters.num_tbs == 0 {
            return Err(Error::NoTbs);
        }
        Ok(HarqTest { parameters })
    }

    /// Returns the parameters of the test.
    pub fn parameters(&self) -> &HarqTestParameters {
        &self.parameters
    }

    /// Runs the HARQ test.
    ///
    /// The mean SINRs are simulated in parallel. This function returns a list
    /// of statistics for each mean SINR, in the same order as the mean SINRs
    /// of the parameters. If a [`Reporter`] is given, the statistics of each
    /// mean SINR are also sent through it as soon as they are ready, followed
    /// by [`Report::Finished`].
    pub fn run(&self, reporter: Option<Reporter>) -> Vec<Statistics> {
        let statistics = self
            .parameters
            .sinrs_db
            .par_iter()
            .enumerate()
            .map_with(reporter.clone(), |reporter, (index, &sinr_db)| {
                let stats = self.simulate(index, sinr_db);
                if let Some(reporter) = reporter {
                    reporter.send(Report::Statistics(stats.clone()));
                }
                stats
            })
            .collect();
        if let Some(reporter) = &reporter {
            reporter.send(Report::Finished);
        }
        statistics
    }

    fn simulate(&self, index: usize, sinr_db: f64) -> Statistics {
        let p = &self.parameters;
        let mut rng = Rng::seed_from_u64(p.seed.wrapping_add(index as u64));
        let channel = RayleighChannel::new(from_db(sinr_db));
        let map = (0..p.num_rbs).collect::<Vec<_>>();
        let mut sinr = vec![0.0; p.num_rbs];
        let mut history: Vec<DecodeOutcome> = Vec::with_capacity(p.max_retx as usize + 1);
        let mut current = CurrentStatistics::new();
        for _ in 0..p.num_tbs {
            history.clear();
            loop {
                channel.fade(&mut rng, &mut sinr);
                let outcome = p
                    .model
                    .tb_decodification_stats(&sinr, &map, p.tb_size_bits, p.mcs, &history);
                current.transmissions += 1;
                let failed = rng.gen::<f64>() < outcome.tbler;
                if history.is_empty() {
                    current.predicted_tbler_sum += outcome.tbler;
                    if failed {
                        current.first_tx_errors += 1;
                    }
                }
                if !failed {
                    break;
                }
                if history.len() as u32 == p.max_retx {
                    current.residual_errors += 1;
                    break;
                }
                history.push(outcome);
            }
            current.num_tbs += 1;
        }
        let stats = Statistics::from_current(&current, sinr_db, p.tb_size_bits);
        debug!(
            sinr_db,
            first_tx_bler = stats.first_tx_bler,
            residual_bler = stats.residual_bler,
            "HARQ test point finished"
        );
        stats
    }
}

impl CurrentStatistics {
    fn new() -> CurrentStatistics {
        CurrentStatistics {
            num_tbs: 0,
            transmissions: 0,
            first_tx_errors: 0,
            residual_errors: 0,
            predicted_tbler_sum: 0.0,
            start: Instant::now(),
        }
    }
}

impl Default for CurrentStatistics {
    fn default() -> CurrentStatistics {
        CurrentStatistics::new()
    }
}

impl Statistics {
    fn from_current(stats: &CurrentStatistics, sinr_db: f64, tb_size_bits: u32) -> Statistics {
        let elapsed = Instant::now() - stats.start;
        let num_tbs = stats.num_tbs as f64;
        let delivered = stats.num_tbs - stats.residual_errors;
        Statistics {
            sinr_db,
            num_tbs: stats.num_tbs,
            transmissions: stats.transmissions,
            first_tx_errors: stats.first_tx_errors,
            residual_errors: stats.residual_errors,
            first_tx_bler: stats.first_tx_errors as f64 / num_tbs,
            residual_bler: stats.residual_errors as f64 / num_tbs,
            average_transmissions: stats.transmissions as f64 / num_tbs,
            average_predicted_tbler: stats.predicted_tbler_sum / num_tbs,
            goodput_bits: delivered as f64 * f64::from(tb_size_bits)
                / stats.transmissions as f64,
            elapsed,
        }
    }
}
