//! HARQ combining.
//!
//! When a transport block is retransmitted, the receiver combines the
//! retransmission with the previous failed attempts. This module computes the
//! effective SINR that results from such a combination, given the
//! [`DecodeOutcome`]s of the previous attempts. Two methods are supported:
//!
//! - Chase Combining (CC): every attempt carries the same coded bits. The
//!   SINRs of the attempts are added RB by RB and the EESM is applied to the
//!   sum.
//!
//! - Incremental Redundancy (IR): every attempt carries new parity bits. The
//!   effective SINR of the previous attempts is added to each RB of the new
//!   attempt, and the effective code rate decreases with every
//!   retransmission. The BLER is then looked up with an equivalent MCS of the
//!   same modulation order and a code rate close to the effective one.
//!
//! ## References
//! \[1\] IEEE 802.16m-08/004r2, IEEE 802.16m Evaluation Methodology Document,
//! Section 4.3.

use crate::{eesm::eesm, error_model::DecodeOutcome, mcs::McsTable};
use clap::ValueEnum;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// HARQ combining method.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Sequence, ValueEnum, Serialize, Deserialize,
)]
#[clap(rename_all = "PascalCase")]
pub enum HarqMethod {
    /// Chase Combining.
    ChaseCombining,
    /// Incremental Redundancy.
    #[default]
    IncrementalRedundancy,
}

/// Result of combining a transmission with its previous attempts.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Combined {
    /// Effective SINR (linear units) after combining.
    pub sinr_eff: f64,
    /// MCS whose curves model the combined transmission.
    pub mcs_eq: u8,
}

impl HarqMethod {
    /// Combines a transmission with the previous attempts in `history`.
    ///
    /// The transmission is described by the SINR of each RB in `sinr`, the
    /// RBs that it uses in `map`, its size `size_bits` in bits and its MCS.
    /// The attempts in `history` are sorted from oldest to newest. If
    /// `history` is empty, the result is the effective SINR of the
    /// transmission alone.
    ///
    /// # Panics
    ///
    /// Panics if `map` or the map of some entry in `history` is empty.
    pub fn combine(
        &self,
        table: McsTable,
        sinr: &[f64],
        map: &[usize],
        size_bits: u32,
        mcs: u8,
        history: &[DecodeOutcome],
    ) -> Combined {
        assert!(!map.is_empty(), "the number of allocated RBs cannot be 0");
        let beta = table.beta()[usize::from(mcs)];
        if history.is_empty() {
            return Combined {
                sinr_eff: eesm(map.iter().map(|&rb| sinr[rb]), beta),
                mcs_eq: mcs,
            };
        }
        let combined = match self {
            HarqMethod::ChaseCombining => Combined {
                sinr_eff: chase_combining(sinr, map, history, beta),
                mcs_eq: mcs,
            },
            HarqMethod::IncrementalRedundancy => {
                incremental_redundancy(table, sinr, map, size_bits, mcs, history, beta)
            }
        };
        debug!(
            method = %self,
            attempts = history.len() + 1,
            sinr_eff = combined.sinr_eff,
            mcs,
            mcs_eq = combined.mcs_eq,
            "HARQ combining"
        );
        combined
    }
}

fn chase_combining(sinr: &[f64], map: &[usize], history: &[DecodeOutcome], beta: f64) -> f64 {
    let mut union = history
        .iter()
        .flat_map(|h| h.map.iter().copied())
        .chain(map.iter().copied())
        .collect::<Vec<_>>();
    union.sort_unstable();
    union.dedup();
    // Position j of the combined transmission takes the j-th RB of each
    // attempt, wrapping around for attempts that used fewer RBs.
    let mut combined = vec![0.0; union.len()];
    let attempts = history
        .iter()
        .map(|h| (&h.sinr[..], &h.map[..]))
        .chain(std::iter::once((sinr, map)));
    for (attempt_sinr, attempt_map) in attempts {
        assert!(
            !attempt_map.is_empty(),
            "the number of allocated RBs cannot be 0"
        );
        for (j, c) in combined.iter_mut().enumerate() {
            *c += attempt_sinr[attempt_map[j % attempt_map.len()]];
        }
    }
    eesm(combined, beta)
}

fn incremental_redundancy(
    table: McsTable,
    sinr: &[f64],
    map: &[usize],
    size_bits: u32,
    mcs: u8,
    history: &[DecodeOutcome],
    beta: f64,
) -> Combined {
    let previous = history[history.len() - 1].sinr_eff;
    let sinr_eff = eesm(map.iter().map(|&rb| sinr[rb] + previous), beta);

    let info_bits = history[0].info_bits;
    let code_bits = history
        .iter()
        .map(|h| u64::from(h.code_bits))
        .sum::<u64>()
        + u64::from(code_bits(size_bits, table.ecr()[usize::from(mcs)]));
    let ecr_eff = info_bits as f64 / code_bits as f64;

    Combined {
        sinr_eff,
        mcs_eq: equivalent_mcs(table, mcs, ecr_eff),
    }
}

/// Returns the number of coded bits of a transmission.
///
/// This is the number of information bits `size_bits` divided by the
/// effective code rate `ecr`, truncated to an integer.
pub fn code_bits(size_bits: u32, ecr: f64) -> u32 {
    (f64::from(size_bits) / ecr) as u32
}

/// Returns the equivalent MCS for an effective code rate.
///
/// The equivalent MCS has the same modulation order as `mcs`. Going up from
/// the first MCS of that modulation order, it is the last one whose code rate
/// does not exceed `ecr_eff`. If all of them exceed it, the first MCS of the
/// modulation order is returned. The result is never larger than `mcs`.
///
/// # Panics
///
/// Panics if `mcs` is larger than the maximum MCS of the table.
pub fn equivalent_mcs(table: McsTable, mcs: u8, ecr_eff: f64) -> u8 {
    let ecr = table.ecr();
    let first = table.first_mcs_with_modulation_of(mcs);
    (first..=mcs)
        .take_while(|&m| ecr[usize::from(m)] <= ecr_eff)
        .last()
        .unwrap_or(first)
}

impl std::str::FromStr for HarqMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<HarqMethod, String> {
        Ok(match s {
            "ChaseCombining" | "HarqCc" | "cc" => HarqMethod::ChaseCombining,
            "IncrementalRedundancy" | "HarqIr" | "ir" => HarqMethod::IncrementalRedundancy,
            _ => Err(format!("invalid HARQ method {s}"))?,
        })
    }
}

impl std::fmt::Display for HarqMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                HarqMethod::ChaseCombining => "ChaseCombining",
                HarqMethod::IncrementalRedundancy => "IncrementalRedundancy",
            }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eesm::effective_sinr;

    fn outcome(sinr: Vec<f64>, map: Vec<usize>, sinr_eff: f64, size: u32, ecr: f64) -> DecodeOutcome {
        DecodeOutcome {
            tbler: 0.5,
            sinr_eff,
            sinr,
            map,
            info_bits: size,
            code_bits: code_bits(size, ecr),
            mcs_eq: 0,
            num_cbs: 1,
            cb_size: size,
        }
    }

    #[test]
    fn no_history() {
        let table = McsTable::Table1;
        let sinr = [1.0, 2.0, 3.0];
        for method in enum_iterator::all::<HarqMethod>() {
            let c = method.combine(table, &sinr, &[0, 2], 1000, 13, &[]);
            assert_eq!(c.mcs_eq, 13);
            assert_eq!(c.sinr_eff, effective_sinr(&sinr, &[0, 2], table.beta()[13]));
        }
    }

    #[test]
    fn chase_combining_repeated() {
        let table = McsTable::Table1;
        let beta = table.beta()[14];
        let sinr = vec![1.0, 3.0, 0.5, 8.0];
        let map = vec![0, 1, 3];
        let single = effective_sinr(&sinr, &map, beta);
        let history = [outcome(sinr.clone(), map.clone(), single, 4000, table.ecr()[14])];
        let c = HarqMethod::ChaseCombining.combine(table, &sinr, &map, 4000, 14, &history);
        assert_eq!(c.mcs_eq, 14);
        assert!(c.sinr_eff >= single);
        // identical attempts double the SINR of every RB
        let doubled = sinr.iter().map(|x| 2.0 * x).collect::<Vec<_>>();
        let expected = effective_sinr(&doubled, &map, beta);
        assert!((c.sinr_eff - expected).abs() < 1e-12);
    }

    #[test]
    fn chase_combining_wraps_around() {
        let table = McsTable::Table1;
        let beta = table.beta()[5];
        // previous attempt used RBs 0 and 1, the new one only RB 2
        let history = [outcome(vec![1.0, 2.0, 0.0], vec![0, 1], 1.4, 100, 0.24)];
        let sinr = [0.0, 0.0, 4.0];
        let c = HarqMethod::ChaseCombining.combine(table, &sinr, &[2], 100, 5, &history);
        // union has 3 RBs: [1 + 4, 2 + 4, 1 + 4]
        let expected = eesm([5.0, 6.0, 5.0], beta);
        assert!((c.sinr_eff - expected).abs() < 1e-12);
    }

    #[test]
    fn incremental_redundancy_sinr() {
        let table = McsTable::Table1;
        let beta = table.beta()[15];
        let sinr = [2.0, 4.0, 6.0];
        let map = [0, 1, 2];
        let history = [outcome(sinr.to_vec(), map.to_vec(), 3.0, 5000, table.ecr()[15])];
        let c = HarqMethod::IncrementalRedundancy.combine(table, &sinr, &map, 5000, 15, &history);
        let expected = eesm([5.0, 7.0, 9.0], beta);
        assert!((c.sinr_eff - expected).abs() < 1e-12);
    }

    #[test]
    fn incremental_redundancy_lowers_mcs() {
        let table = McsTable::Table1;
        let mcs = 16; // 16QAM, ECR 0.6
        let ecr = table.ecr()[usize::from(mcs)];
        let size = 6000;
        let sinr = [5.0; 4];
        let map = [0, 1, 2, 3];
        let mut history = vec![outcome(sinr.to_vec(), map.to_vec(), 5.0, size, ecr)];
        // two transmissions: ECR 0.3, lowest 16QAM MCS
        let c = HarqMethod::IncrementalRedundancy.combine(table, &sinr, &map, size, mcs, &history);
        assert_eq!(c.mcs_eq, 10);
        assert!(c.sinr_eff > 5.0);
        // a new transmission with the same ECR keeps lowering it, but never
        // changes the modulation order
        history.push(outcome(sinr.to_vec(), map.to_vec(), c.sinr_eff, size, ecr));
        let c = HarqMethod::IncrementalRedundancy.combine(table, &sinr, &map, size, mcs, &history);
        assert_eq!(c.mcs_eq, 10);
    }

    #[test]
    fn equivalent_mcs_selection() {
        let table = McsTable::Table1;
        // 64QAM: 17 (0.43) .. 28 (0.92)
        assert_eq!(equivalent_mcs(table, 28, 0.92), 28);
        assert_eq!(equivalent_mcs(table, 28, 0.46), 18);
        assert_eq!(equivalent_mcs(table, 28, 0.62), 21);
        assert_eq!(equivalent_mcs(table, 28, 0.1), 17);
        // never above the transmitted MCS
        assert_eq!(equivalent_mcs(table, 20, 0.9), 20);
        // QPSK
        assert_eq!(equivalent_mcs(table, 9, 0.2), 4);
        assert_eq!(equivalent_mcs(McsTable::Table2, 27, 0.7), 21);
    }

    #[test]
    fn code_bits_truncate() {
        assert_eq!(code_bits(1000, 0.3), 3333);
        assert_eq!(code_bits(1000, 0.5), 2000);
    }

    #[test]
    fn parse_and_display() {
        for method in enum_iterator::all::<HarqMethod>() {
            assert_eq!(method.to_string().parse::<HarqMethod>().unwrap(), method);
        }
        assert!("foo".parse::<HarqMethod>().is_err());
    }
}
