//! 5G NR MCS and CQI tables.
//!
//! This module contains the per-MCS constants used by the EESM error model:
//! the EESM beta calibration factor, the effective code rate (ECR), the
//! modulation order and the spectral efficiency, together with the spectral
//! efficiency of each CQI. Two variants exist, corresponding to MCS Table 1
//! (up to 64QAM) and MCS Table 2 (up to 256QAM).
//!
//! ## References
//! \[1\] [3GPP TS 38.214 Physical layer procedures for data](https://portal.3gpp.org/desktopmodules/Specifications/SpecificationDetails.aspx?specificationId=3216),
//! Tables 5.1.3.1-1, 5.1.3.1-2, 5.2.2.1-2 and 5.2.2.1-3.

use clap::ValueEnum;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

/// NR MCS table.
///
/// Selects the set of constant tables and the SINR-BLER curves used by the
/// error model.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Sequence, ValueEnum, Serialize, Deserialize,
)]
#[clap(rename_all = "PascalCase")]
pub enum McsTable {
    /// MCS Table 1 (QPSK, 16QAM and 64QAM, 29 MCSs).
    #[default]
    Table1,
    /// MCS Table 2 (QPSK, 16QAM, 64QAM and 256QAM, 28 MCSs).
    Table2,
}

const BETA_TABLE1: [f64; 29] = [
    1.1544, 1.1813, 1.2075, 1.2498, 1.2913, 1.3430, 1.3939, 1.45, 1.5053, 1.5614, 2.9764, 3.2740,
    3.7125, 4.1509, 4.6442, 5.1375, 5.4664, 7.9177, 9.0798, 10.9915, 12.7727, 14.5723, 16.5644,
    18.9099, 21.5072, 24.1479, 26.9422, 28.9536, 30.9325,
];

const BETA_TABLE2: [f64; 28] = [
    1.1544, 1.2075, 1.2963, 1.3939, 1.5053, 3.2740, 3.7125, 4.1509, 4.6442, 5.1375, 5.4664, 9.0798,
    10.9915, 12.7727, 14.5723, 16.5644, 18.9099, 21.5072, 24.1479, 26.9422, 52.9467, 58.9117,
    68.5736, 78.9416, 90.1368, 101.7340, 110.1554, 118.5677,
];

const ECR_TABLE1: [f64; 29] = [
    // QPSK
    0.08, 0.1, 0.11, 0.15, 0.19, 0.24, 0.3, 0.37, 0.44, 0.51, //
    // 16QAM
    0.3, 0.33, 0.37, 0.42, 0.48, 0.54, 0.6, //
    // 64QAM
    0.43, 0.45, 0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8, 0.85, 0.89, 0.92,
];

const ECR_TABLE2: [f64; 28] = [
    // QPSK
    0.11, 0.18, 0.30, 0.43, 0.58, //
    // 16QAM
    0.36, 0.42, 0.47, 0.54, 0.60, 0.64, //
    // 64QAM
    0.45, 0.50, 0.55, 0.60, 0.65, 0.70, 0.75, 0.80, 0.85, //
    // 256QAM
    0.66, 0.69, 0.73, 0.77, 0.82, 0.86, 0.89, 0.92,
];

const MODULATION_TABLE1: [u8; 29] = [
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, //
    4, 4, 4, 4, 4, 4, 4, //
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
];

const MODULATION_TABLE2: [u8; 28] = [
    2, 2, 2, 2, 2, //
    4, 4, 4, 4, 4, 4, //
    6, 6, 6, 6, 6, 6, 6, 6, 6, //
    8, 8, 8, 8, 8, 8, 8, 8,
];

const SE_MCS_TABLE1: [f64; 29] = [
    0.2344, 0.3066, 0.377, 0.4902, 0.616, 0.7402, 0.877, 1.0273, 1.1758, 1.3262, //
    1.3281, 1.4766, 1.6953, 1.9141, 2.1602, 2.4063, 2.5703, //
    2.5664, 2.7305, 3.0293, 3.3223, 3.6094, 3.9023, 4.2129, 4.5234, 4.8164, 5.1152, 5.3320,
    5.5547,
];

const SE_MCS_TABLE2: [f64; 28] = [
    0.2344, 0.3770, 0.6016, 0.8770, 1.1758, //
    1.4766, 1.6953, 1.9141, 2.1602, 2.4063, 2.5703, //
    2.7305, 3.0293, 3.3223, 3.6094, 3.9023, 4.2129, 4.5234, 4.8164, 5.1152, //
    5.3320, 5.5547, 5.8906, 6.2266, 6.5703, 6.9141, 7.1602, 7.4063,
];

// CQI 0 means out of range
const SE_CQI_TABLE1: [f64; 16] = [
    0.0, 0.15, 0.23, 0.38, 0.6, 0.88, 1.18, 1.48, 1.91, 2.41, 2.73, 3.32, 3.9, 4.52, 5.12, 5.55,
];

const SE_CQI_TABLE2: [f64; 16] = [
    0.0, 0.15, 0.37, 0.87, 1.47, 1.91, 2.40, 2.73, 3.32, 3.90, 4.52, 5.11, 5.55, 6.22, 6.91, 7.40,
];

/// Highest CQI index.
pub const MAX_CQI: u8 = 15;

impl McsTable {
    /// Returns the EESM beta calibration factor of each MCS.
    pub fn beta(&self) -> &'static [f64] {
        match self {
            McsTable::Table1 => &BETA_TABLE1,
            McsTable::Table2 => &BETA_TABLE2,
        }
    }

    /// Returns the effective code rate of each MCS.
    pub fn ecr(&self) -> &'static [f64] {
        match self {
            McsTable::Table1 => &ECR_TABLE1,
            McsTable::Table2 => &ECR_TABLE2,
        }
    }

    /// Returns the modulation order (bits per symbol) of each MCS.
    pub fn modulation_order(&self) -> &'static [u8] {
        match self {
            McsTable::Table1 => &MODULATION_TABLE1,
            McsTable::Table2 => &MODULATION_TABLE2,
        }
    }

    /// Returns the spectral efficiency of each MCS.
    pub fn spectral_efficiency_for_mcs(&self) -> &'static [f64] {
        match self {
            McsTable::Table1 => &SE_MCS_TABLE1,
            McsTable::Table2 => &SE_MCS_TABLE2,
        }
    }

    /// Returns the spectral efficiency of each CQI (0 to 15).
    pub fn spectral_efficiency_for_cqi(&self) -> &'static [f64; 16] {
        match self {
            McsTable::Table1 => &SE_CQI_TABLE1,
            McsTable::Table2 => &SE_CQI_TABLE2,
        }
    }

    /// Returns the highest MCS index of the table.
    pub fn max_mcs(&self) -> u8 {
        // both tables have less than 256 entries
        (self.ecr().len() - 1) as u8
    }

    /// Returns the index of the first MCS that uses the same modulation
    /// order as `mcs`.
    ///
    /// # Panics
    ///
    /// Panics if `mcs` is larger than [`McsTable::max_mcs`].
    pub fn first_mcs_with_modulation_of(&self, mcs: u8) -> u8 {
        let modulation = self.modulation_order();
        let qm = modulation[usize::from(mcs)];
        // the tables are sorted by modulation order
        modulation.partition_point(|&m| m < qm) as u8
    }
}

impl std::str::FromStr for McsTable {
    type Err = String;

    fn from_str(s: &str) -> Result<McsTable, String> {
        Ok(match s {
            "Table1" | "McsTable1" | "1" => McsTable::Table1,
            "Table2" | "McsTable2" | "2" => McsTable::Table2,
            _ => Err(format!("invalid MCS table {s}"))?,
        })
    }
}

impl std::fmt::Display for McsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                McsTable::Table1 => "Table1",
                McsTable::Table2 => "Table2",
            }
        )
    }
}
