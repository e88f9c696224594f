//! Adaptive modulation and coding.
//!
//! This module selects the CQI and MCS that a receiver reports for a given
//! wideband SINR, and computes the transport block size that fits in an
//! allocation. Two models are supported to map SINR into CQI and MCS: the
//! [`ErrorModel`] itself, which picks the highest MCS that gives a TBLER not
//! larger than 10%, and a Shannon-like bound with a BER target.
//!
//! ## References
//! \[1\] G. Piro, N. Baldo, M. Miozzo, "An LTE module for the ns-3 network
//! simulator", SIMUTools 2011.

use crate::{error_model::ErrorModel, mcs::MAX_CQI};
use clap::ValueEnum;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Number of CRC bytes of a transport block and of each code block.
pub const CRC_LEN: u32 = 3;

/// TBLER target used by [`AmcModel::ErrorModel`].
pub const TBLER_TARGET: f64 = 0.1;

/// Model used to map SINR into CQI and MCS.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Sequence, ValueEnum, Serialize, Deserialize,
)]
pub enum AmcModel {
    /// Highest MCS with a TBLER not larger than 10% according to the error
    /// model.
    #[default]
    ErrorModel,
    /// Shannon bound with an SNR gap given by a BER target.
    Shannon,
}

/// AMC configuration.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmcConfig {
    /// Model used for the CQI feedback.
    pub model: AmcModel,
    /// BER target of [`AmcModel::Shannon`].
    pub ber: f64,
    /// Number of subcarriers per RB.
    pub num_sc_per_rb: u32,
    /// Number of subcarriers per RB used by reference signals.
    pub num_ref_sc_per_rb: u32,
}

impl Default for AmcConfig {
    fn default() -> AmcConfig {
        AmcConfig {
            model: AmcModel::default(),
            ber: 5e-5,
            num_sc_per_rb: 12,
            num_ref_sc_per_rb: 3,
        }
    }
}

/// Wideband CQI feedback.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct CqiFeedback {
    /// Reported CQI.
    pub cqi: u8,
    /// MCS corresponding to the CQI.
    pub mcs: u8,
}

/// Adaptive modulation and coding.
#[derive(Debug, Clone)]
pub struct Amc {
    model: ErrorModel,
    config: AmcConfig,
}

impl Amc {
    /// Creates a new AMC object that uses an error model.
    ///
    /// # Panics
    ///
    /// Panics if the number of reference signal subcarriers is larger than
    /// the number of subcarriers per RB.
    pub fn new(model: ErrorModel, config: AmcConfig) -> Amc {
        assert!(
            config.num_ref_sc_per_rb <= config.num_sc_per_rb,
            "more reference subcarriers than subcarriers per RB"
        );
        Amc { model, config }
    }

    /// Returns the error model.
    pub fn error_model(&self) -> &ErrorModel {
        &self.model
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AmcConfig {
        &self.config
    }

    /// Returns the highest MCS whose spectral efficiency does not exceed that
    /// of a CQI.
    ///
    /// # Panics
    ///
    /// Panics if `cqi` is larger than 15.
    pub fn mcs_from_cqi(&self, cqi: u8) -> u8 {
        let se = self.model.spectral_efficiency_for_cqi(cqi);
        let mut mcs = 0;
        while mcs < self.model.max_mcs() && self.model.spectral_efficiency_for_mcs(mcs + 1) <= se
        {
            mcs += 1;
        }
        mcs
    }

    /// Returns the CQI for a spectral efficiency.
    ///
    /// This is the highest CQI such that the spectral efficiencies of all the
    /// CQIs up to it are below `se`, or 0 if there is none.
    ///
    /// # Panics
    ///
    /// Panics if `se` is negative.
    pub fn cqi_from_spectral_efficiency(&self, se: f64) -> u8 {
        assert!(se >= 0.0, "negative spectral efficiency {se}");
        let mut cqi = 0;
        while cqi < MAX_CQI && self.model.spectral_efficiency_for_cqi(cqi + 1) < se {
            cqi += 1;
        }
        cqi
    }

    /// Returns the MCS for a spectral efficiency.
    ///
    /// This is the highest MCS such that the spectral efficiencies of all the
    /// MCSs up to it are below `se`, or 0 if there is none.
    ///
    /// # Panics
    ///
    /// Panics if `se` is negative.
    pub fn mcs_from_spectral_efficiency(&self, se: f64) -> u8 {
        assert!(se >= 0.0, "negative spectral efficiency {se}");
        let mut mcs = 0;
        while mcs < self.model.max_mcs() && self.model.spectral_efficiency_for_mcs(mcs + 1) < se {
            mcs += 1;
        }
        mcs
    }

    /// Returns the payload size in bytes of an allocation of `nprb` RBs.
    ///
    /// # Panics
    ///
    /// Panics if `mcs` is out of range.
    pub fn payload_size(&self, mcs: u8, nprb: u32) -> u32 {
        let useful_sc = self.config.num_sc_per_rb - self.config.num_ref_sc_per_rb;
        self.model.payload_size(useful_sc, mcs, nprb)
    }

    /// Returns the transport block size in bytes of an allocation of `nprb`
    /// RBs.
    ///
    /// This is the payload size minus the transport block CRC. If the
    /// transport block does not fit in a single code block, a CRC for each
    /// code block is subtracted instead.
    ///
    /// # Panics
    ///
    /// Panics if `mcs` is out of range.
    pub fn calculate_tb_size(&self, mcs: u8, nprb: u32) -> u32 {
        let payload_size = self.payload_size(mcs, nprb);
        let cb_size = self.model.max_cb_size(payload_size, mcs);
        let mut tb_size = if payload_size >= CRC_LEN {
            payload_size - CRC_LEN
        } else {
            payload_size
        };
        if tb_size > cb_size {
            let num_cbs = tb_size.div_ceil(cb_size);
            tb_size = payload_size.saturating_sub(num_cbs * CRC_LEN);
        }
        tb_size
    }

    /// Computes the wideband CQI feedback for a SINR measurement.
    ///
    /// The linear SINR of each RB is given in `sinr`. RBs with a SINR of
    /// exactly zero carry no signal and are ignored. The transport block
    /// size `tb_size_bytes` is only used by [`AmcModel::ErrorModel`].
    ///
    /// # Panics
    ///
    /// Panics if the model is [`AmcModel::ErrorModel`] and `tb_size_bytes` is
    /// zero.
    pub fn create_cqi_feedback_wb(&self, sinr: &[f64], tb_size_bytes: u32) -> CqiFeedback {
        assert!(
            tb_size_bytes > 0 || self.config.model != AmcModel::ErrorModel,
            "the transport block size cannot be 0"
        );
        let map = sinr
            .iter()
            .enumerate()
            .filter_map(|(rb, &s)| if s != 0.0 { Some(rb) } else { None })
            .collect::<Vec<_>>();
        if map.is_empty() {
            return CqiFeedback::default();
        }
        let feedback = match self.config.model {
            AmcModel::Shannon => self.shannon_feedback(sinr, &map),
            AmcModel::ErrorModel => self.error_model_feedback(sinr, &map, tb_size_bytes),
        };
        info!(
            model = ?self.config.model,
            active_rbs = map.len(),
            cqi = feedback.cqi,
            mcs = feedback.mcs,
            "CQI feedback"
        );
        feedback
    }

    fn shannon_feedback(&self, sinr: &[f64], map: &[usize]) -> CqiFeedback {
        let gap = -(5.0 * self.config.ber).ln() / 1.5;
        let (se_sum, cqi_sum) = map.iter().fold((0.0, 0.0), |(se_sum, cqi_sum), &rb| {
            let se = (1.0 + sinr[rb] / gap).log2();
            (
                se_sum + se,
                cqi_sum + f64::from(self.cqi_from_spectral_efficiency(se)),
            )
        });
        let num_rbs = map.len() as f64;
        CqiFeedback {
            cqi: (cqi_sum / num_rbs).ceil() as u8,
            mcs: self.mcs_from_spectral_efficiency(se_sum / num_rbs),
        }
    }

    fn error_model_feedback(&self, sinr: &[f64], map: &[usize], tb_size_bytes: u32) -> CqiFeedback {
        let size_bits = tb_size_bytes.saturating_mul(8);
        let max_mcs = self.model.max_mcs();
        let mcs = (0..=max_mcs)
            .take_while(|&mcs| {
                self.model
                    .tb_decodification_stats(sinr, map, size_bits, mcs, &[])
                    .tbler
                    <= TBLER_TARGET
            })
            .last();
        match mcs {
            None => CqiFeedback { cqi: 0, mcs: 0 },
            Some(mcs) if mcs == max_mcs => CqiFeedback { cqi: MAX_CQI, mcs },
            Some(mcs) => {
                let se = self.model.spectral_efficiency_for_mcs(mcs);
                let mut cqi = 0;
                while cqi < MAX_CQI && self.model.spectral_efficiency_for_cqi(cqi + 1) <= se {
                    cqi += 1;
                }
                CqiFeedback { cqi, mcs }
            }
        }
    }
}
