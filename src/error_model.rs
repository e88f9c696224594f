//! EESM error model for NR transport blocks.
//!
//! The [`ErrorModel`] predicts the transport block error rate (TBLER) of a
//! transmission from the SINR of the resource blocks (RBs) that it uses. The
//! steps are the following:
//!
//! 1. The SINRs are compressed into an effective SINR with the
//!    [EESM](crate::eesm). If there are previous attempts of the same
//!    transport block, they are combined with the current one according to
//!    the [`HarqMethod`].
//!
//! 2. The transport block is [segmented](Segmentation) into code blocks.
//!
//! 3. The code block error rate is [looked up](crate::lookup) in the
//!    SINR-BLER curves for the code block size.
//!
//! 4. The TBLER is computed assuming that the code blocks fail
//!    independently.
//!
//! # Examples
//! ```
//! use nr_l2sm::error_model::{ErrorModel, ErrorModelConfig};
//!
//! let model = ErrorModel::new(ErrorModelConfig::default());
//! let sinr = vec![20.0; 10];
//! let map = (0..10).collect::<Vec<_>>();
//! let first = model.tb_decodification_stats(&sinr, &map, 4000, 14, &[]);
//! let second = model.tb_decodification_stats(&sinr, &map, 4000, 14, &[first.clone()]);
//! assert!(second.tbler <= first.tbler);
//! ```

use crate::{
    dataset::CurveDataset,
    harq::{self, Combined, HarqMethod},
    lookup::cb_bler,
    mcs::{McsTable, MAX_CQI},
    segmentation::{BaseGraph, Segmentation},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Error model configuration.
///
/// The configuration is fixed when the [`ErrorModel`] is constructed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct ErrorModelConfig {
    /// MCS table.
    pub mcs_table: McsTable,
    /// HARQ combining method.
    pub harq_method: HarqMethod,
}

/// Outcome of the decoding of a transport block.
///
/// Besides the TBLER, the outcome stores the data that is needed to combine
/// the transmission with future retransmissions. Callers keep the outcomes of
/// the failed attempts of a transport block, from oldest to newest, and pass
/// them as the history of the next attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeOutcome {
    /// Transport block error rate.
    pub tbler: f64,
    /// Effective SINR (linear units), after HARQ combining.
    pub sinr_eff: f64,
    /// SINR of each RB (linear units).
    pub sinr: Vec<f64>,
    /// RBs used by the transmission.
    pub map: Vec<usize>,
    /// Number of information bits.
    pub info_bits: u32,
    /// Number of coded bits.
    pub code_bits: u32,
    /// MCS used for the SINR-BLER curve lookup.
    ///
    /// This is the transmitted MCS except for retransmissions with
    /// incremental redundancy.
    pub mcs_eq: u8,
    /// Number of code blocks.
    pub num_cbs: u32,
    /// Size of each code block in bits.
    pub cb_size: u32,
}

/// EESM error model.
///
/// The model is immutable and can be shared between threads.
#[derive(Debug, Clone)]
pub struct ErrorModel {
    config: ErrorModelConfig,
    dataset: Arc<CurveDataset>,
}

impl ErrorModel {
    /// Creates an error model that uses the built-in SINR-BLER curves of the
    /// MCS table of the configuration.
    pub fn new(config: ErrorModelConfig) -> ErrorModel {
        ErrorModel::with_dataset(config, CurveDataset::builtin(config.mcs_table))
    }

    /// Creates an error model that uses a custom dataset of SINR-BLER curves.
    pub fn with_dataset(config: ErrorModelConfig, dataset: Arc<CurveDataset>) -> ErrorModel {
        ErrorModel { config, dataset }
    }

    /// Returns the configuration of the model.
    pub fn config(&self) -> &ErrorModelConfig {
        &self.config
    }

    /// Returns the SINR-BLER curves used by the model.
    pub fn dataset(&self) -> &Arc<CurveDataset> {
        &self.dataset
    }

    /// Returns the MCS table of the model.
    pub fn mcs_table(&self) -> McsTable {
        self.config.mcs_table
    }

    /// Returns the highest MCS supported by the model.
    pub fn max_mcs(&self) -> u8 {
        self.config.mcs_table.max_mcs()
    }

    /// Computes the decoding outcome of a transport block.
    ///
    /// The linear SINR of every RB is given in `sinr`, and `map` lists the RBs
    /// that the transmission uses. The transport block has `size_bits`
    /// information bits and uses the MCS `mcs`. The outcomes of the previous
    /// attempts of the same transport block are given in `history`, from
    /// oldest to newest. The history is empty for a first transmission.
    ///
    /// # Panics
    ///
    /// Panics if `mcs` is larger than [`ErrorModel::max_mcs`], if `map` or the
    /// map of some outcome in `history` is empty, or if `size_bits` is zero.
    pub fn tb_decodification_stats(
        &self,
        sinr: &[f64],
        map: &[usize],
        size_bits: u32,
        mcs: u8,
        history: &[DecodeOutcome],
    ) -> DecodeOutcome {
        self.check_mcs(mcs);
        let table = self.config.mcs_table;
        let ecr = table.ecr()[usize::from(mcs)];

        let Combined { sinr_eff, mcs_eq } =
            self.config
                .harq_method
                .combine(table, sinr, map, size_bits, mcs, history);

        let segmentation = Segmentation::new(size_bits, ecr);
        let cbler = cb_bler(
            &self.dataset,
            segmentation.base_graph,
            mcs_eq,
            segmentation.cb_size,
            sinr_eff,
        );
        let tbler = if segmentation.num_cbs == 1 {
            cbler
        } else {
            1.0 - (1.0 - cbler).powi(segmentation.num_cbs as i32)
        };
        debug!(
            size_bits,
            mcs,
            mcs_eq,
            retx = history.len(),
            sinr_eff,
            cbler,
            tbler,
            "TB decodification"
        );

        DecodeOutcome {
            tbler,
            sinr_eff,
            sinr: sinr.to_vec(),
            map: map.to_vec(),
            info_bits: size_bits,
            code_bits: harq::code_bits(size_bits, ecr),
            mcs_eq,
            num_cbs: segmentation.num_cbs,
            cb_size: segmentation.cb_size,
        }
    }

    /// Maps an effective SINR into a code block error rate.
    ///
    /// Unlike [`ErrorModel::tb_decodification_stats`], the base graph is
    /// selected from the code block size `cb_size_bits` rather than from the
    /// transport block size.
    ///
    /// # Panics
    ///
    /// Panics if `mcs` is larger than [`ErrorModel::max_mcs`] or if
    /// `cb_size_bits` is zero.
    pub fn mapping_sinr_bler(&self, sinr_eff: f64, mcs: u8, cb_size_bits: u32) -> f64 {
        self.check_mcs(mcs);
        let ecr = self.config.mcs_table.ecr()[usize::from(mcs)];
        let base_graph = BaseGraph::select(cb_size_bits, ecr);
        cb_bler(&self.dataset, base_graph, mcs, cb_size_bits, sinr_eff)
    }

    /// Returns the spectral efficiency of an MCS.
    ///
    /// # Panics
    ///
    /// Panics if `mcs` is larger than [`ErrorModel::max_mcs`].
    pub fn spectral_efficiency_for_mcs(&self, mcs: u8) -> f64 {
        self.check_mcs(mcs);
        self.config.mcs_table.spectral_efficiency_for_mcs()[usize::from(mcs)]
    }

    /// Returns the spectral efficiency of a CQI.
    ///
    /// # Panics
    ///
    /// Panics if `cqi` is larger than 15.
    pub fn spectral_efficiency_for_cqi(&self, cqi: u8) -> f64 {
        assert!(cqi <= MAX_CQI, "CQI {cqi} out of range [0, {MAX_CQI}]");
        self.config.mcs_table.spectral_efficiency_for_cqi()[usize::from(cqi)]
    }

    /// Returns the maximum code block size in bytes.
    ///
    /// This is the largest code block supported by the base graph that would
    /// be used for a transport block of `tb_size_bytes` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `mcs` is larger than [`ErrorModel::max_mcs`].
    pub fn max_cb_size(&self, tb_size_bytes: u32, mcs: u8) -> u32 {
        self.check_mcs(mcs);
        let ecr = self.config.mcs_table.ecr()[usize::from(mcs)];
        BaseGraph::select(tb_size_bytes.saturating_mul(8), ecr).max_lifted_cb_size() / 8
    }

    /// Returns the payload size in bytes that fits in an allocation.
    ///
    /// The allocation has `rb_num` RBs with `useful_sc` subcarriers available
    /// for data each.
    ///
    /// # Panics
    ///
    /// Panics if `mcs` is larger than [`ErrorModel::max_mcs`].
    pub fn payload_size(&self, useful_sc: u32, mcs: u8, rb_num: u32) -> u32 {
        self.check_mcs(mcs);
        let table = self.config.mcs_table;
        let resource_elements = f64::from(useful_sc) * f64::from(rb_num);
        let qm = f64::from(table.modulation_order()[usize::from(mcs)]);
        let ecr = table.ecr()[usize::from(mcs)];
        (resource_elements * qm * ecr / 8.0).floor() as u32
    }

    fn check_mcs(&self, mcs: u8) {
        let max = self.max_mcs();
        assert!(
            mcs <= max,
            "MCS {mcs} out of range [0, {max}] for {}",
            self.config.mcs_table
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{dataset::BlerCurve, eesm::from_db};

    fn model(table: McsTable, harq_method: HarqMethod) -> ErrorModel {
        ErrorModel::new(ErrorModelConfig {
            mcs_table: table,
            harq_method,
        })
    }

    #[test]
    fn golden_single_cb() {
        // QPSK, ECR 0.19, single code block of 3840 bits in BG2
        let mut dataset = CurveDataset::new();
        let curve = BlerCurve::new(
            vec![0.5, 1.0, 1.68, 2.2, 2.9],
            vec![1.0, 0.93, 0.548, 0.12, 0.004],
        )
        .unwrap();
        dataset.insert(BaseGraph::Two, 4, 3840, curve);
        let model = ErrorModel::with_dataset(ErrorModelConfig::default(), Arc::new(dataset));
        let sinr = [0.0, from_db(1.68 + 1e-6)];
        let outcome = model.tb_decodification_stats(&sinr, &[1], 3840, 4, &[]);
        assert_eq!(outcome.num_cbs, 1);
        assert_eq!(outcome.cb_size, 3840);
        assert_eq!(outcome.mcs_eq, 4);
        let tol = 1e-12;
        assert!((outcome.tbler - 0.548).abs() < tol);
        assert!((outcome.sinr_eff - sinr[1]).abs() < 1e-9);
    }

    #[test]
    fn code_block_aggregation() {
        let model = model(McsTable::Table1, HarqMethod::default());
        let dataset = model.dataset();
        // 16QAM, ECR 0.48, three code blocks of 7040 bits in BG1
        let (_, curve) = dataset.curve(BaseGraph::One, 14, 7040).unwrap();
        let sinr_db = curve.sinr_db()[curve.len() / 2];
        let sinr = vec![from_db(sinr_db + 1e-6); 20];
        let map = (0..20).collect::<Vec<_>>();
        let outcome = model.tb_decodification_stats(&sinr, &map, 20000, 14, &[]);
        assert_eq!(outcome.num_cbs, 3);
        assert_eq!(outcome.cb_size, 7040);
        let p = cb_bler(dataset, BaseGraph::One, 14, 7040, outcome.sinr_eff);
        assert!(p > 0.0 && p < 1.0);
        assert_eq!(outcome.tbler, 1.0 - (1.0 - p).powi(3));
        assert!(outcome.tbler >= p);

        // single code block
        let outcome = model.tb_decodification_stats(&sinr, &map, 6000, 14, &[]);
        assert_eq!(outcome.num_cbs, 1);
        let p = cb_bler(dataset, BaseGraph::One, 14, outcome.cb_size, outcome.sinr_eff);
        assert_eq!(outcome.tbler, p);
    }

    #[test]
    fn single_cb_for_bg1() {
        let model = model(McsTable::Table1, HarqMethod::default());
        let sinr = [10.0; 4];
        for size in [3900, 5000, 7000, 8448] {
            let outcome = model.tb_decodification_stats(&sinr, &[0, 1, 2, 3], size, 20, &[]);
            assert_eq!(outcome.num_cbs, 1);
            assert!(outcome.cb_size >= size);
        }
    }

    #[test]
    fn bookkeeping() {
        let model = model(McsTable::Table1, HarqMethod::default());
        let sinr = [3.0, 4.0, 5.0];
        let outcome = model.tb_decodification_stats(&sinr, &[0, 2], 5000, 16, &[]);
        assert_eq!(outcome.sinr, sinr.to_vec());
        assert_eq!(outcome.map, vec![0, 2]);
        assert_eq!(outcome.info_bits, 5000);
        // 5000 / 0.6
        assert_eq!(outcome.code_bits, 8333);
    }

    #[test]
    fn deterministic() {
        for method in enum_iterator::all::<HarqMethod>() {
            let model = model(McsTable::Table1, method);
            let sinr = (0..12).map(|j| 3.0 + f64::from(j)).collect::<Vec<_>>();
            let map = vec![1, 3, 5, 7, 9, 11];
            let first = model.tb_decodification_stats(&sinr, &map, 4500, 15, &[]);
            let history = vec![first];
            let a = model.tb_decodification_stats(&sinr, &[0, 2, 4], 4500, 15, &history);
            let b = model.tb_decodification_stats(&sinr, &[0, 2, 4], 4500, 15, &history);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn retransmission_helps() {
        for method in enum_iterator::all::<HarqMethod>() {
            let model = model(McsTable::Table1, method);
            let sinr = vec![from_db(8.0); 10];
            let map = (0..10).collect::<Vec<_>>();
            let first = model.tb_decodification_stats(&sinr, &map, 4000, 14, &[]);
            let second = model.tb_decodification_stats(&sinr, &map, 4000, 14, &[first.clone()]);
            assert!(second.sinr_eff > first.sinr_eff);
            assert!(second.tbler <= first.tbler);
        }
    }

    #[test]
    fn incremental_redundancy_equivalent_mcs() {
        let model = model(McsTable::Table1, HarqMethod::IncrementalRedundancy);
        let sinr = vec![from_db(5.0); 4];
        let map = [0, 1, 2, 3];
        let first = model.tb_decodification_stats(&sinr, &map, 6000, 16, &[]);
        assert_eq!(first.mcs_eq, 16);
        let second = model.tb_decodification_stats(&sinr, &map, 6000, 16, &[first]);
        assert_eq!(second.mcs_eq, 10);
        assert_eq!(second.info_bits, 6000);

        let model = self::model(McsTable::Table1, HarqMethod::ChaseCombining);
        let first = model.tb_decodification_stats(&sinr, &map, 6000, 16, &[]);
        let second = model.tb_decodification_stats(&sinr, &map, 6000, 16, &[first]);
        assert_eq!(second.mcs_eq, 16);
    }

    #[test]
    fn mapping_sinr_bler_selects_bg_from_cb_size() {
        let model = model(McsTable::Table1, HarqMethod::default());
        // MCS 18 (ECR 0.45): BG2 up to 3824 bits, BG1 above
        assert_eq!(model.mapping_sinr_bler(15.84, 18, 3200), 0.964962);
        assert_eq!(model.mapping_sinr_bler(19.95, 18, 3200), 0.0036);
        assert_eq!(model.mapping_sinr_bler(1.0, 18, 3900), 1.0);
        assert_eq!(model.mapping_sinr_bler(7.9433, 14, 6300), 0.992308);
    }

    #[test]
    fn spectral_efficiency() {
        let model1 = model(McsTable::Table1, HarqMethod::default());
        let model2 = model(McsTable::Table2, HarqMethod::default());
        assert_eq!(model1.spectral_efficiency_for_mcs(28), 5.5547);
        assert_eq!(model2.spectral_efficiency_for_mcs(27), 7.4063);
        assert_eq!(model1.spectral_efficiency_for_cqi(0), 0.0);
        assert_eq!(model1.spectral_efficiency_for_cqi(15), 5.55);
        assert_eq!(model2.spectral_efficiency_for_cqi(15), 7.40);
    }

    #[test]
    fn sizes() {
        let model = model(McsTable::Table1, HarqMethod::default());
        assert_eq!(model.max_mcs(), 28);
        assert_eq!(model.max_cb_size(1000, 20), 1056);
        assert_eq!(model.max_cb_size(100, 20), 480);
        assert_eq!(model.max_cb_size(1000, 0), 480);
        // 9 * 10 * 6 * 0.92 / 8 = 62.1
        assert_eq!(model.payload_size(9, 28, 10), 62);
        // 9 * 1 * 2 * 0.08 / 8 = 0.18
        assert_eq!(model.payload_size(9, 0, 1), 0);
    }

    #[test]
    #[should_panic]
    fn mcs_out_of_range() {
        let model = model(McsTable::Table2, HarqMethod::default());
        model.tb_decodification_stats(&[1.0], &[0], 1000, 28, &[]);
    }

    #[test]
    #[should_panic]
    fn empty_map() {
        let model = model(McsTable::Table1, HarqMethod::default());
        model.tb_decodification_stats(&[1.0], &[], 1000, 5, &[]);
    }

    #[test]
    #[should_panic]
    fn cqi_out_of_range() {
        let model = model(McsTable::Table1, HarqMethod::default());
        model.spectral_efficiency_for_cqi(16);
    }
}
