//! SINR-BLER curves.
//!
//! The error model maps an effective SINR into a code block error rate by
//! looking up curves obtained by link-level simulation of the NR LDPC code.
//! The curves are organized by LDPC base graph, MCS and code block size. Each
//! curve is a list of SINR samples in dB in ascending order together with the
//! BLER measured at each of them.
//!
//! The curves for MCS Table 1 and MCS Table 2 are built into the crate (see
//! [`CurveDataset::builtin`]). Other datasets can be loaded from JSON with
//! [`CurveDataset::from_json`] or constructed with [`CurveDataset::insert`].
//!
//! The JSON format is
//! ```text
//! {
//!   "bg1": [ { "<cb size>": { "sinr_db": [...], "bler": [...] }, ... }, ... ],
//!   "bg2": [ ... ]
//! }
//! ```
//! where the arrays in `"bg1"` and `"bg2"` are indexed by MCS.

use crate::{mcs::McsTable, segmentation::BaseGraph};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::Read,
    sync::{Arc, OnceLock},
};
use thiserror::Error;

/// Dataset error.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error when reading a dataset.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The curve has no samples.
    #[error("curve has no samples")]
    EmptyCurve,
    /// The SINR and BLER lists have different lengths.
    #[error("curve has {sinr} SINR samples but {bler} BLER samples")]
    LengthMismatch {
        /// Number of SINR samples.
        sinr: usize,
        /// Number of BLER samples.
        bler: usize,
    },
    /// The SINR samples are not in ascending order.
    #[error("curve SINR samples are not in ascending order")]
    UnsortedSinr,
    /// A BLER sample is outside the interval [0, 1].
    #[error("BLER sample {0} is outside [0, 1]")]
    BlerOutOfRange(f64),
    /// A SINR sample is NaN or infinite.
    #[error("SINR sample {0} is not finite")]
    NonFiniteSinr(f64),
    /// The BLER increases with the SINR.
    #[error("curve BLER samples increase with the SINR")]
    IncreasingBler,
}

/// SINR-BLER curve.
///
/// A curve with a single sample is a placeholder for an MCS and code block
/// size combination for which there is no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve")]
pub struct BlerCurve {
    sinr_db: Vec<f64>,
    bler: Vec<f64>,
}

#[derive(Deserialize)]
struct RawCurve {
    sinr_db: Vec<f64>,
    bler: Vec<f64>,
}

impl TryFrom<RawCurve> for BlerCurve {
    type Error = Error;

    fn try_from(raw: RawCurve) -> Result<BlerCurve, Error> {
        BlerCurve::new(raw.sinr_db, raw.bler)
    }
}

impl BlerCurve {
    /// Creates a new curve.
    ///
    /// The SINR samples are given in dB and must be finite and in ascending
    /// order. The BLER samples must be probabilities and must not increase
    /// with the SINR. An error is returned otherwise, or if the curve is
    /// empty, or if the lengths of both lists differ.
    pub fn new(sinr_db: Vec<f64>, bler: Vec<f64>) -> Result<BlerCurve, Error> {
        if sinr_db.is_empty() {
            return Err(Error::EmptyCurve);
        }
        if sinr_db.len() != bler.len() {
            return Err(Error::LengthMismatch {
                sinr: sinr_db.len(),
                bler: bler.len(),
            });
        }
        if let Some(&s) = sinr_db.iter().find(|s| !s.is_finite()) {
            return Err(Error::NonFiniteSinr(s));
        }
        if sinr_db.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::UnsortedSinr);
        }
        if let Some(&b) = bler.iter().find(|b| !(0.0..=1.0).contains(*b)) {
            return Err(Error::BlerOutOfRange(b));
        }
        if bler.windows(2).any(|w| w[1] > w[0]) {
            return Err(Error::IncreasingBler);
        }
        Ok(BlerCurve { sinr_db, bler })
    }

    /// Returns the placeholder curve.
    ///
    /// This curve has a single sample at 0 dB with BLER 0.
    pub fn placeholder() -> BlerCurve {
        BlerCurve {
            sinr_db: vec![0.0],
            bler: vec![0.0],
        }
    }

    /// Returns the SINR samples in dB.
    pub fn sinr_db(&self) -> &[f64] {
        &self.sinr_db
    }

    /// Returns the BLER samples.
    pub fn bler(&self) -> &[f64] {
        &self.bler
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.sinr_db.len()
    }

    /// Returns `true` if the curve has no samples.
    ///
    /// A validated curve is never empty.
    pub fn is_empty(&self) -> bool {
        self.sinr_db.is_empty()
    }

    /// Returns `true` if the curve is a placeholder without real data.
    pub fn is_placeholder(&self) -> bool {
        self.len() == 1
    }
}

type CbSizeCurves = BTreeMap<u32, BlerCurve>;

/// Dataset of SINR-BLER curves.
///
/// The dataset is indexed by base graph, MCS and code block size in bits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveDataset {
    bg1: Vec<CbSizeCurves>,
    bg2: Vec<CbSizeCurves>,
}

static TABLE1: OnceLock<Arc<CurveDataset>> = OnceLock::new();
static TABLE2: OnceLock<Arc<CurveDataset>> = OnceLock::new();

impl CurveDataset {
    /// Creates an empty dataset.
    pub fn new() -> CurveDataset {
        CurveDataset::default()
    }

    /// Returns the built-in dataset for an MCS table.
    ///
    /// The dataset is parsed the first time that this function is called and
    /// shared afterwards.
    pub fn builtin(table: McsTable) -> Arc<CurveDataset> {
        let (cell, json) = match table {
            McsTable::Table1 => (&TABLE1, include_str!("../data/bler_table1.json")),
            McsTable::Table2 => (&TABLE2, include_str!("../data/bler_table2.json")),
        };
        Arc::clone(cell.get_or_init(|| {
            Arc::new(
                CurveDataset::from_json(json)
                    .unwrap_or_else(|e| panic!("built-in dataset for {table} is invalid: {e}")),
            )
        }))
    }

    /// Parses a dataset from a JSON string.
    pub fn from_json(json: &str) -> Result<CurveDataset, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON dataset.
    pub fn from_reader<R: Read>(reader: R) -> Result<CurveDataset, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Serializes the dataset to JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Inserts a curve in the dataset.
    ///
    /// If the dataset already had a curve for this base graph, MCS and code
    /// block size, the old curve is returned.
    pub fn insert(
        &mut self,
        base_graph: BaseGraph,
        mcs: u8,
        cb_size: u32,
        curve: BlerCurve,
    ) -> Option<BlerCurve> {
        let per_mcs = match base_graph {
            BaseGraph::One => &mut self.bg1,
            BaseGraph::Two => &mut self.bg2,
        };
        let mcs = usize::from(mcs);
        if per_mcs.len() <= mcs {
            per_mcs.resize_with(mcs + 1, BTreeMap::new);
        }
        per_mcs[mcs].insert(cb_size, curve)
    }

    /// Returns the number of MCSs with entries for a base graph.
    pub fn num_mcs(&self, base_graph: BaseGraph) -> usize {
        self.per_mcs(base_graph).len()
    }

    /// Returns the curves of a base graph and MCS, indexed by code block
    /// size.
    pub fn curves(&self, base_graph: BaseGraph, mcs: u8) -> Option<&BTreeMap<u32, BlerCurve>> {
        self.per_mcs(base_graph).get(usize::from(mcs))
    }

    /// Returns the curve to use for a code block of `cb_size` bits.
    ///
    /// This is the curve with the largest code block size not exceeding
    /// `cb_size`, so that the BLER is never underestimated by quantization of
    /// the code block size. If all the code block sizes in the dataset are
    /// larger, the curve with the smallest one is used. The code block size
    /// of the curve is returned together with the curve. `None` is returned
    /// if there are no curves for the base graph and MCS.
    pub fn curve(&self, base_graph: BaseGraph, mcs: u8, cb_size: u32) -> Option<(u32, &BlerCurve)> {
        let curves = self.curves(base_graph, mcs)?;
        curves
            .range(..=cb_size)
            .next_back()
            .or_else(|| curves.iter().next())
            .map(|(&size, curve)| (size, curve))
    }

    fn per_mcs(&self, base_graph: BaseGraph) -> &[CbSizeCurves] {
        match base_graph {
            BaseGraph::One => &self.bg1,
            BaseGraph::Two => &self.bg2,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builtin_datasets() {
        let t1 = CurveDataset::builtin(McsTable::Table1);
        assert_eq!(t1.num_mcs(BaseGraph::One), 19);
        assert_eq!(t1.num_mcs(BaseGraph::Two), 19);
        let t2 = CurveDataset::builtin(McsTable::Table2);
        assert_eq!(t2.num_mcs(BaseGraph::One), 12);
        assert_eq!(t2.num_mcs(BaseGraph::Two), 12);
        // parsed only once
        assert!(Arc::ptr_eq(&t1, &CurveDataset::builtin(McsTable::Table1)));
    }

    #[test]
    fn builtin_curves_are_monotonic() {
        for table in enum_iterator::all::<McsTable>() {
            let dataset = CurveDataset::builtin(table);
            for bg in enum_iterator::all::<BaseGraph>() {
                for mcs in 0..dataset.num_mcs(bg) {
                    for curve in dataset.curves(bg, mcs as u8).unwrap().values() {
                        assert!(curve.bler().windows(2).all(|w| w[1] <= w[0]));
                    }
                }
            }
        }
    }

    #[test]
    fn placeholders() {
        let dataset = CurveDataset::builtin(McsTable::Table1);
        let (size, curve) = dataset.curve(BaseGraph::Two, 4, 3840).unwrap();
        assert_eq!(size, 0);
        assert!(curve.is_placeholder());
        assert_eq!(curve, &BlerCurve::placeholder());
        let (_, curve) = dataset.curve(BaseGraph::One, 14, 3840).unwrap();
        assert!(!curve.is_placeholder());
    }

    #[test]
    fn closest_size_below() {
        let dataset = CurveDataset::builtin(McsTable::Table1);
        assert_eq!(dataset.curve(BaseGraph::One, 14, 3900).unwrap().0, 3840);
        assert_eq!(dataset.curve(BaseGraph::One, 14, 3840).unwrap().0, 3840);
        assert_eq!(dataset.curve(BaseGraph::One, 14, 6300).unwrap().0, 6272);
        assert_eq!(dataset.curve(BaseGraph::Two, 18, 3200).unwrap().0, 3104);
        // smaller than all the sizes in the dataset
        assert_eq!(dataset.curve(BaseGraph::One, 14, 1000).unwrap().0, 3752);
        // larger than all the sizes in the dataset
        assert_eq!(dataset.curve(BaseGraph::Two, 18, 100000).unwrap().0, 3496);
        // MCS without entries
        assert!(dataset.curve(BaseGraph::One, 25, 3840).is_none());
    }

    #[test]
    fn insert_and_json() {
        let mut dataset = CurveDataset::new();
        let curve = BlerCurve::new(vec![1.0, 2.0, 3.0], vec![1.0, 0.5, 0.0]).unwrap();
        assert!(dataset
            .insert(BaseGraph::Two, 4, 3840, curve.clone())
            .is_none());
        assert_eq!(dataset.num_mcs(BaseGraph::Two), 5);
        assert_eq!(dataset.num_mcs(BaseGraph::One), 0);
        assert!(dataset.curves(BaseGraph::Two, 0).unwrap().is_empty());
        let json = dataset.to_json().unwrap();
        let parsed = CurveDataset::from_json(&json).unwrap();
        assert_eq!(parsed, dataset);
        assert_eq!(parsed.curve(BaseGraph::Two, 4, 4000).unwrap(), (3840, &curve));
    }

    #[test]
    fn invalid_curves() {
        assert!(matches!(
            BlerCurve::new(vec![], vec![]),
            Err(Error::EmptyCurve)
        ));
        assert!(matches!(
            BlerCurve::new(vec![1.0, 2.0], vec![1.0]),
            Err(Error::LengthMismatch { sinr: 2, bler: 1 })
        ));
        assert!(matches!(
            BlerCurve::new(vec![2.0, 1.0], vec![1.0, 0.0]),
            Err(Error::UnsortedSinr)
        ));
        assert!(matches!(
            BlerCurve::new(vec![1.0, 2.0], vec![1.5, 0.0]),
            Err(Error::BlerOutOfRange(_))
        ));
        assert!(matches!(
            BlerCurve::new(vec![1.0, 2.0], vec![f64::NAN, 0.0]),
            Err(Error::BlerOutOfRange(_))
        ));
        assert!(matches!(
            BlerCurve::new(vec![1.0, f64::NAN, 3.0], vec![1.0, 0.5, 0.0]),
            Err(Error::NonFiniteSinr(_))
        ));
        assert!(matches!(
            BlerCurve::new(vec![f64::NEG_INFINITY, 1.0], vec![1.0, 0.0]),
            Err(Error::NonFiniteSinr(_))
        ));
        assert!(matches!(
            BlerCurve::new(vec![1.0, 2.0, 3.0], vec![1.0, 0.2, 0.4]),
            Err(Error::IncreasingBler)
        ));
        // flat segments are allowed
        assert!(BlerCurve::new(vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 0.0]).is_ok());
        let json = r#"{"bg1":[{"100":{"sinr_db":[2.0,1.0],"bler":[1.0,0.0]}}],"bg2":[]}"#;
        assert!(matches!(
            CurveDataset::from_json(json),
            Err(Error::Json(_))
        ));
    }
}
