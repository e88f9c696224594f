//! Mapping of effective SINR to code block error rate.
//!
//! The lookup uses the curve of the [`CurveDataset`] for the closest code
//! block size not exceeding the requested one, and takes the BLER of the
//! largest SINR sample not exceeding the requested SINR. No interpolation
//! between samples is done. Below the first sample the BLER is 1, and above
//! the last sample it is 0.

use crate::{
    dataset::{BlerCurve, CurveDataset},
    eesm::to_db,
    segmentation::BaseGraph,
};
use tracing::trace;

/// Returns the BLER of a curve at a given SINR in dB.
pub fn curve_bler(curve: &BlerCurve, sinr_db: f64) -> f64 {
    let sinrs = curve.sinr_db();
    if sinr_db < sinrs[0] {
        1.0
    } else if sinr_db > sinrs[sinrs.len() - 1] {
        0.0
    } else {
        // number of samples <= sinr_db, which is at least one here
        let idx = sinrs.partition_point(|&s| s <= sinr_db);
        curve.bler()[idx.saturating_sub(1)]
    }
}

/// Maps an effective SINR into a code block error rate.
///
/// The effective SINR `sinr_eff` is given in linear units, and the code
/// block size `cb_size` in bits. If the dataset does not contain any curve for
/// the base graph and MCS, the [placeholder curve](BlerCurve::placeholder) is
/// used.
///
/// # Panics
///
/// Panics if `cb_size` is zero.
pub fn cb_bler(
    dataset: &CurveDataset,
    base_graph: BaseGraph,
    mcs: u8,
    cb_size: u32,
    sinr_eff: f64,
) -> f64 {
    assert!(cb_size > 0, "the code block size cannot be 0");
    let sinr_db = to_db(sinr_eff);
    let placeholder;
    let (curve_size, curve) = match dataset.curve(base_graph, mcs, cb_size) {
        Some(c) => c,
        None => {
            placeholder = BlerCurve::placeholder();
            (0, &placeholder)
        }
    };
    let bler = curve_bler(curve, sinr_db);
    trace!(
        %base_graph,
        mcs,
        cb_size,
        curve_size,
        sinr_db,
        bler,
        "SINR to BLER mapping"
    );
    bler
}
