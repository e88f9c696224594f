//! Exponential Effective SINR Mapping (EESM).
//!
//! The EESM method compresses the SINRs seen by the resource blocks (RBs)
//! of a transmission into a single effective SINR. This effective SINR is
//! the SINR that an AWGN channel would need to give the same block error
//! rate. For a set of linear SINRs `γ_i` and a calibration factor `β` that
//! depends on the MCS,
//!
//! ```text
//! γ_eff = -β ln( (1/N) Σ exp(-γ_i / β) )
//! ```
//!
//! The sum is evaluated relative to the smallest SINR, so that the
//! exponentials do not underflow for SINRs much larger than `β`.
//!
//! # Examples
//! ```
//! # use nr_l2sm::eesm::effective_sinr;
//! let sinr = [10.0, 20.0, 30.0];
//! let eff = effective_sinr(&sinr, &[0, 1, 2], 5.0);
//! assert!(eff > 10.0 && eff < 20.0);
//! ```

use tracing::trace;

/// Computes the effective SINR of a collection of linear SINR values.
///
/// # Panics
///
/// Panics if `sinrs` yields no elements.
pub fn eesm<I>(sinrs: I, beta: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let sinrs = sinrs.into_iter().collect::<Vec<f64>>();
    assert!(!sinrs.is_empty(), "the number of allocated RBs cannot be 0");
    let count = sinrs.len();
    let min = sinrs.iter().copied().fold(f64::INFINITY, f64::min);
    // the term of the smallest SINR is 1, so the mean is at least 1 / count
    let sum = sinrs
        .iter()
        .map(|&sinr| (-(sinr - min) / beta).exp())
        .sum::<f64>();
    let sinr_eff = min - beta * (sum / count as f64).ln();
    trace!(num_rbs = count, beta, sinr_eff, "EESM");
    sinr_eff
}

/// Computes the effective SINR of a transmission.
///
/// The linear SINR of every RB in the bandwidth is given in `sinr`, and the
/// indices of the RBs used by the transmission are listed in `map`. Only the
/// SINRs of those RBs are taken into account.
///
/// # Panics
///
/// Panics if `map` is empty or if it contains an index out of the range of
/// `sinr`.
pub fn effective_sinr(sinr: &[f64], map: &[usize], beta: f64) -> f64 {
    assert!(!map.is_empty(), "the number of allocated RBs cannot be 0");
    eesm(map.iter().map(|&rb| sinr[rb]), beta)
}

/// Converts a linear value to dB.
pub fn to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// Converts a dB value to linear units.
pub fn from_db(db: f64) -> f64 {
    10.0_f64.powf(0.1 * db)
}
