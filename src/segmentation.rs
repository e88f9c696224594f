//! LDPC base graph selection and code block segmentation.
//!
//! A transport block (TB) is encoded by the 5G NR LDPC code in one or several
//! code blocks (CBs). The base graph of the LDPC code is chosen from the TB
//! size and the code rate, and the CB size is a multiple of a lifting size
//! taken from a fixed set of admissible values.
//!
//! ## References
//! \[1\] [3GPP TS 38.212 Multiplexing and channel coding](https://portal.3gpp.org/desktopmodules/Specifications/SpecificationDetails.aspx?specificationId=3214),
//! Sections 5.2.2 and 7.2.2.

use clap::ValueEnum;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifting sizes of the 5G NR LDPC codes, in ascending order.
///
/// The same set is used by both base graphs.
pub const LIFTING_SIZES: [u32; 51] = [
    2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 18, 20, 22, 24, 26, 28, 30, 32, 36, 40, 44,
    48, 52, 56, 60, 64, 72, 80, 88, 96, 104, 112, 120, 128, 144, 160, 176, 192, 208, 224, 240, 256,
    288, 320, 352, 384,
];

/// Number of CRC bits attached to each code block when a transport block is
/// segmented in several code blocks.
pub const CB_CRC_LEN: u32 = 24;

/// LDPC base graph.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Sequence, ValueEnum, Serialize, Deserialize,
)]
pub enum BaseGraph {
    /// Base graph 1, used for large blocks with high code rate.
    #[value(name = "1")]
    One,
    /// Base graph 2, used for small blocks or low code rate.
    #[value(name = "2")]
    Two,
}

impl BaseGraph {
    /// Selects the base graph for a transport block.
    ///
    /// The parameters are the TB size `tb_size_bits` in bits and the
    /// effective code rate of the MCS.
    pub fn select(tb_size_bits: u32, ecr: f64) -> BaseGraph {
        if tb_size_bits <= 292 || ecr <= 0.25 || (tb_size_bits <= 3824 && ecr <= 0.67) {
            BaseGraph::Two
        } else {
            BaseGraph::One
        }
    }

    /// Returns the maximum code block size (including CRC) in bits.
    pub fn max_cb_size(&self) -> u32 {
        match self {
            BaseGraph::One => 8448,
            BaseGraph::Two => 3840,
        }
    }

    /// Returns the number of systematic columns of the base graph.
    ///
    /// The code block size is this number times the lifting size.
    pub fn kb(&self) -> u32 {
        match self {
            BaseGraph::One => 22,
            BaseGraph::Two => 10,
        }
    }

    /// Returns the largest code block size that the base graph supports,
    /// which is obtained with the largest lifting size.
    pub fn max_lifted_cb_size(&self) -> u32 {
        LIFTING_SIZES[LIFTING_SIZES.len() - 1] * self.kb()
    }
}

impl std::fmt::Display for BaseGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                BaseGraph::One => "BG1",
                BaseGraph::Two => "BG2",
            }
        )
    }
}

/// Returns the smallest lifting size that is greater or equal than `min`.
///
/// The largest lifting size is returned if `min` exceeds all of them.
pub fn lifting_size(min: f64) -> u32 {
    let idx = LIFTING_SIZES.partition_point(|&z| f64::from(z) < min);
    LIFTING_SIZES[idx.min(LIFTING_SIZES.len() - 1)]
}

/// Code block segmentation of a transport block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Segmentation {
    /// Base graph.
    pub base_graph: BaseGraph,
    /// Number of code blocks (C).
    pub num_cbs: u32,
    /// Number of CRC bits per code block (L).
    pub crc_len: u32,
    /// Total number of bits including the code block CRCs (B').
    ///
    /// This can exceed the range of `u32` for the largest TB sizes.
    pub total_bits: u64,
    /// Lifting size (Z_c).
    pub lifting_size: u32,
    /// Size of each code block in bits (K).
    pub cb_size: u32,
}

impl Segmentation {
    /// Performs the segmentation of a transport block.
    ///
    /// The parameters are the TB size `tb_size_bits` in bits and the effective
    /// code rate of the MCS.
    ///
    /// # Panics
    ///
    /// Panics if `tb_size_bits` is zero.
    pub fn new(tb_size_bits: u32, ecr: f64) -> Segmentation {
        assert!(tb_size_bits > 0, "the transport block size cannot be 0");
        let base_graph = BaseGraph::select(tb_size_bits, ecr);
        let kcb = base_graph.max_cb_size();
        let (crc_len, num_cbs, total_bits) = if tb_size_bits <= kcb {
            (0, 1, u64::from(tb_size_bits))
        } else {
            let num_cbs = tb_size_bits.div_ceil(kcb - CB_CRC_LEN);
            let total_bits = u64::from(tb_size_bits) + u64::from(num_cbs) * u64::from(CB_CRC_LEN);
            (CB_CRC_LEN, num_cbs, total_bits)
        };
        let bits_per_cb = total_bits / u64::from(num_cbs);
        let lifting_size = lifting_size(bits_per_cb as f64 / f64::from(base_graph.kb()));
        let cb_size = lifting_size * base_graph.kb();
        debug!(
            tb_size_bits,
            total_bits,
            num_cbs,
            cb_size,
            %base_graph,
            "code block segmentation"
        );
        Segmentation {
            base_graph,
            num_cbs,
            crc_len,
            total_bits,
            lifting_size,
            cb_size,
        }
    }
}
