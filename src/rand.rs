//! # Reproducible random functions
//!
//! This module uses the [`ChaCha8Rng`] RNG from the [rand_chacha] crate
//! to achieve reproducible random number generation in the HARQ link
//! simulation.
//!
//! # Examples
//! ```
//! # use nr_l2sm::rand::Rng;
//! # use nr_l2sm::rand::*;
//! let seed = 42;
//! let mut rng = Rng::seed_from_u64(seed);
//! assert_eq!(rng.next_u64(), 12578764544318200737);
//! ```
use rand_chacha::ChaCha8Rng;
pub use rand_chacha::rand_core::SeedableRng;
pub use rand_core::RngCore;

/// The RNG used throughout this crate for the simulation of fading and
/// decoding events.
pub type Rng = ChaCha8Rng;
