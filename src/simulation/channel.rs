//! Channel simulation.
//!
//! This module contains the simulation of a block Rayleigh fading channel in
//! terms of the SINR of each RB.

use rand::Rng;
use rand_distr::{Distribution, Exp1};

/// Rayleigh fading channel simulation.
///
/// The power gain of each RB follows an exponential distribution with unit
/// mean and is independent of the gains of other RBs and of previous
/// transmissions. The SINR of an RB is the mean SINR times its power gain.
#[derive(Debug, Clone)]
pub struct RayleighChannel {
    mean_sinr: f64,
}

impl RayleighChannel {
    /// Creates a new Rayleigh channel.
    ///
    /// The mean SINR is given in linear units.
    ///
    /// # Panics
    ///
    /// This function panics if `mean_sinr` is not a non-negative finite
    /// number.
    pub fn new(mean_sinr: f64) -> RayleighChannel {
        assert!(mean_sinr >= 0.0 && mean_sinr.is_finite());
        RayleighChannel { mean_sinr }
    }

    /// Returns the mean SINR in linear units.
    pub fn mean_sinr(&self) -> f64 {
        self.mean_sinr
    }

    /// Draws a new SINR for each RB.
    ///
    /// The linear SINRs are written to the slice `sinr`. An [Rng] is used as
    /// source of randomness.
    pub fn fade<R: Rng>(&self, rng: &mut R, sinr: &mut [f64]) {
        for x in sinr.iter_mut() {
            let gain: f64 = Exp1.sample(rng);
            *x = self.mean_sinr * gain;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rand::{Rng, SeedableRng};

    #[test]
    fn mean_sinr() {
        let channel = RayleighChannel::new(4.0);
        let mut rng = Rng::seed_from_u64(0);
        let mut sinr = vec![0.0; 100_000];
        channel.fade(&mut rng, &mut sinr);
        assert!(sinr.iter().all(|&x| x >= 0.0));
        let mean = sinr.iter().sum::<f64>() / sinr.len() as f64;
        assert!((mean - 4.0).abs() < 0.1);
    }

    #[test]
    fn zero_mean_sinr() {
        let channel = RayleighChannel::new(0.0);
        let mut rng = rand::thread_rng();
        let mut sinr = vec![1.0; 1024];
        channel.fade(&mut rng, &mut sinr);
        assert!(sinr.iter().all(|&x| x == 0.0));
    }

    #[test]
    #[should_panic]
    fn negative_mean_sinr() {
        let _channel = RayleighChannel::new(-3.5);
    }
}
