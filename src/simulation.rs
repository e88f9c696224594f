//! Simulation.
//!
//! This module contains utilities to simulate a HARQ link over a Rayleigh
//! fading channel using the EESM error model.

pub mod channel;
pub mod harq;
