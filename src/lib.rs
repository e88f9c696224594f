//! # NR L2SM
//!
//! `nr_l2sm` is a link-to-system mapping (L2SM) model for 5G NR transport
//! blocks encoded with the LDPC code. Given the SINR of each resource block
//! used by a transmission, the MCS, the transport block size and the outcomes
//! of previous HARQ attempts, it predicts the transport block error rate
//! without simulating the physical layer. It uses the Exponential Effective
//! SINR Mapping (EESM) and SINR-BLER curves obtained by link-level
//! simulation.
//!
//! The main entry point is the [`error_model::ErrorModel`]. The crate also
//! contains [adaptive modulation and coding](amc), a [HARQ link
//! simulation](simulation) and a C API.
//!
//! It can be used as a Rust library or as a CLI tool that allows access from
//! the command line to the error model and the simulation. See [`cli`] for
//! documentation about the usage of the CLI tool.

#![warn(missing_docs)]

pub mod amc;
pub mod cli;
pub mod dataset;
pub mod eesm;
pub mod error_model;
pub mod harq;
pub mod lookup;
pub mod mcs;
pub mod rand;
pub mod segmentation;
pub mod simulation;

mod c_api;
