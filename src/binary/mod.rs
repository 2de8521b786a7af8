//! # Relativistic binary parameter derivation
//!
//! The DDGR parameterization of a binary pulsar assumes general relativity is
//! correct and derives every post-Keplerian quantity from the component masses
//! and the Keplerian orbit, instead of fitting them independently.

pub mod ddgr;

pub use ddgr::{solve_relativistic_kepler, BinaryParam, DdgrModel, OrbitalParameters};
