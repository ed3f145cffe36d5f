//! Simulation core for a particle and chemistry sandbox.
//!
//! Bodies (quarks, leptons, nucleons, atoms and photons) share one arena. Each
//! tick resolves pairwise forces, collisions and contact reactions, keeps the
//! covalent bond graph chemically valid, runs stochastic nuclear decay and
//! integrates motion. Loose atoms can be assembled into catalog molecules on
//! request. Runs are deterministic for a given seed.
//!
//! Enable the `python` feature for the `ParticleSandbox` bindings.

pub mod core;
pub mod error;

#[cfg(feature = "python")]
mod python;

pub use crate::core::Simulation;
pub use crate::error::{Error, Result};
