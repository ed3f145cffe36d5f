#![allow(missing_docs)] // Doc comments live on the public items in each submodule

//! Simulation core for the particle and chemistry sandbox.
//!
//! Components are plain functions over a [`World`] and a [`TickContext`];
//! [`Simulation`] owns both and runs them in tick order: bond annealing,
//! pairwise interactions, nuclear processing, integration.

pub mod assembly;
pub mod audit;
pub mod body;
pub mod bonds;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod elements;
pub mod fusion;
pub mod hadron;
pub mod integrator;
pub mod interactions;
pub mod layout;
pub mod lifecycle;
pub mod nuclear;
pub mod reactions;
pub mod recipes;
pub mod sim;
pub mod springs;
pub mod vector;
pub mod world;

pub use assembly::{AssemblyReport, MoleculeInstance};
pub use audit::{AuditEvent, AuditKind, AuditLog};
pub use body::{Body, BodyId, BodyKind, Species};
pub use config::SimConfig;
pub use context::{Effect, MoleculeLabel, Tables, TickContext};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, LogSink, NoopSink, RecordingSink};
pub use sim::Simulation;
pub use vector::Vec3;
pub use world::World;
