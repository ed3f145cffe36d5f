//! Per-call context handed to every component by the tick driver.

use crate::core::audit::{AuditKind, AuditLog};
use crate::core::body::{Body, BodyId};
use crate::core::config::SimConfig;
use crate::core::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::core::elements::ElementTable;
use crate::core::recipes::{BondEnergyTable, RecipeCatalog};
use crate::core::vector::Vec3;
use crate::error::Result;
use rand::rngs::StdRng;

/// The immutable reference tables.
#[derive(Debug, Clone, Copy)]
pub struct Tables {
    pub elements: &'static ElementTable,
    pub recipes: &'static RecipeCatalog,
    pub energies: &'static BondEnergyTable,
}

impl Tables {
    /// The tables embedded in the crate.
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            elements: ElementTable::global()?,
            recipes: RecipeCatalog::global()?,
            energies: BondEnergyTable::global()?,
        })
    }
}

/// Visual effects for the renderer, drained once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Flash at a reaction site.
    Burst {
        pos: Vec3,
        size: f64,
        reason: &'static str,
    },
    /// Decay marker; alpha decays get a larger one than beta decays.
    Marker { pos: Vec3, size: f64, text: String },
    /// An assembled group finished settling and was released.
    ReleaseCue { pos: Vec3, bodies: Vec<BodyId> },
    /// A species was produced for the first time by pair production.
    Discovery { pos: Vec3, symbol: String },
}

/// Floating molecule name shown over an assembled group.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeLabel {
    /// Sorted ids of the atoms the label belongs to.
    pub key: Vec<BodyId>,
    pub name: String,
    pub formula: String,
    pub created_at: f64,
    pub expires_at: f64,
}

impl MoleculeLabel {
    #[inline]
    pub fn involves(&self, id: BodyId) -> bool {
        self.key.binary_search(&id).is_ok()
    }
}

/// Everything a component may touch besides the world itself.
pub struct TickContext<'a> {
    pub config: &'a SimConfig,
    pub tables: Tables,
    pub audit: &'a mut AuditLog,
    pub rng: &'a mut StdRng,
    pub sink: &'a mut dyn DiagnosticSink,
    pub effects: &'a mut Vec<Effect>,
    pub labels: &'a mut Vec<MoleculeLabel>,
    /// Simulation time at the start of this call.
    pub now: f64,
    /// Duration of the current tick.
    pub dt: f64,
}

impl TickContext<'_> {
    #[inline]
    pub fn elements(&self) -> &'static ElementTable {
        self.tables.elements
    }

    pub fn diagnose(&mut self, kind: DiagnosticKind, body: Option<BodyId>, msg: impl Into<String>) {
        self.sink.report(Diagnostic::new(kind, body, msg));
    }

    pub fn log_create(&mut self, body: &Body, reason: impl Into<String>) {
        let label = body.label(self.tables.elements);
        self.audit
            .record(AuditKind::Create, body.id, label, reason, self.now);
    }

    pub fn log_destroy(&mut self, body: &Body, reason: impl Into<String>) {
        let label = body.label(self.tables.elements);
        self.audit
            .record(AuditKind::Destroy, body.id, label, reason, self.now);
    }

    pub fn burst(&mut self, pos: Vec3, size: f64, reason: &'static str) {
        self.effects.push(Effect::Burst { pos, size, reason });
    }

    /// Drop floating labels that mention `id`.
    pub fn cancel_labels(&mut self, id: BodyId) {
        self.labels.retain(|l| !l.involves(id));
    }
}

/// Owned backing storage for a [`TickContext`] in unit tests.
#[cfg(test)]
pub(crate) struct Harness {
    pub config: SimConfig,
    pub audit: AuditLog,
    pub rng: StdRng,
    pub sink: crate::core::diagnostics::RecordingSink,
    pub effects: Vec<Effect>,
    pub labels: Vec<MoleculeLabel>,
    pub now: f64,
}

#[cfg(test)]
impl Harness {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            config: SimConfig::default(),
            audit: AuditLog::default(),
            rng: StdRng::seed_from_u64(seed),
            sink: crate::core::diagnostics::RecordingSink::new(),
            effects: Vec::new(),
            labels: Vec::new(),
            now: 0.0,
        }
    }

    pub fn ctx(&mut self, dt: f64) -> TickContext<'_> {
        TickContext {
            config: &self.config,
            tables: Tables::embedded().expect("embedded tables"),
            audit: &mut self.audit,
            rng: &mut self.rng,
            sink: &mut self.sink,
            effects: &mut self.effects,
            labels: &mut self.labels,
            now: self.now,
            dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_tables_load() -> Result<()> {
        let tables = Tables::embedded()?;
        let co = tables
            .recipes
            .by_name("Carbon monoxide")
            .expect("carbon monoxide in catalog");
        assert_eq!(co.bonds.len(), 1);
        assert_eq!(co.bonds[0].order, 2);
        Ok(())
    }
}
