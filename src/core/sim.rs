use crate::core::assembly::{self, AssemblyReport};
use crate::core::audit::{AuditKind, AuditLog};
use crate::core::body::{Body, BodyId, Species};
use crate::core::config::SimConfig;
use crate::core::context::{Effect, MoleculeLabel, Tables, TickContext};
use crate::core::diagnostics::{DiagnosticSink, NoopSink};
use crate::core::recipes::Recipe;
use crate::core::vector::Vec3;
use crate::core::world::World;
use crate::core::{bonds, fusion, hadron, integrator, interactions, nuclear};
use crate::error::{Error, Result};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use std::fmt;

/// The tick driver: owns the world and everything a tick needs.
///
/// One tick runs annealing, pairwise interaction resolution, nuclear
/// processing (decay, expiry, hadronization) and integration, in that order.
/// Given the same seed and the same sequence of calls, a run is reproducible.
pub struct Simulation {
    config: SimConfig,
    tables: Tables,
    world: World,
    audit: AuditLog,
    rng: StdRng,
    sink: Box<dyn DiagnosticSink>,
    effects: Vec<Effect>,
    labels: Vec<MoleculeLabel>,
    time_now: f64,
    ticks: u64,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("time", &self.time_now)
            .field("ticks", &self.ticks)
            .field("bodies", &self.world.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Create an empty arena.
    ///
    /// `seed` makes every stochastic draw reproducible; `None` seeds from
    /// entropy. Diagnostics go nowhere until a sink is attached with
    /// [`Simulation::with_sink`].
    ///
    /// Errors:
    /// - `Error::InvalidParam` if the config fails validation
    /// - `Error::ResourceParse` / `Error::InvalidResource` if the embedded tables are malformed
    pub fn new(config: SimConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let tables = Tables::embedded()?;
        let rng: StdRng = match seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };
        Ok(Self {
            config,
            tables,
            world: World::new(),
            audit: AuditLog::default(),
            rng,
            sink: Box::new(NoopSink),
            effects: Vec::new(),
            labels: Vec::new(),
            time_now: 0.0,
            ticks: 0,
        })
    }

    /// Route diagnostics to `sink`.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Returns current simulation time.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tables(&self) -> Tables {
        self.tables
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// All bodies in creation order.
    pub fn bodies(&self) -> &[Body] {
        self.world.bodies()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.world.get(id)
    }

    /// Number of bodies.
    pub fn num_bodies(&self) -> usize {
        self.world.len()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Floating molecule labels still alive.
    pub fn labels(&self) -> &[MoleculeLabel] {
        &self.labels
    }

    /// Take the visual effects queued since the last call.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Positions as a Vec of fixed-size arrays.
    pub fn positions(&self) -> Vec<Vec3> {
        self.world.iter().map(|b| b.pos).collect()
    }

    /// Velocities as a Vec of fixed-size arrays.
    pub fn velocities(&self) -> Vec<Vec3> {
        self.world.iter().map(|b| b.vel).collect()
    }

    /// Total kinetic energy 1/2 sum m |v|^2.
    pub fn kinetic_energy(&self) -> f64 {
        self.world.iter().map(Body::kinetic_energy).sum()
    }

    /// Sum of all body charges.
    pub fn total_charge(&self) -> f64 {
        self.world.iter().map(|b| b.charge).sum()
    }

    /// Run one tick of length `dt`.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `dt` is not finite and positive
    pub fn step(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(Error::InvalidParam("dt must be finite and > 0".into()));
        }
        let (world, mut ctx) = self.split(dt);
        bonds::anneal(world, &mut ctx);
        interactions::resolve_all(world, &mut ctx);
        nuclear::process_decays(world, &mut ctx);
        hadron::hadronize(world, &mut ctx);
        integrator::integrate(world, &mut ctx);

        self.time_now += dt;
        self.ticks += 1;
        let now = self.time_now;
        self.labels.retain(|l| l.expires_at > now);
        log::trace!(
            "tick {} t={:.4} bodies={} ke={:.3}",
            self.ticks,
            self.time_now,
            self.world.len(),
            self.kinetic_energy()
        );
        Ok(())
    }

    /// Advance one rendered frame, split into `config.tick.substeps` ticks.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `frame_dt` is not finite and positive
    pub fn advance_frame(&mut self, frame_dt: f64) -> Result<()> {
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return Err(Error::InvalidParam("frame_dt must be finite and > 0".into()));
        }
        let substeps = self.config.tick.substeps.max(1);
        let dt = frame_dt / substeps as f64;
        for _ in 0..substeps {
            self.step(dt)?;
        }
        Ok(())
    }

    /// Place a new body in the arena, audited as `"Injected"`.
    ///
    /// Errors:
    /// - `Error::UnknownElement` for an atomic number outside the table
    /// - `Error::InvalidParam` for an untabulated isotope or non-finite position/velocity
    pub fn inject(&mut self, species: Species, pos: Vec3, vel: Vec3) -> Result<BodyId> {
        let id = self.world.allocate_id();
        let body = Body::spawn(id, species, pos, vel, self.tables.elements, self.time_now)?;
        let label = body.label(self.tables.elements);
        self.audit
            .record(AuditKind::Create, id, label, "Injected", self.time_now);
        Ok(self.world.insert(body))
    }

    /// Overwrite a body's velocity.
    ///
    /// Errors:
    /// - `Error::UnknownBody` if `id` is not in the world
    /// - `Error::InvalidParam` if `vel` has a non-finite component
    pub fn set_velocity(&mut self, id: BodyId, vel: Vec3) -> Result<()> {
        if !vel.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidParam("velocity values must be finite".into()));
        }
        let body = self.world.get_mut(id).ok_or(Error::UnknownBody(id))?;
        body.vel = vel;
        Ok(())
    }

    /// Assemble the selected bodies into catalog molecules.
    ///
    /// `ejection` is the velocity given to each molecule once it settles;
    /// `None` keeps the selection's momentum.
    ///
    /// Errors:
    /// - `Error::InvalidParam` for an empty selection or non-finite ejection
    /// - `Error::UnknownBody` if any id is not in the world
    pub fn assemble(&mut self, ids: &[BodyId], ejection: Option<Vec3>) -> Result<AssemblyReport> {
        let (world, mut ctx) = self.split(0.0);
        assembly::assemble(world, &mut ctx, ids, ejection)
    }

    /// Turn a photon of `energy` (MeV) at `pos` into a particle pair.
    ///
    /// `on_discover` receives the symbol of each produced species. Returns
    /// the created ids, empty if no pair threshold matches.
    pub fn pair_production(
        &mut self,
        pos: Vec3,
        energy: f64,
        mut on_discover: impl FnMut(&str),
    ) -> Vec<BodyId> {
        let (world, mut ctx) = self.split(0.0);
        hadron::pair_production(world, &mut ctx, pos, energy, &mut on_discover)
    }

    /// Fuse the selected nuclei as far up the fusion ladder as they go.
    ///
    /// Errors:
    /// - `Error::UnknownBody` if any id is not in the world
    pub fn fuse(&mut self, ids: &[BodyId]) -> Result<Vec<BodyId>> {
        let (world, mut ctx) = self.split(0.0);
        fusion::fuse(world, &mut ctx, ids)
    }

    /// Every body reachable from `id` through bonds, `id` included.
    ///
    /// Errors:
    /// - `Error::UnknownBody` if `id` is not in the world
    pub fn connected_group(&self, id: BodyId) -> Result<Vec<BodyId>> {
        if !self.world.contains(id) {
            return Err(Error::UnknownBody(id));
        }
        Ok(self.world.connected_group(id))
    }

    /// The catalog molecule the bonded group around `id` currently forms.
    pub fn identify(&self, id: BodyId) -> Option<&'static Recipe> {
        let group = self.connected_group(id).ok()?;
        let mut composition = Vec::with_capacity(group.len());
        let mut adjacency = 0;
        for gid in &group {
            let b = self.world.get(*gid)?;
            composition.push(b.atomic_number()?);
            adjacency += b.bonds.len();
        }
        composition.sort_unstable();
        self.tables.recipes.identify(&composition, adjacency / 2)
    }

    // ============ Internal helpers ============

    /// Borrow the world and a context over the remaining fields.
    fn split(&mut self, dt: f64) -> (&mut World, TickContext<'_>) {
        let ctx = TickContext {
            config: &self.config,
            tables: self.tables,
            audit: &mut self.audit,
            rng: &mut self.rng,
            sink: self.sink.as_mut(),
            effects: &mut self.effects,
            labels: &mut self.labels,
            now: self.time_now,
            dt,
        };
        (&mut self.world, ctx)
    }
}
