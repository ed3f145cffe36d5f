//! Molecular assembly engine.
//!
//! Takes a user-selected set of atoms, matches them against the recipe
//! catalog and positions each resulting molecule with a fresh layout. The
//! bodies then enter the assembling state and are released by the integrator
//! once they settle.

use crate::core::body::{AssemblyState, BodyId};
use crate::core::bonds;
use crate::core::context::{MoleculeLabel, TickContext};
use crate::core::layout;
use crate::core::nuclear::random_direction;
use crate::core::recipes::Recipe;
use crate::core::vector::{self, Vec3, ZERO};
use crate::core::world::World;
use crate::error::{Error, Result};
use rand::Rng;

/// One molecule built by an assembly call.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeInstance {
    pub name: String,
    pub formula: String,
    /// Atom ids in recipe slot order.
    pub atoms: Vec<BodyId>,
    /// Placement center of this instance.
    pub center: Vec3,
}

/// Outcome of [`assemble`].
///
/// Fields:
/// - `molecules`: every recipe instance built, in the order they were matched
/// - `leftovers`: selected bodies that did not fit any recipe
/// - `center`: mass-weighted centroid of the selection
/// - `ejection`: velocity the group carries away once released
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub molecules: Vec<MoleculeInstance>,
    pub leftovers: Vec<BodyId>,
    pub center: Vec3,
    pub ejection: Vec3,
}

/// Assemble the selected bodies into catalog molecules.
///
/// An exact composition match forces that recipe (hidden recipes included).
/// Otherwise visible recipes are tried greedily by descending score, each as
/// many times as the remaining atoms allow. `ejection` defaults to the
/// selection's mass-weighted velocity so momentum is conserved.
///
/// Errors:
/// - `Error::InvalidParam` if `ids` is empty or `ejection` is not finite
/// - `Error::UnknownBody` if any id is not in the world
pub fn assemble(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    ids: &[BodyId],
    ejection: Option<Vec3>,
) -> Result<AssemblyReport> {
    if ids.is_empty() {
        return Err(Error::InvalidParam("nothing selected to assemble".into()));
    }
    let mut selection: Vec<BodyId> = Vec::with_capacity(ids.len());
    for &id in ids {
        if !world.contains(id) {
            return Err(Error::UnknownBody(id));
        }
        if !selection.contains(&id) {
            selection.push(id);
        }
    }
    if let Some(v) = ejection {
        if !vector::is_finite(&v) {
            return Err(Error::InvalidParam("ejection velocity must be finite".into()));
        }
    }

    let center = world.centroid(&selection);
    let ejection = ejection.unwrap_or_else(|| {
        vector::weighted_mean(
            selection
                .iter()
                .filter_map(|&id| world.get(id))
                .map(|b| (b.mass, b.vel)),
        )
    });

    let outside = detach(world, ctx, &selection);

    let atoms: Vec<(BodyId, u32)> = selection
        .iter()
        .filter_map(|&id| world.get(id))
        .filter(|b| !b.is_photon())
        .filter_map(|b| b.atom().map(|a| (b.id, a.z)))
        .collect();
    let (plans, mut leftovers) = partition(ctx, &atoms);
    leftovers.extend(
        selection
            .iter()
            .copied()
            .filter(|id| !atoms.iter().any(|(a, _)| a == id)),
    );

    let spots = instance_centers(center, plans.len(), ctx.config.assembly.instance_spacing);
    let mut molecules = Vec::with_capacity(plans.len());
    for ((recipe, slots), spot) in plans.into_iter().zip(spots) {
        place_instance(world, ctx, recipe, &slots, spot, ejection);
        molecules.push(MoleculeInstance {
            name: recipe.name.clone(),
            formula: recipe.formula.clone(),
            atoms: slots,
            center: spot,
        });
    }

    let placed: Vec<BodyId> = molecules.iter().flat_map(|m| m.atoms.iter().copied()).collect();
    scatter_leftovers(world, ctx, &leftovers, &placed, center, ejection);
    for id in outside {
        bonds::redistribute_charge(world, id, ctx.sink);
    }
    ctx.burst(center, 1.5, "Assembly");
    log::debug!(
        "assembled {} molecule(s), {} leftover(s)",
        molecules.len(),
        leftovers.len()
    );

    Ok(AssemblyReport {
        molecules,
        leftovers,
        center,
        ejection,
    })
}

// ============ Internal helpers ============

/// Clear bonds, forces and labels on the selection.
///
/// Returns former partners outside the selection, whose charge must be
/// rebalanced afterwards.
fn detach(world: &mut World, ctx: &mut TickContext<'_>, selection: &[BodyId]) -> Vec<BodyId> {
    let mut outside: Vec<BodyId> = Vec::new();
    for &id in selection {
        ctx.cancel_labels(id);
        for p in world.clear_bonds(id) {
            ctx.cancel_labels(p);
            if !selection.contains(&p) && !outside.contains(&p) {
                outside.push(p);
            }
        }
        if let Some(b) = world.get_mut(id) {
            b.force = ZERO;
        }
    }
    outside
}

/// Split atoms into recipe instances (slot-ordered ids) and leftovers.
fn partition(
    ctx: &TickContext<'_>,
    atoms: &[(BodyId, u32)],
) -> (Vec<(&'static Recipe, Vec<BodyId>)>, Vec<BodyId>) {
    let catalog = ctx.tables.recipes;
    let mut composition: Vec<u32> = atoms.iter().map(|&(_, z)| z).collect();
    composition.sort_unstable();

    if let Some((_, recipe)) = catalog.exact_match(&composition) {
        let mut pool = atoms.to_vec();
        if let Some(slots) = allocate(recipe, &mut pool) {
            return (vec![(recipe, slots)], pool.into_iter().map(|(id, _)| id).collect());
        }
    }

    let mut pool = atoms.to_vec();
    let mut plans = Vec::new();
    for (_, recipe) in catalog.ranked() {
        while let Some(slots) = allocate(recipe, &mut pool) {
            plans.push((recipe, slots));
        }
    }
    (plans, pool.into_iter().map(|(id, _)| id).collect())
}

/// Take one atom per recipe slot out of `pool`, or leave it untouched.
fn allocate(recipe: &Recipe, pool: &mut Vec<(BodyId, u32)>) -> Option<Vec<BodyId>> {
    let mut trial = pool.clone();
    let mut slots = Vec::with_capacity(recipe.atoms.len());
    for &z in &recipe.atoms {
        let k = trial.iter().position(|&(_, tz)| tz == z)?;
        slots.push(trial.remove(k).0);
    }
    *pool = trial;
    Some(slots)
}

/// Centers for `count` instances: the selection center for one, a ring
/// around it otherwise.
fn instance_centers(center: Vec3, count: usize, spacing: f64) -> Vec<Vec3> {
    if count <= 1 {
        return vec![center; count];
    }
    let ring = (spacing * count as f64 / std::f64::consts::TAU).max(spacing * 0.5);
    (0..count)
        .map(|k| {
            let angle = k as f64 * std::f64::consts::TAU / count as f64;
            vector::add(&center, &[angle.cos() * ring, angle.sin() * ring, 0.0])
        })
        .collect()
}

fn place_instance(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    recipe: &Recipe,
    slots: &[BodyId],
    spot: Vec3,
    ejection: Vec3,
) {
    let radii: Vec<f64> = slots
        .iter()
        .map(|&id| world.get(id).map_or(0.0, |b| b.radius))
        .collect();
    let offsets = layout::layout(&radii, &recipe.bonds, &ctx.config.assembly);
    let countdown = ctx.config.assembly.release_timeout;

    for (&id, offset) in slots.iter().zip(&offsets) {
        if let Some(b) = world.get_mut(id) {
            b.pos = vector::add(&spot, offset);
            b.vel = ZERO;
            b.force = ZERO;
            b.assembly = AssemblyState {
                active: true,
                countdown,
                ejection,
            };
        }
    }
    for bond in &recipe.bonds {
        for _ in 0..bond.order {
            world.add_bond(slots[bond.a], slots[bond.b]);
        }
    }
    if let Some(&first) = slots.first() {
        bonds::redistribute_charge(world, first, ctx.sink);
    }

    let mut key = slots.to_vec();
    key.sort();
    ctx.labels.push(MoleculeLabel {
        key,
        name: recipe.name.clone(),
        formula: recipe.formula.clone(),
        created_at: ctx.now,
        expires_at: ctx.now + ctx.config.reactions.label_lifetime,
    });
}

/// Leftovers stay where they were, nudged by up to `leftover_jitter`, and are
/// pushed out past the placed instances when they would land among them.
fn scatter_leftovers(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    leftovers: &[BodyId],
    placed: &[BodyId],
    center: Vec3,
    ejection: Vec3,
) {
    let cfg = &ctx.config.assembly;
    let (jitter, spread) = (cfg.leftover_jitter, cfg.leftover_spread);
    let speed = vector::norm(&ejection);
    let reach = placed
        .iter()
        .filter_map(|&id| world.get(id))
        .map(|b| vector::distance(&center, &b.pos) + b.radius)
        .fold(0.0, f64::max);
    for &id in leftovers {
        let nudge = random_direction(ctx.rng);
        let amount: f64 = jitter * ctx.rng.random::<f64>();
        let scale: f64 = 1.0 + spread * ctx.rng.random_range(-1.0..=1.0);
        let wobble = random_direction(ctx.rng);
        if let Some(b) = world.get_mut(id) {
            let mut pos = vector::add(&b.pos, &vector::scale(&nudge, amount));
            let outward = vector::sub(&pos, &center);
            let clearance = reach + b.radius;
            if reach > 0.0 && vector::norm(&outward) < clearance {
                let dir = vector::normalized(&outward).unwrap_or(nudge);
                pos = vector::add(&center, &vector::scale(&dir, clearance + jitter));
            }
            b.pos = pos;
            let mut v = vector::scale(&ejection, scale);
            vector::add_scaled(&mut v, &wobble, speed * spread);
            b.vel = v;
        }
        bonds::redistribute_charge(world, id, ctx.sink);
    }
}
