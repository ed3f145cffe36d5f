//! Fusion ladder applied to an explicitly selected group of nuclei.

use crate::core::body::{Body, BodyId, Species};
use crate::core::context::TickContext;
use crate::core::diagnostics::DiagnosticKind;
use crate::core::elements::ElementTable;
use crate::core::lifecycle;
use crate::core::nuclear::random_direction;
use crate::core::vector::{self, Vec3};
use crate::core::world::World;
use crate::error::{Error, Result};

/// One rung of the ladder: inputs and output as `(Z, A)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionStep {
    pub inputs: &'static [(u32, u32)],
    pub output: (u32, u32),
    /// Protons released alongside the output.
    pub released_protons: u32,
}

const fn step(inputs: &'static [(u32, u32)], output: (u32, u32)) -> FusionStep {
    FusionStep {
        inputs,
        output,
        released_protons: 0,
    }
}

/// Tried in order; the first rung whose inputs are all present wins.
pub const FUSION_LADDER: [FusionStep; 11] = [
    step(&[(1, 1), (1, 1)], (1, 2)),
    step(&[(1, 2), (1, 1)], (2, 3)),
    FusionStep {
        inputs: &[(2, 3), (2, 3)],
        output: (2, 4),
        released_protons: 2,
    },
    step(&[(2, 4), (2, 4), (2, 4)], (6, 12)),
    step(&[(6, 12), (2, 4)], (8, 16)),
    step(&[(8, 16), (2, 4)], (10, 20)),
    step(&[(10, 20), (2, 4)], (12, 24)),
    step(&[(12, 24), (2, 4)], (14, 28)),
    step(&[(6, 12), (6, 12)], (12, 24)),
    step(&[(8, 16), (8, 16)], (16, 32)),
    step(&[(14, 28), (14, 28)], (26, 56)),
];

/// Fuse the selected bodies as far up the ladder as they go.
///
/// Products rejoin the pool, so a handful of protons can climb several rungs
/// in one call. Returns the surviving products.
///
/// Errors:
/// - `Error::UnknownBody` if any id is not in the world
pub fn fuse(world: &mut World, ctx: &mut TickContext<'_>, ids: &[BodyId]) -> Result<Vec<BodyId>> {
    for &id in ids {
        if !world.contains(id) {
            return Err(Error::UnknownBody(id));
        }
    }
    let elements = ctx.elements();
    let tolerance = ctx.config.nuclear.fusion_mass_tolerance;
    let mut pool: Vec<BodyId> = ids.to_vec();
    pool.sort();
    pool.dedup();
    let mut products: Vec<BodyId> = Vec::new();

    'ladder: loop {
        for rung in &FUSION_LADDER {
            let Some(chosen) = match_inputs(world, elements, &pool, rung.inputs, tolerance) else {
                continue;
            };
            let Some(out) = apply_step(world, ctx, &chosen, rung) else {
                break 'ladder;
            };
            pool.retain(|id| !chosen.contains(id));
            products.retain(|id| !chosen.contains(id));
            pool.extend_from_slice(&out);
            products.push(out[0]);
            continue 'ladder;
        }
        break;
    }
    Ok(products)
}

// ============ Internal helpers ============

/// Greedily pick distinct pool members matching each input by atomic number
/// and mass.
fn match_inputs(
    world: &World,
    elements: &ElementTable,
    pool: &[BodyId],
    inputs: &[(u32, u32)],
    tolerance: f64,
) -> Option<Vec<BodyId>> {
    let mut chosen: Vec<BodyId> = Vec::with_capacity(inputs.len());
    for &(z, a) in inputs {
        let target = elements.isotope(z, a)?.mass;
        let pick = pool
            .iter()
            .filter(|id| !chosen.contains(*id))
            .filter_map(|&id| world.get(id))
            .filter(|b| b.atomic_number() == Some(z))
            .map(|b| ((b.mass - target).abs(), b.id))
            .filter(|(diff, _)| *diff <= tolerance)
            .min_by(|x, y| x.0.total_cmp(&y.0))
            .map(|(_, id)| id)?;
        chosen.push(pick);
    }
    Some(chosen)
}

/// Replace `chosen` with the rung's output (plus released protons).
///
/// Returns the new ids with the main product first.
fn apply_step(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    chosen: &[BodyId],
    rung: &FusionStep,
) -> Option<Vec<BodyId>> {
    let (oz, oa) = rung.output;
    let members: Vec<(f64, Vec3, Vec3, f64)> = chosen
        .iter()
        .filter_map(|&id| world.get(id).map(|b| (b.mass, b.pos, b.vel, b.charge)))
        .collect();
    let center = vector::weighted_mean(members.iter().map(|m| (m.0, m.1)));
    let drift = vector::weighted_mean(members.iter().map(|m| (m.0, m.2)));
    let charge: f64 = members.iter().map(|m| m.3).sum();
    let charge = charge - rung.released_protons as f64;

    let id = world.allocate_id();
    let species = Species::Isotope { z: oz, a: oa };
    let mut product = match Body::spawn(id, species, center, drift, ctx.elements(), ctx.now) {
        Ok(b) => b,
        Err(e) => {
            ctx.diagnose(
                DiagnosticKind::MissingData,
                None,
                format!("fusion product Z={oz} A={oa} unavailable: {e}"),
            );
            return None;
        }
    };
    product.charge = charge.round().clamp(-(oz as f64), oz as f64);
    product.mark_reacted(ctx.now, ctx.config.reactions.reaction_cooldown);

    for &m in chosen {
        lifecycle::destroy(world, ctx, m, "Fusion");
    }
    let mut out = vec![lifecycle::insert(world, ctx, product, "Fusion")];

    let kick = ctx.config.reactions.separation_impulse;
    for _ in 0..rung.released_protons {
        let dir = random_direction(ctx.rng);
        let pos = vector::add(&center, &vector::scale(&dir, 60.0));
        let vel = vector::add(&drift, &vector::scale(&dir, kick));
        if let Some(p) = lifecycle::spawn(world, ctx, Species::Proton, pos, vel, "Fusion") {
            out.push(p);
        }
    }
    ctx.burst(center, 2.0, "Fusion");
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditKind;
    use crate::core::context::Harness;
    use crate::core::vector::ZERO;

    fn spawn(world: &mut World, species: Species, x: f64) -> Result<BodyId> {
        let id = world.allocate_id();
        let body = Body::spawn(id, species, [x, 0.0, 0.0], ZERO, ElementTable::global()?, 0.0)?;
        Ok(world.insert(body))
    }

    #[test]
    fn every_rung_resolves_against_the_table() -> Result<()> {
        let elements = ElementTable::global()?;
        for rung in &FUSION_LADDER {
            for &(z, a) in rung.inputs {
                assert!(elements.isotope(z, a).is_some(), "input {z}-{a}");
            }
            let (z, a) = rung.output;
            assert!(elements.isotope(z, a).is_some(), "output {z}-{a}");
        }
        Ok(())
    }

    #[test]
    fn two_protons_make_a_deuteron() -> Result<()> {
        let mut h = Harness::new(9);
        let mut w = World::new();
        let a = spawn(&mut w, Species::Proton, -30.0)?;
        let b = spawn(&mut w, Species::Proton, 30.0)?;
        let mut ctx = h.ctx(1.0 / 240.0);
        let out = fuse(&mut w, &mut ctx, &[a, b])?;
        assert_eq!(out.len(), 1);
        let d = w.get(out[0]).expect("product exists");
        assert_eq!(d.label(ElementTable::global()?), "H-2");
        assert_eq!(d.charge, 1.0);
        assert_eq!(h.audit.count(AuditKind::Destroy, "Fusion"), 2);
        Ok(())
    }

    #[test]
    fn helium_triple_alpha_then_oxygen() -> Result<()> {
        let mut h = Harness::new(9);
        let mut w = World::new();
        let ids: Vec<BodyId> = (0..4)
            .map(|k| spawn(&mut w, Species::Element(2), k as f64 * 50.0))
            .collect::<Result<_>>()?;
        let mut ctx = h.ctx(1.0 / 240.0);
        let out = fuse(&mut w, &mut ctx, &ids)?;
        assert_eq!(out.len(), 1);
        assert_eq!(w.len(), 1);
        assert_eq!(w.get(out[0]).and_then(|b| b.atomic_number()), Some(8));
        Ok(())
    }

    #[test]
    fn unmatched_selection_is_left_alone() -> Result<()> {
        let mut h = Harness::new(9);
        let mut w = World::new();
        let n = spawn(&mut w, Species::Neutron, 0.0)?;
        let p = spawn(&mut w, Species::Proton, 40.0)?;
        let mut ctx = h.ctx(1.0 / 240.0);
        assert!(fuse(&mut w, &mut ctx, &[n, p])?.is_empty());
        assert_eq!(w.len(), 2);
        Ok(())
    }

    #[test]
    fn unknown_id_is_an_error() {
        let mut h = Harness::new(9);
        let mut w = World::new();
        let mut ctx = h.ctx(1.0 / 240.0);
        assert!(matches!(
            fuse(&mut w, &mut ctx, &[BodyId(42)]),
            Err(Error::UnknownBody(BodyId(42)))
        ));
    }
}
