//! Radioactive decay, spontaneous fission and quark expiry.

use crate::core::body::{AtomState, Body, BodyId, BodyKind, Species};
use crate::core::context::{Effect, TickContext};
use crate::core::diagnostics::DiagnosticKind;
use crate::core::elements::{DecayMode, ElementTable};
use crate::core::lifecycle;
use crate::core::vector::{self, Vec3};
use crate::core::world::World;
use rand::rngs::StdRng;
use rand::Rng;

/// Heaviest elements fission when their decay has no tabulated daughter.
const FISSION_FALLBACK_Z: u32 = 90;

/// Probability that a body with `half_life` decays within `dt`.
///
/// Half-lives are floored to `min_half_life`, so shorter half-lives always
/// give a strictly higher probability for the same `dt`.
pub fn decay_probability(half_life: f64, dt: f64, min_half_life: f64) -> f64 {
    if dt <= 0.0 || !half_life.is_finite() {
        return 0.0;
    }
    let lambda = std::f64::consts::LN_2 / half_life.max(min_half_life);
    1.0 - (-lambda * dt).exp()
}

/// Run decay draws for every unstable atom and expire stale quarks.
pub fn process_decays(world: &mut World, ctx: &mut TickContext<'_>) {
    let nuclear = &ctx.config.nuclear;
    let (grace, min_hl) = (nuclear.decay_grace, nuclear.min_half_life);
    let (quark_life, exotic_life) = (nuclear.quark_lifetime, nuclear.exotic_lifetime);
    let now = ctx.now;
    let elements = ctx.elements();

    for id in world.ids() {
        let Some(body) = world.get_mut(id) else {
            continue;
        };
        let age = now - body.created_at;
        let expired = match body.kind {
            BodyKind::Quark { anti: false, .. } if age > quark_life => Some("Quark expired"),
            BodyKind::Quark { anti: true, .. } if age > exotic_life => Some("Antiquark expired"),
            _ => None,
        };
        if let Some(reason) = expired {
            lifecycle::destroy(world, ctx, id, reason);
            continue;
        }

        let Some(half_life) = body.half_life(elements) else {
            continue;
        };
        if now - body.created_at.max(body.last_reaction) < grace {
            body.last_decay_check = now;
            continue;
        }
        let elapsed = now - body.last_decay_check;
        body.last_decay_check = now;
        let p = decay_probability(half_life, elapsed, min_hl);
        if ctx.rng.random::<f64>() < p {
            decay(world, ctx, id);
        }
    }
}

/// Decay `id` through its isotope's mode.
///
/// Alpha and beta modes transmute the atom in place to the tabulated daughter
/// (snapping to the element's nearest tabulated isotope). Without a daughter,
/// elements from thorium up fission and lighter ones are removed.
pub fn decay(world: &mut World, ctx: &mut TickContext<'_>, id: BodyId) {
    let elements = ctx.elements();
    let Some(body) = world.get(id) else {
        return;
    };
    let Some(state) = body.atom() else {
        return;
    };
    let Some(iso) = elements.get(state.z).and_then(|el| state.isotope(el)) else {
        return;
    };
    let Some(mode) = iso.mode else {
        return;
    };
    let z = state.z;
    let daughter = iso.daughter;

    if mode == DecayMode::Fission {
        fission(world, ctx, id, mode.reason());
        return;
    }

    match daughter.and_then(|[dz, da]| resolve_daughter(elements, dz, da)) {
        Some((kind, mass)) => {
            let pos = body.pos;
            let charge = body.charge;
            let dz = match &kind {
                BodyKind::Atom(s) => s.z as f64,
                _ => 0.0,
            };
            lifecycle::transmute(world, ctx, id, kind, mass, mode.reason());
            let (recoil, size) = match mode {
                DecayMode::Alpha => (ctx.config.nuclear.alpha_recoil, 1.5),
                _ => (ctx.config.nuclear.beta_recoil, 0.8),
            };
            let dir = random_direction(ctx.rng);
            if let Some(b) = world.get_mut(id) {
                b.charge = charge.clamp(-dz, dz);
                b.kick(&vector::scale(&dir, recoil));
            }
            ctx.effects.push(Effect::Marker {
                pos,
                size,
                text: mode.reason().to_string(),
            });
        }
        None if z >= FISSION_FALLBACK_Z => {
            ctx.diagnose(
                DiagnosticKind::MissingData,
                Some(id),
                format!("no daughter for Z={z}, falling back to fission"),
            );
            fission(world, ctx, id, DecayMode::Fission.reason());
        }
        None => {
            ctx.diagnose(
                DiagnosticKind::MissingData,
                Some(id),
                format!("no daughter for Z={z}, removing"),
            );
            let pos = body.pos;
            lifecycle::destroy(world, ctx, id, mode.reason());
            ctx.burst(pos, 0.8, "Decay");
        }
    }
}

/// Split a heavy atom into two fragments at a 40-60 % ratio plus two or three
/// neutrons.
///
/// Fragments fly apart along a random axis; neutrons are spread evenly in the
/// plane perpendicular to it.
pub fn fission(world: &mut World, ctx: &mut TickContext<'_>, id: BodyId, reason: &str) {
    let elements = ctx.elements();
    let Some(body) = world.get(id) else {
        return;
    };
    let (Some(z), Some(a)) = (body.atomic_number(), body.mass_number(elements)) else {
        return;
    };
    let (pos, vel, charge, radius) = (body.pos, body.vel, body.charge, body.radius);
    if z < 2 {
        lifecycle::destroy(world, ctx, id, reason);
        return;
    }

    let ratio: f64 = ctx.rng.random_range(0.4..=0.6);
    let neutrons: u32 = ctx.rng.random_range(2..=3);
    let a_left = a.saturating_sub(neutrons).max(2);
    let z1 = ((z as f64 * ratio).round() as u32).clamp(1, z - 1);
    let z2 = z - z1;
    let a1 = ((a_left as f64 * ratio).round() as u32).max(z1);
    let a2 = a_left.saturating_sub(a1).max(z2);
    let q1 = (charge * ratio).round();
    let q2 = charge - q1;

    lifecycle::destroy(world, ctx, id, reason);

    let axis = random_direction(ctx.rng);
    let kick = ctx.config.nuclear.fission_kick;
    let now = ctx.now;
    for (fz, fa, fq, sign) in [(z1, a1, q1, 1.0), (z2, a2, q2, -1.0)] {
        let Some((kind, mass)) = resolve_daughter(elements, fz, fa) else {
            ctx.diagnose(
                DiagnosticKind::MissingData,
                None,
                format!("fission fragment Z={fz} not tabulated"),
            );
            continue;
        };
        let dir = vector::scale(&axis, sign);
        let fpos = vector::add(&pos, &vector::scale(&dir, radius * 0.5));
        let fvel = vector::add(&vel, &vector::scale(&dir, kick));
        let fid = world.allocate_id();
        let fq = fq.clamp(-(fz as f64), fz as f64);
        let mut fragment = Body::from_parts(fid, kind, mass, fq, fpos, fvel, now);
        fragment.mark_reacted(now, ctx.config.reactions.reaction_cooldown);
        lifecycle::insert(world, ctx, fragment, "Fission fragment");
    }

    let perp = vector::perpendicular(&axis);
    let binormal = vector::cross(&axis, &perp);
    let speed = ctx.config.nuclear.fission_neutron_speed;
    for k in 0..neutrons {
        let angle = k as f64 * std::f64::consts::TAU / neutrons as f64;
        let mut dir = vector::scale(&perp, angle.cos());
        vector::add_scaled(&mut dir, &binormal, angle.sin());
        let npos = vector::add(&pos, &vector::scale(&dir, radius));
        let nvel = vector::add(&vel, &vector::scale(&dir, speed));
        lifecycle::spawn(world, ctx, Species::Neutron, npos, nvel, "Fission neutron");
    }
    ctx.burst(pos, 2.0, "Fission");
}

/// Uniformly distributed unit vector.
pub(crate) fn random_direction(rng: &mut StdRng) -> Vec3 {
    let z: f64 = rng.random_range(-1.0..=1.0);
    let theta: f64 = rng.random_range(0.0..std::f64::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    [r * theta.cos(), r * theta.sin(), z]
}

// ============ Internal helpers ============

/// Atom kind and mass for `[Z, A]`, snapping to the nearest tabulated isotope.
fn resolve_daughter(elements: &ElementTable, z: u32, a: u32) -> Option<(BodyKind, f64)> {
    let el = elements.get(z)?;
    let idx = el
        .isotope_index(a)
        .unwrap_or_else(|| el.nearest_isotope_index(a));
    let mass = el.isotopes.get(idx)?.mass;
    let kind = BodyKind::Atom(AtomState {
        z,
        isotope: idx,
        synthetic: None,
    });
    Some((kind, mass))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditKind;
    use crate::core::context::Harness;
    use crate::core::vector::ZERO;
    use crate::error::Result;

    fn spawn(world: &mut World, species: Species, now: f64) -> Result<BodyId> {
        let id = world.allocate_id();
        let body = Body::spawn(id, species, ZERO, ZERO, ElementTable::global()?, now)?;
        Ok(world.insert(body))
    }

    #[test]
    fn shorter_half_life_decays_more_often() {
        let dt = 1.0 / 240.0;
        let long = decay_probability(10.0, dt, 0.3);
        let short = decay_probability(1.0, dt, 0.3);
        assert!(short > long);
        assert!(long > 0.0);
        // Below the floor every half-life behaves the same.
        assert_eq!(decay_probability(0.1, dt, 0.3), decay_probability(0.3, dt, 0.3));
        assert_eq!(decay_probability(1.0, 0.0, 0.3), 0.0);
    }

    #[test]
    fn alpha_decay_follows_the_chain() -> Result<()> {
        let mut h = Harness::new(11);
        let mut w = World::new();
        let og = spawn(&mut w, Species::Element(118), 0.0)?;
        h.now = 1.0;
        let mut ctx = h.ctx(1.0 / 240.0);
        decay(&mut w, &mut ctx, og);
        let body = w.get(og).expect("transmuted in place");
        assert_eq!(body.atomic_number(), Some(116));
        assert_eq!(body.label(ElementTable::global()?), "Lv-290");
        assert_eq!(h.audit.count(AuditKind::Create, "Alpha decay"), 1);
        assert!(h.effects.iter().any(|e| matches!(e, Effect::Marker { .. })));
        Ok(())
    }

    #[test]
    fn decayed_atom_sheds_bonds_it_can_no_longer_hold() -> Result<()> {
        let elements = ElementTable::global()?;
        let mut h = Harness::new(3);
        let mut w = World::new();
        let tritium = spawn(&mut w, Species::Isotope { z: 1, a: 3 }, 0.0)?;
        let o = spawn(&mut w, Species::Element(8), 0.0)?;
        if let Some(b) = w.get_mut(o) {
            b.pos = [60.0, 0.0, 0.0];
        }
        w.add_bond(tritium, o);

        let mut ctx = h.ctx(1.0 / 240.0);
        decay(&mut w, &mut ctx, tritium);
        let he = w.get(tritium).expect("transmuted in place");
        assert_eq!(he.label(elements), "He-3");
        assert!(he.bonds.is_empty());
        assert!(w.get(o).is_some_and(|b| b.bonds.is_empty()));
        assert!(w.bonds_symmetric());
        Ok(())
    }

    #[test]
    fn beta_decay_trims_to_the_daughter_valence() -> Result<()> {
        let elements = ElementTable::global()?;
        let mut h = Harness::new(4);
        let mut w = World::new();
        let c = spawn(&mut w, Species::Isotope { z: 6, a: 14 }, 0.0)?;
        let dirs = [[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, -1.0, 0.0]];
        let reach = [85.0, 90.0, 95.0, 200.0];
        let mut hs = Vec::new();
        for (d, r) in dirs.iter().zip(reach) {
            let hid = spawn(&mut w, Species::Element(1), 0.0)?;
            if let Some(b) = w.get_mut(hid) {
                b.pos = vector::scale(d, r);
            }
            w.add_bond(c, hid);
            hs.push(hid);
        }

        let mut ctx = h.ctx(1.0 / 240.0);
        decay(&mut w, &mut ctx, c);
        let n = w.get(c).expect("transmuted in place");
        assert_eq!(n.label(elements), "N-14");
        assert_eq!(n.bonds.len(), 3);
        // The most stretched hydrogen is the one let go.
        assert!(!n.bonds.contains(&hs[3]));
        for b in w.iter() {
            assert!(b.bonds.len() <= b.effective_max_valence(elements));
        }
        assert!(w.bonds_symmetric());
        Ok(())
    }

    #[test]
    fn fission_conserves_protons_and_emits_neutrons() -> Result<()> {
        let mut h = Harness::new(5);
        let mut w = World::new();
        let u = spawn(&mut w, Species::Isotope { z: 92, a: 236 }, 0.0)?;
        let mut ctx = h.ctx(1.0 / 240.0);
        fission(&mut w, &mut ctx, u, "Spontaneous fission");
        assert!(w.get(u).is_none());
        let z_total: u32 = w
            .iter()
            .filter(|b| b.is_atom())
            .filter_map(|b| b.atomic_number())
            .sum();
        assert_eq!(z_total, 92);
        let neutrons = w
            .iter()
            .filter(|b| b.symbol(ElementTable::global().expect("table")) == "n⁰")
            .count();
        assert!((2..=3).contains(&neutrons));
        Ok(())
    }

    #[test]
    fn grace_period_blocks_decay() -> Result<()> {
        let mut h = Harness::new(2);
        let mut w = World::new();
        let og = spawn(&mut w, Species::Element(118), 0.0)?;
        h.now = 0.1;
        let mut ctx = h.ctx(1.0 / 240.0);
        process_decays(&mut w, &mut ctx);
        assert_eq!(w.get(og).and_then(|b| b.atomic_number()), Some(118));
        assert_eq!(w.get(og).map(|b| b.last_decay_check), Some(0.1));
        Ok(())
    }

    #[test]
    fn stale_quarks_expire() -> Result<()> {
        let mut h = Harness::new(2);
        let mut w = World::new();
        spawn(&mut w, Species::UP, 0.0)?;
        spawn(&mut w, Species::ANTI_DOWN, 0.0)?;
        h.now = 1.0;
        let mut ctx = h.ctx(1.0 / 240.0);
        process_decays(&mut w, &mut ctx);
        assert_eq!(w.len(), 1);
        assert_eq!(h.audit.count(AuditKind::Destroy, "Antiquark expired"), 1);
        h.now = 6.0;
        let mut ctx = h.ctx(1.0 / 240.0);
        process_decays(&mut w, &mut ctx);
        assert!(w.is_empty());
        Ok(())
    }
}
