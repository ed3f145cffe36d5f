//! Bond graph and valency manager.
//!
//! Owns the chemical-validity rules for covalent bonds and the per-tick
//! annealing passes that keep the graph legal: valency enforcement, structure
//! optimization and ghost-bond pruning. Charge is shared evenly across every
//! connected group after any topology change.

use crate::core::body::BodyId;
use crate::core::context::TickContext;
use crate::core::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::core::elements::{ElementKind, ElementTable, MAX_Z};
use crate::core::springs::ideal_length;
use crate::core::vector::{self, Vec3};
use crate::core::world::World;
use ordered_float::OrderedFloat;

/// Heavy noble gases that may bond with oxygen or fluorine.
const HEAVY_NOBLE: [u32; 3] = [36, 54, 86];
/// Partners that let halogens, chalcogens and pnictogens expand their octet.
const EXPANDERS: [u32; 3] = [8, 9, 17];

/// Strains below this are considered near-ideal when choosing which bonds to keep.
const NEAR_IDEAL_STRAIN: f64 = 0.35;

/// Whether `a` and `b` may form a new covalent bond right now.
///
/// Both must be atoms with a free valence slot; noble gases only bond when a
/// heavy noble gas meets O or F; metals never bond with H or C; halogens,
/// chalcogens and pnictogens past their normal bond count only bond with an
/// expander (O, F, Cl); and no bond may close a three-membered ring.
pub fn can_form_bond(world: &World, a: BodyId, b: BodyId, elements: &ElementTable) -> bool {
    if a == b {
        return false;
    }
    let (Some(ba), Some(bb)) = (world.get(a), world.get(b)) else {
        return false;
    };
    let (Some(za), Some(zb)) = (ba.atom().map(|x| x.z), bb.atom().map(|x| x.z)) else {
        return false;
    };
    if !(1..=MAX_Z).contains(&za) || !(1..=MAX_Z).contains(&zb) {
        return false;
    }
    let (Some(ea), Some(eb)) = (elements.get(za), elements.get(zb)) else {
        return false;
    };
    let (free_a, free_b) = (ba.free_valence(elements), bb.free_valence(elements));
    if free_a == 0 || free_b == 0 {
        return false;
    }
    if !elements_compatible(ea, eb) {
        return false;
    }
    if exceeds_hypervalency(ea, ba.bonds.len(), eb) || exceeds_hypervalency(eb, bb.bonds.len(), ea)
    {
        return false;
    }
    !world.share_neighbor(a, b)
}

/// Element-level pairing rules (noble gases, metal partition).
pub fn elements_compatible(ea: &ElementKind, eb: &ElementKind) -> bool {
    if ea.is_noble() || eb.is_noble() {
        let ok = |noble: &ElementKind, other: &ElementKind| {
            noble.is_noble()
                && HEAVY_NOBLE.contains(&noble.z)
                && !other.is_noble()
                && (other.z == 8 || other.z == 9)
        };
        if !(ok(ea, eb) || ok(eb, ea)) {
            return false;
        }
    }
    let metal_blocked = |metal: &ElementKind, other: &ElementKind| {
        metal.is_metal() && (other.z == 1 || other.z == 6)
    };
    !(metal_blocked(ea, eb) || metal_blocked(eb, ea))
}

fn exceeds_hypervalency(el: &ElementKind, bond_count: usize, partner: &ElementKind) -> bool {
    if EXPANDERS.contains(&partner.z) {
        return false;
    }
    (el.is_halogen() && bond_count >= 1)
        || (el.is_chalcogen() && bond_count >= 2)
        || (el.is_pnictogen() && bond_count >= 3)
}

/// Share charge evenly across the connected group of `id`.
///
/// An isolated atom must carry an integer charge and is snapped to the
/// nearest one; a group of two or more gets the mean charge rounded to two
/// decimals. Radii of all affected bodies are refreshed.
pub fn redistribute_charge(world: &mut World, id: BodyId, sink: &mut dyn DiagnosticSink) {
    let group = world.connected_group(id);
    if group.is_empty() {
        return;
    }
    if group.len() == 1 {
        let Some(b) = world.get_mut(id) else {
            return;
        };
        if !b.charge.is_finite() {
            b.charge = 0.0;
            sink.report(Diagnostic::new(
                DiagnosticKind::NumericalRescue,
                Some(id),
                "non-finite charge reset to 0",
            ));
        }
        if b.is_atom() && (b.charge - b.charge.round()).abs() > 1e-9 {
            let snapped = b.charge.round();
            sink.report(Diagnostic::new(
                DiagnosticKind::StateClamp,
                Some(id),
                format!("isolated atom held charge {:.3}, snapped to {snapped}", b.charge),
            ));
            b.charge = snapped;
        }
        b.refresh_radius();
        return;
    }

    let mut total = 0.0;
    for &m in &group {
        if let Some(b) = world.get_mut(m) {
            if !b.charge.is_finite() {
                b.charge = 0.0;
                sink.report(Diagnostic::new(
                    DiagnosticKind::NumericalRescue,
                    Some(m),
                    "non-finite charge reset to 0",
                ));
            }
            total += b.charge;
        }
    }
    let share = (total / group.len() as f64 * 100.0).round() / 100.0;
    for &m in &group {
        if let Some(b) = world.get_mut(m) {
            b.charge = share;
            b.refresh_radius();
        }
    }
}

/// Run the annealing passes over every body, then prune ghost bonds.
pub fn anneal(world: &mut World, ctx: &mut TickContext<'_>) {
    for id in world.ids() {
        enforce_valency(world, id, ctx);
        optimize_structure(world, id, ctx);
    }
    prune_ghost_bonds(world, ctx);
}

/// Break the most strained bonds of `id` until it is within its valence.
pub fn enforce_valency(world: &mut World, id: BodyId, ctx: &mut TickContext<'_>) {
    let elements = ctx.elements();
    let Some(body) = world.get(id) else {
        return;
    };
    let cap = body.effective_max_valence(elements);
    if body.bonds.len() <= cap {
        return;
    }

    let mut scored: Vec<(OrderedFloat<f64>, BodyId)> = body
        .bonds
        .iter()
        .map(|&p| {
            let score = match world.get(p) {
                Some(partner) => {
                    let ideal = ideal_length(body.radius, partner.radius, body.bond_order_with(p));
                    let ratio = vector::distance(&body.pos, &partner.pos) / ideal.max(1e-9);
                    let strain = (ratio - 1.0).abs();
                    let mut s = strain;
                    if ratio < 1.0 {
                        s *= 1.5;
                    }
                    if strain < NEAR_IDEAL_STRAIN {
                        s *= 0.1;
                    }
                    s
                }
                None => f64::INFINITY,
            };
            (OrderedFloat(score), p)
        })
        .collect();
    scored.sort_by_key(|(s, _)| *s);
    let excess: Vec<BodyId> = scored[cap..].iter().map(|(_, p)| *p).collect();

    let mut touched: Vec<BodyId> = Vec::with_capacity(excess.len());
    for p in excess {
        world.remove_bond(id, p);
        separation_impulse(world, id, p, ctx.config.reactions.separation_impulse);
        if !touched.contains(&p) {
            touched.push(p);
        }
    }
    ctx.diagnose(
        DiagnosticKind::Housekeeping,
        Some(id),
        format!("valence exceeded, broke {} bond(s)", touched.len()),
    );
    redistribute_charge(world, id, ctx.sink);
    for p in touched {
        redistribute_charge(world, p, ctx.sink);
    }
}

/// Re-check the bonds of `id` after its species changed.
///
/// Bonds to partners the new element may not pair with are broken first,
/// then the valence cap is enforced. Partners that no longer exist are left
/// to [`prune_ghost_bonds`].
pub fn revalidate(world: &mut World, id: BodyId, ctx: &mut TickContext<'_>) {
    let elements = ctx.elements();
    let Some(body) = world.get(id) else {
        return;
    };
    let own = body.atom().and_then(|a| elements.get(a.z));
    let mut rejected: Vec<BodyId> = Vec::new();
    for &p in &body.bonds {
        let Some(partner) = world.get(p) else {
            continue;
        };
        let keep = match (own, partner.atom().and_then(|a| elements.get(a.z))) {
            (Some(ea), Some(eb)) => elements_compatible(ea, eb),
            _ => false,
        };
        if !keep && !rejected.contains(&p) {
            rejected.push(p);
        }
    }

    if !rejected.is_empty() {
        for &p in &rejected {
            world.remove_all_bonds(id, p);
            separation_impulse(world, id, p, ctx.config.reactions.separation_impulse);
            ctx.cancel_labels(p);
        }
        ctx.cancel_labels(id);
        ctx.diagnose(
            DiagnosticKind::Housekeeping,
            Some(id),
            format!("species change broke {} incompatible bond(s)", rejected.len()),
        );
        redistribute_charge(world, id, ctx.sink);
        for p in rejected {
            redistribute_charge(world, p, ctx.sink);
        }
    }
    enforce_valency(world, id, ctx);
}

/// Trade a homonuclear bond of a low-valence atom for a better nearby partner.
///
/// The bond is broken and the atom is nudged toward the candidate; the new
/// bond itself is left to the interaction resolver.
pub fn optimize_structure(world: &mut World, id: BodyId, ctx: &mut TickContext<'_>) {
    let elements = ctx.elements();
    let Some(body) = world.get(id) else {
        return;
    };
    if body.is_assembling() {
        return;
    }
    let Some(z) = body.atom().map(|a| a.z) else {
        return;
    };
    let Some(el) = elements.get(z) else {
        return;
    };
    let cap = el.effective_max_valence();
    if cap > 2 {
        return;
    }
    let Some(homo) = body
        .bonds
        .iter()
        .copied()
        .find(|&p| world.get(p).and_then(|b| b.atom()).is_some_and(|a| a.z == z))
    else {
        return;
    };

    let radius = ctx.config.reactions.optimize_radius;
    let mut best: Option<(f64, BodyId, Vec3)> = None;
    for cand in world.iter() {
        if cand.id == id || cand.is_assembling() || body.bonds.contains(&cand.id) {
            continue;
        }
        let Some(cz) = cand.atom().map(|a| a.z) else {
            continue;
        };
        let Some(cel) = elements.get(cz) else {
            continue;
        };
        if cel.effective_max_valence() <= cap || cand.free_valence(elements) == 0 {
            continue;
        }
        if !elements_compatible(el, cel) {
            continue;
        }
        let d = vector::distance(&body.pos, &cand.pos);
        if d > radius {
            continue;
        }
        if best.as_ref().map_or(true, |(bd, _, _)| d < *bd) {
            best = Some((d, cand.id, cand.pos));
        }
    }
    let Some((_, target, target_pos)) = best else {
        return;
    };

    let from = body.pos;
    world.remove_all_bonds(id, homo);
    ctx.cancel_labels(id);
    ctx.cancel_labels(homo);
    let speed = ctx.config.reactions.optimize_impulse;
    if let (Some(dir), Some(b)) = (
        vector::normalized(&vector::sub(&target_pos, &from)),
        world.get_mut(id),
    ) {
        b.kick(&vector::scale(&dir, speed));
    }
    ctx.diagnose(
        DiagnosticKind::Housekeeping,
        Some(id),
        format!("homonuclear bond to {homo} traded for {target}"),
    );
    redistribute_charge(world, id, ctx.sink);
    redistribute_charge(world, homo, ctx.sink);
}

/// Drop adjacency entries whose partner is gone or implausibly far away.
pub fn prune_ghost_bonds(world: &mut World, ctx: &mut TickContext<'_>) {
    let limit = ctx.config.reactions.ghost_bond_distance;
    let mut broken: Vec<(BodyId, BodyId)> = Vec::new();
    let mut orphaned: Vec<(BodyId, BodyId)> = Vec::new();
    for b in world.iter() {
        for &p in &b.bonds {
            match world.get(p) {
                None => orphaned.push((b.id, p)),
                Some(partner) => {
                    if b.id < p && vector::distance(&b.pos, &partner.pos) > limit {
                        broken.push((b.id, p));
                    }
                }
            }
        }
    }
    orphaned.dedup();
    broken.dedup();
    if orphaned.is_empty() && broken.is_empty() {
        return;
    }

    let mut touched: Vec<BodyId> = Vec::new();
    for (a, ghost) in orphaned {
        if let Some(b) = world.get_mut(a) {
            b.bonds.retain(|&x| x != ghost);
        }
        ctx.diagnose(
            DiagnosticKind::Housekeeping,
            Some(a),
            format!("pruned bond to missing body {ghost}"),
        );
        touched.push(a);
    }
    for (a, b) in broken {
        world.remove_all_bonds(a, b);
        ctx.cancel_labels(a);
        ctx.cancel_labels(b);
        ctx.diagnose(
            DiagnosticKind::Housekeeping,
            Some(a),
            format!("pruned over-stretched bond to {b}"),
        );
        touched.push(a);
        touched.push(b);
    }
    touched.sort();
    touched.dedup();
    for id in touched {
        redistribute_charge(world, id, ctx.sink);
    }
}

/// Push two bodies apart along their separation, weighted by mass.
pub fn separation_impulse(world: &mut World, a: BodyId, b: BodyId, strength: f64) {
    let (Some(ia), Some(ib)) = (world.index_of(a), world.index_of(b)) else {
        return;
    };
    let (ba, bb) = world.pair_mut(ia, ib);
    let n = vector::normalized(&vector::sub(&bb.pos, &ba.pos))
        .unwrap_or_else(|| hashed_direction(a, b));
    let (ma, mb) = (ba.mass.max(1e-6), bb.mass.max(1e-6));
    let mu = ma * mb / (ma + mb);
    let j = strength * mu;
    vector::add_scaled(&mut ba.vel, &n, -j / ma);
    vector::add_scaled(&mut bb.vel, &n, j / mb);
}

/// Deterministic unit vector derived from a pair of ids.
///
/// Used wherever two bodies coincide and no geometric direction exists.
pub fn hashed_direction(a: BodyId, b: BodyId) -> Vec3 {
    let (lo, hi) = if a <= b { (a.0, b.0) } else { (b.0, a.0) };
    // SplitMix64 finalizer over the ordered pair.
    let mut h = lo
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(hi.rotate_left(32));
    h ^= h >> 30;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    let theta = (h & 0xFFFF) as f64 / 65535.0 * std::f64::consts::TAU;
    let cos_phi = ((h >> 16) & 0xFFFF) as f64 / 65535.0 * 2.0 - 1.0;
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    let v = [sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi];
    vector::normalized(&v).unwrap_or([1.0, 0.0, 0.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::body::{Body, Species};
    use crate::core::context::Harness;
    use crate::core::diagnostics::{NoopSink, RecordingSink};
    use crate::core::vector::ZERO;
    use crate::error::Result;

    fn table() -> &'static ElementTable {
        ElementTable::global().expect("embedded table")
    }

    fn spawn(world: &mut World, species: Species, pos: Vec3) -> Result<BodyId> {
        let id = world.allocate_id();
        let body = Body::spawn(id, species, pos, ZERO, table(), 0.0)?;
        Ok(world.insert(body))
    }

    #[test]
    fn hydrogen_and_oxygen_may_bond() -> Result<()> {
        let mut w = World::new();
        let h = spawn(&mut w, Species::Element(1), ZERO)?;
        let o = spawn(&mut w, Species::Element(8), [80.0, 0.0, 0.0])?;
        assert!(can_form_bond(&w, h, o, table()));
        Ok(())
    }

    #[test]
    fn noble_gases_are_inert_except_heavy_with_o_or_f() -> Result<()> {
        let mut w = World::new();
        let ne = spawn(&mut w, Species::Element(10), ZERO)?;
        let xe = spawn(&mut w, Species::Element(54), [300.0, 0.0, 0.0])?;
        let f = spawn(&mut w, Species::Element(9), [600.0, 0.0, 0.0])?;
        let h = spawn(&mut w, Species::Element(1), [900.0, 0.0, 0.0])?;
        assert!(!can_form_bond(&w, ne, f, table()));
        assert!(can_form_bond(&w, xe, f, table()));
        assert!(!can_form_bond(&w, xe, h, table()));
        Ok(())
    }

    #[test]
    fn metals_do_not_bond_with_hydrogen_or_carbon() -> Result<()> {
        let mut w = World::new();
        let na = spawn(&mut w, Species::Element(11), ZERO)?;
        let h = spawn(&mut w, Species::Element(1), [100.0, 0.0, 0.0])?;
        let c = spawn(&mut w, Species::Element(6), [200.0, 0.0, 0.0])?;
        let cl = spawn(&mut w, Species::Element(17), [300.0, 0.0, 0.0])?;
        assert!(!can_form_bond(&w, na, h, table()));
        assert!(!can_form_bond(&w, c, na, table()));
        assert!(can_form_bond(&w, na, cl, table()));
        Ok(())
    }

    #[test]
    fn halogen_hypervalency_needs_expander() -> Result<()> {
        let mut w = World::new();
        let cl = spawn(&mut w, Species::Element(17), ZERO)?;
        let h1 = spawn(&mut w, Species::Element(1), [100.0, 0.0, 0.0])?;
        let h2 = spawn(&mut w, Species::Element(1), [-100.0, 0.0, 0.0])?;
        let o = spawn(&mut w, Species::Element(8), [0.0, 100.0, 0.0])?;
        w.add_bond(cl, h1);
        assert!(!can_form_bond(&w, cl, h2, table()));
        assert!(can_form_bond(&w, cl, o, table()));
        Ok(())
    }

    #[test]
    fn no_three_membered_rings() -> Result<()> {
        let mut w = World::new();
        let a = spawn(&mut w, Species::Element(6), ZERO)?;
        let b = spawn(&mut w, Species::Element(6), [100.0, 0.0, 0.0])?;
        let c = spawn(&mut w, Species::Element(6), [50.0, 80.0, 0.0])?;
        w.add_bond(a, b);
        w.add_bond(b, c);
        assert!(!can_form_bond(&w, a, c, table()));
        Ok(())
    }

    #[test]
    fn saturated_atoms_cannot_bond() -> Result<()> {
        let mut w = World::new();
        let h1 = spawn(&mut w, Species::Element(1), ZERO)?;
        let h2 = spawn(&mut w, Species::Element(1), [80.0, 0.0, 0.0])?;
        let h3 = spawn(&mut w, Species::Element(1), [160.0, 0.0, 0.0])?;
        w.add_bond(h1, h2);
        assert!(!can_form_bond(&w, h2, h3, table()));
        let e = spawn(&mut w, Species::Electron, [300.0, 0.0, 0.0])?;
        assert!(!can_form_bond(&w, h3, e, table()));
        Ok(())
    }

    #[test]
    fn redistribution_conserves_group_charge() -> Result<()> {
        let mut w = World::new();
        let o = spawn(&mut w, Species::Element(8), ZERO)?;
        let h1 = spawn(&mut w, Species::Element(1), [80.0, 0.0, 0.0])?;
        let h2 = spawn(&mut w, Species::Element(1), [-80.0, 0.0, 0.0])?;
        w.add_bond(o, h1);
        w.add_bond(o, h2);
        if let Some(b) = w.get_mut(h1) {
            b.charge = 1.0;
        }
        let before: f64 = w.iter().map(|b| b.charge).sum();
        redistribute_charge(&mut w, o, &mut NoopSink);
        let after: f64 = w.iter().map(|b| b.charge).sum();
        assert!((before - after).abs() < 0.1);
        assert!(w.iter().all(|b| (b.charge - 0.33).abs() < 1e-12));
        Ok(())
    }

    #[test]
    fn isolated_fractional_charge_snaps() -> Result<()> {
        let mut w = World::new();
        let o = spawn(&mut w, Species::Element(8), ZERO)?;
        if let Some(b) = w.get_mut(o) {
            b.charge = 0.66;
        }
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        redistribute_charge(&mut w, o, &mut writer);
        assert_eq!(w.get(o).map(|b| b.charge), Some(1.0));
        assert_eq!(sink.count(DiagnosticKind::StateClamp), 1);
        Ok(())
    }

    #[test]
    fn over_valence_sheds_the_most_strained_bond() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        let o = spawn(&mut w, Species::Element(8), ZERO)?;
        let near = spawn(&mut w, Species::Element(1), [70.0, 0.0, 0.0])?;
        let close = spawn(&mut w, Species::Element(1), [0.0, 75.0, 0.0])?;
        let far = spawn(&mut w, Species::Element(1), [-300.0, 0.0, 0.0])?;
        for p in [near, close, far] {
            w.add_bond(o, p);
        }

        let mut ctx = h.ctx(0.01);
        enforce_valency(&mut w, o, &mut ctx);
        let oxygen = w.get(o).expect("oxygen");
        assert_eq!(oxygen.bonds.len(), 2);
        assert!(oxygen.bonds.contains(&near) && oxygen.bonds.contains(&close));
        assert!(w.get(far).is_some_and(|b| b.bonds.is_empty()));
        assert!(w.bonds_symmetric());
        assert_eq!(h.sink.count(DiagnosticKind::Housekeeping), 1);
        Ok(())
    }

    #[test]
    fn homonuclear_bond_is_traded_for_a_richer_partner() -> Result<()> {
        let mut h = Harness::new(2);
        let mut w = World::new();
        let h1 = spawn(&mut w, Species::Element(1), ZERO)?;
        let h2 = spawn(&mut w, Species::Element(1), [-80.0, 0.0, 0.0])?;
        let o = spawn(&mut w, Species::Element(8), [150.0, 0.0, 0.0])?;
        w.add_bond(h1, h2);

        let mut ctx = h.ctx(0.01);
        optimize_structure(&mut w, h1, &mut ctx);
        assert!(!w.are_bonded(h1, h2));
        // Nudged toward the oxygen; the new bond is left to contact.
        assert!(w.get(h1).is_some_and(|b| b.vel[0] > 0.0));
        assert!(!w.are_bonded(h1, o));
        Ok(())
    }

    #[test]
    fn homonuclear_bond_kept_without_a_candidate() -> Result<()> {
        let mut h = Harness::new(2);
        let mut w = World::new();
        let h1 = spawn(&mut w, Species::Element(1), ZERO)?;
        let h2 = spawn(&mut w, Species::Element(1), [-80.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Element(8), [900.0, 0.0, 0.0])?;
        w.add_bond(h1, h2);

        let mut ctx = h.ctx(0.01);
        optimize_structure(&mut w, h1, &mut ctx);
        assert!(w.are_bonded(h1, h2));
        Ok(())
    }

    #[test]
    fn ghost_bonds_are_pruned() -> Result<()> {
        let mut h = Harness::new(3);
        let mut w = World::new();
        let a = spawn(&mut w, Species::Element(6), ZERO)?;
        let b = spawn(&mut w, Species::Element(6), [90.0, 0.0, 0.0])?;
        let c = spawn(&mut w, Species::Element(8), [600.0, 0.0, 0.0])?;
        w.add_bond(a, b);
        w.add_bond(b, c);
        if let Some(body) = w.get_mut(a) {
            body.bonds.push(BodyId(999));
        }

        let mut ctx = h.ctx(0.01);
        prune_ghost_bonds(&mut w, &mut ctx);
        assert!(w.are_bonded(a, b));
        assert!(!w.are_bonded(b, c));
        assert_eq!(w.get(a).map(|x| x.bonds.clone()), Some(vec![b]));
        assert!(w.bonds_symmetric());
        assert_eq!(h.sink.count(DiagnosticKind::Housekeeping), 2);
        Ok(())
    }

    #[test]
    fn species_change_drops_incompatible_partners() -> Result<()> {
        let mut h = Harness::new(4);
        let mut w = World::new();
        let x = spawn(&mut w, Species::Element(8), ZERO)?;
        let c = spawn(&mut w, Species::Element(6), [90.0, 0.0, 0.0])?;
        w.add_bond(x, c);
        if let Some(body) = w.get_mut(x) {
            body.kind = crate::core::body::BodyKind::Atom(crate::core::body::AtomState {
                z: 11,
                isotope: 0,
                synthetic: None,
            });
        }

        let mut ctx = h.ctx(0.01);
        revalidate(&mut w, x, &mut ctx);
        assert!(!w.are_bonded(x, c));
        assert!(w.bonds_symmetric());
        Ok(())
    }

    #[test]
    fn hashed_direction_is_deterministic_unit() {
        let d1 = hashed_direction(BodyId(3), BodyId(9));
        let d2 = hashed_direction(BodyId(9), BodyId(3));
        assert_eq!(d1, d2);
        assert!((vector::norm(&d1) - 1.0).abs() < 1e-9);
        assert_ne!(d1, hashed_direction(BodyId(3), BodyId(10)));
    }
}
