//! Pairwise interaction resolver.
//!
//! Visits every unordered pair once per tick. Bonded pairs get spring forces;
//! unbonded pairs feel softened Coulomb forces and, on contact, run the
//! reaction chain in [`crate::core::reactions`] before falling back to contact
//! repulsion and bond formation.

use crate::core::bonds;
use crate::core::context::TickContext;
use crate::core::diagnostics::DiagnosticKind;
use crate::core::reactions::{self, PairOutcome};
use crate::core::springs::{self, BondOutcome};
use crate::core::vector::{self, Vec3};
use crate::core::world::World;

/// Separations below this are treated as coincident.
const EPS_DIST: f64 = 1e-9;

/// Resolve every pair in the world for one tick.
///
/// Removal preserves the order of the remaining bodies, so after a reaction
/// the indices are adjusted according to the returned [`PairOutcome`] and no
/// removed body is ever visited again.
pub fn resolve_all(world: &mut World, ctx: &mut TickContext<'_>) {
    let mut i = 0;
    'outer: while i < world.len() {
        let mut j = i + 1;
        while j < world.len() {
            match resolve_pair(world, i, j, ctx) {
                PairOutcome::Continue => j += 1,
                // The next body slid into slot j.
                PairOutcome::RemovedSecond => {}
                // The next body slid into slot i; restart its row.
                PairOutcome::RemovedFirst | PairOutcome::RemovedBoth => continue 'outer,
            }
        }
        i += 1;
    }
}

/// Resolve the pair at indices `i < j`.
pub fn resolve_pair(
    world: &mut World,
    i: usize,
    j: usize,
    ctx: &mut TickContext<'_>,
) -> PairOutcome {
    let (a, b) = (world.at(i), world.at(j));
    if a.is_photon() || b.is_photon() {
        return PairOutcome::Continue;
    }
    let (ida, idb) = (a.id, b.id);
    let bonded = a.bonds.contains(&idb);
    let contact = a.radius + b.radius;

    let mut delta = vector::sub(&b.pos, &a.pos);
    let mut dist = vector::norm(&delta);
    if !dist.is_finite() {
        ctx.diagnose(
            DiagnosticKind::NumericalRescue,
            Some(ida),
            format!("non-finite separation to {idb}, pair skipped"),
        );
        return PairOutcome::Continue;
    }

    // Set when the sweep below advanced the pair to its contact point.
    let mut swept = false;
    if !bonded && dist > contact {
        let rel_disp = vector::scale(&vector::sub(&b.vel, &a.vel), ctx.dt);
        if vector::norm(&rel_disp) > ctx.config.forces.ccd_fraction * contact {
            if let Some(t) = sweep_contact(&delta, &rel_disp, contact) {
                let step = t * ctx.dt;
                let (ba, bb) = world.pair_mut(i, j);
                let (va, vb) = (ba.vel, bb.vel);
                vector::add_scaled(&mut ba.pos, &va, step);
                vector::add_scaled(&mut bb.pos, &vb, step);
                delta = vector::sub(&bb.pos, &ba.pos);
                dist = vector::norm(&delta);
                swept = true;
            }
        }
    }

    let normal = if dist > EPS_DIST {
        vector::scale(&delta, 1.0 / dist)
    } else {
        bonds::hashed_direction(ida, idb)
    };

    if bonded {
        match springs::apply_bond_forces(world, i, j, &normal, dist, ctx) {
            BondOutcome::Held => return PairOutcome::Continue,
            // Freed this tick: the pair now feels the unbonded forces.
            BondOutcome::Snapped => {}
        }
    }

    apply_coulomb(world, i, j, &normal, dist, ctx);

    if dist >= contact && !swept {
        return PairOutcome::Continue;
    }

    let (a, b) = (world.at(i), world.at(j));
    match (a.is_assembling(), b.is_assembling()) {
        (true, true) => return PairOutcome::Continue,
        (true, false) | (false, true) => {
            collide(world, i, j, &normal, (contact - dist).max(0.0), ctx);
            return PairOutcome::Continue;
        }
        (false, false) => {}
    }

    if let Some(outcome) = reactions::try_annihilation(world, i, j, &normal, ctx)
        .or_else(|| reactions::try_positron_capture(world, i, j, ctx))
        .or_else(|| reactions::try_electron_capture(world, i, j, ctx))
        .or_else(|| reactions::try_neutron_capture(world, i, j, ctx))
    {
        return outcome;
    }

    let bonded_now = try_form_bond(world, i, j, ctx);
    collide(world, i, j, &normal, (contact - dist).max(0.0), ctx);
    if !bonded_now {
        bounce(world, i, j, &normal, ctx);
    }
    PairOutcome::Continue
}

/// Earliest fraction `t` in `[0, 1]` of the relative displacement at which two
/// spheres separated by `delta` come into contact.
pub fn sweep_contact(delta: &Vec3, rel_disp: &Vec3, contact: f64) -> Option<f64> {
    let a = vector::dot(rel_disp, rel_disp);
    if a <= EPS_DIST {
        return None;
    }
    let b = 2.0 * vector::dot(delta, rel_disp);
    let c = vector::dot(delta, delta) - contact * contact;
    if b >= 0.0 {
        // Separating.
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc <= 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

// ============ Internal helpers ============

/// Softened inverse-square force between unbonded charged bodies.
fn apply_coulomb(
    world: &mut World,
    i: usize,
    j: usize,
    normal: &Vec3,
    dist: f64,
    ctx: &TickContext<'_>,
) {
    let cfg = &ctx.config.forces;
    if dist > cfg.coulomb_cutoff {
        return;
    }
    let (a, b) = world.pair_mut(i, j);
    let qq = a.charge * b.charge;
    if qq.abs() < 1e-9 {
        return;
    }
    let soft = cfg.coulomb_softening;
    let magnitude = cfg.coulomb_k * qq / (dist * dist + soft * soft);
    if !magnitude.is_finite() {
        return;
    }
    // Like charges (positive product) push `a` against the normal.
    vector::add_scaled(&mut a.force, normal, -magnitude);
    vector::add_scaled(&mut b.force, normal, magnitude);
}

/// Penalty force pushing overlapping bodies apart, softened while either is
/// cooling down after a reaction.
fn collide(
    world: &mut World,
    i: usize,
    j: usize,
    normal: &Vec3,
    overlap: f64,
    ctx: &TickContext<'_>,
) {
    let cfg = &ctx.config.forces;
    let (a, b) = world.pair_mut(i, j);
    let softening = 1.0 - 0.8 * a.cooldown.max(b.cooldown).clamp(0.0, 1.0);
    let rel_vel = vector::sub(&b.vel, &a.vel);
    let approach = vector::dot(&rel_vel, normal).min(0.0);
    let magnitude =
        (cfg.contact_stiffness * overlap - cfg.contact_damping * approach) * softening;
    if !magnitude.is_finite() {
        return;
    }
    vector::add_scaled(&mut a.force, normal, -magnitude);
    vector::add_scaled(&mut b.force, normal, magnitude);
}

/// Restitution impulse along the contact normal for an approaching pair.
fn bounce(world: &mut World, i: usize, j: usize, normal: &Vec3, ctx: &TickContext<'_>) {
    let restitution = ctx.config.integrator.restitution;
    let min_mass = ctx.config.integrator.min_mass;
    let (a, b) = world.pair_mut(i, j);
    let u_n = vector::dot(&vector::sub(&b.vel, &a.vel), normal);
    if u_n >= 0.0 {
        return;
    }
    let (ma, mb) = (a.mass.max(min_mass), b.mass.max(min_mass));
    let softening = 1.0 - 0.8 * a.cooldown.max(b.cooldown).clamp(0.0, 1.0);
    let impulse = -(1.0 + restitution) * u_n / (1.0 / ma + 1.0 / mb) * softening;
    vector::add_scaled(&mut a.vel, normal, -impulse / ma);
    vector::add_scaled(&mut b.vel, normal, impulse / mb);
}

/// Bond two touching atoms when chemistry allows and the approach is either
/// gentle or violent enough to force the bond.
fn try_form_bond(world: &mut World, i: usize, j: usize, ctx: &mut TickContext<'_>) -> bool {
    let (a, b) = (world.at(i), world.at(j));
    if !a.is_atom() || !b.is_atom() {
        return false;
    }
    let (ida, idb) = (a.id, b.id);
    let rel_speed = vector::norm(&vector::sub(&b.vel, &a.vel));
    let cfg = &ctx.config.reactions;
    if rel_speed >= cfg.bond_speed_max && rel_speed <= cfg.forced_bond_speed {
        return false;
    }
    if !bonds::can_form_bond(world, ida, idb, ctx.elements()) {
        return false;
    }
    let mid = vector::scale(&vector::add(&a.pos, &b.pos), 0.5);
    let (cooldown, now) = (cfg.reaction_cooldown, ctx.now);

    world.add_bond(ida, idb);
    {
        let (a, b) = world.pair_mut(i, j);
        a.mark_reacted(now, cooldown);
        b.mark_reacted(now, cooldown);
    }
    ctx.cancel_labels(ida);
    ctx.cancel_labels(idb);
    bonds::redistribute_charge(world, ida, ctx.sink);
    ctx.burst(mid, 0.6, "Bond formed");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditKind;
    use crate::core::body::{Body, BodyKind, Species};
    use crate::core::context::Harness;
    use crate::core::elements::ElementTable;
    use crate::core::vector::ZERO;
    use crate::error::Result;

    fn spawn(world: &mut World, species: Species, pos: Vec3, vel: Vec3) -> Result<usize> {
        let id = world.allocate_id();
        let body = Body::spawn(id, species, pos, vel, ElementTable::global()?, 0.0)?;
        world.insert(body);
        Ok(world.len() - 1)
    }

    #[test]
    fn sweep_finds_contact_inside_the_tick() {
        let t = sweep_contact(&[100.0, 0.0, 0.0], &[-200.0, 0.0, 0.0], 20.0)
            .expect("pair closes within the tick");
        assert!((t - 0.4).abs() < 1e-12);
        assert!(sweep_contact(&[100.0, 0.0, 0.0], &[200.0, 0.0, 0.0], 20.0).is_none());
        assert!(sweep_contact(&[100.0, 0.0, 0.0], &[-50.0, 0.0, 0.0], 20.0).is_none());
    }

    #[test]
    fn fast_leptons_meet_within_one_tick() -> Result<()> {
        let mut h = Harness::new(7);
        let mut w = World::new();
        spawn(&mut w, Species::Electron, [-20.0, 0.0, 0.0], [1500.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Positron, [20.0, 0.0, 0.0], [-1500.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 60.0);
        resolve_all(&mut w, &mut ctx);
        assert!(w.iter().all(|b| b.is_photon()));
        assert_eq!(h.audit.count(AuditKind::Destroy, "Annihilation"), 2);
        Ok(())
    }

    #[test]
    fn fast_atoms_are_stopped_at_contact() -> Result<()> {
        let mut h = Harness::new(7);
        let mut w = World::new();
        spawn(&mut w, Species::Element(10), [-100.0, 0.0, 0.0], [3000.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Element(10), [100.0, 0.0, 0.0], [-3000.0, 0.0, 0.0])?;
        let contact = w.at(0).radius + w.at(1).radius;
        let mut ctx = h.ctx(1.0 / 60.0);
        resolve_all(&mut w, &mut ctx);
        let (a, b) = (w.at(0), w.at(1));
        assert!((vector::distance(&a.pos, &b.pos) - contact).abs() < 1e-6);
        assert!(a.vel[0] < 0.0 && b.vel[0] > 0.0);
        Ok(())
    }

    #[test]
    fn slow_distant_pair_is_not_swept() -> Result<()> {
        let mut h = Harness::new(7);
        let mut w = World::new();
        spawn(&mut w, Species::Element(10), [-100.0, 0.0, 0.0], [30.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Element(10), [100.0, 0.0, 0.0], [-30.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 60.0);
        resolve_all(&mut w, &mut ctx);
        assert_eq!(w.at(0).pos, [-100.0, 0.0, 0.0]);
        assert_eq!(w.at(0).vel, [30.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn snapped_bond_releases_the_pair() -> Result<()> {
        let mut h = Harness::new(7);
        let mut w = World::new();
        spawn(&mut w, Species::Element(1), ZERO, ZERO)?;
        spawn(&mut w, Species::Element(1), [600.0, 0.0, 0.0], ZERO)?;
        let (a, b) = (w.at(0).id, w.at(1).id);
        w.add_bond(a, b);
        let mut ctx = h.ctx(1.0 / 240.0);
        resolve_all(&mut w, &mut ctx);
        assert!(!w.are_bonded(a, b));
        assert!(h
            .effects
            .iter()
            .any(|e| matches!(e, crate::core::context::Effect::Burst { reason: "Bond snapped", .. })));
        Ok(())
    }

    #[test]
    fn touching_electron_positron_annihilate_into_photons() -> Result<()> {
        let mut h = Harness::new(7);
        let mut w = World::new();
        spawn(&mut w, Species::Electron, [-10.0, 0.0, 0.0], [50.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Positron, [10.0, 0.0, 0.0], [-50.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 240.0);
        resolve_all(&mut w, &mut ctx);
        assert_eq!(w.len(), 2);
        assert!(w.iter().all(|b| matches!(b.kind, BodyKind::Photon)));
        assert_eq!(h.audit.count(AuditKind::Destroy, "Annihilation"), 2);
        assert_eq!(h.audit.count(AuditKind::Create, "Annihilation photon"), 2);
        Ok(())
    }

    #[test]
    fn proton_captures_electron_into_hydrogen() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        spawn(&mut w, Species::Proton, ZERO, ZERO)?;
        spawn(&mut w, Species::Electron, [20.0, 0.0, 0.0], ZERO)?;
        let mut ctx = h.ctx(1.0 / 240.0);
        resolve_all(&mut w, &mut ctx);
        assert_eq!(w.len(), 1);
        let hydrogen = w.at(0);
        assert_eq!(hydrogen.atomic_number(), Some(1));
        assert!(hydrogen.is_atom());
        assert_eq!(hydrogen.charge, 0.0);
        Ok(())
    }

    #[test]
    fn neutron_capture_makes_deuteron() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        spawn(&mut w, Species::Proton, ZERO, [20.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Neutron, [40.0, 0.0, 0.0], [-20.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 240.0);
        resolve_all(&mut w, &mut ctx);
        assert_eq!(w.len(), 1);
        let d = w.at(0);
        assert!(d.mass >= 1.9);
        assert_eq!(d.charge, 1.0);
        assert!(d.radius >= 30.0);
        assert_eq!(d.label(ElementTable::global()?), "H-2");
        Ok(())
    }

    #[test]
    fn gentle_hydrogen_contact_forms_bond() -> Result<()> {
        let mut h = Harness::new(3);
        let mut w = World::new();
        spawn(&mut w, Species::Element(1), ZERO, [5.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Element(1), [50.0, 0.0, 0.0], [-5.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 240.0);
        resolve_all(&mut w, &mut ctx);
        let (a, b) = (w.at(0).id, w.at(1).id);
        assert!(w.are_bonded(a, b));
        assert!(w.bonds_symmetric());
        Ok(())
    }

    #[test]
    fn medium_speed_contact_bounces_without_bond() -> Result<()> {
        let mut h = Harness::new(3);
        let mut w = World::new();
        spawn(&mut w, Species::Element(1), ZERO, [200.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Element(1), [50.0, 0.0, 0.0], [-200.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 240.0);
        resolve_all(&mut w, &mut ctx);
        let (a, b) = (w.at(0), w.at(1));
        assert!(!w.are_bonded(a.id, b.id));
        assert!(a.vel[0] < 0.0 && b.vel[0] > 0.0);
        Ok(())
    }

    #[test]
    fn like_charges_repel() -> Result<()> {
        let mut h = Harness::new(3);
        let mut w = World::new();
        spawn(&mut w, Species::Proton, ZERO, ZERO)?;
        spawn(&mut w, Species::Proton, [200.0, 0.0, 0.0], ZERO)?;
        let mut ctx = h.ctx(1.0 / 240.0);
        resolve_all(&mut w, &mut ctx);
        assert!(w.at(0).force[0] < 0.0);
        assert!(w.at(1).force[0] > 0.0);
        Ok(())
    }
}
