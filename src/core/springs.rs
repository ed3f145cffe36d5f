//! Bond spring-damper force model.

use crate::core::bonds;
use crate::core::context::TickContext;
use crate::core::diagnostics::DiagnosticKind;
use crate::core::vector::{self, Vec3};
use crate::core::world::World;

/// Rest length of a bond of the given order between bodies of radii `ra` and `rb`.
///
/// Higher orders pull the atoms closer: each extra order shortens the bond by
/// 12 % of the radius sum.
#[inline]
pub fn ideal_length(ra: f64, rb: f64, order: usize) -> f64 {
    let order = order.max(1) as f64;
    (ra + rb) * (0.9 - 0.12 * (order - 1.0))
}

/// Outcome of evaluating one bonded pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondOutcome {
    Held,
    Snapped,
}

/// Apply spring and damping forces to the bonded pair at indices `i`, `j`.
///
/// `normal` points from `i` to `j` and `dist` is their separation. A bond
/// stretched past `bond_snap_ratio` times its rest length snaps instead, unless
/// either endpoint is still cooling down from a reaction.
pub fn apply_bond_forces(
    world: &mut World,
    i: usize,
    j: usize,
    normal: &Vec3,
    dist: f64,
    ctx: &mut TickContext<'_>,
) -> BondOutcome {
    let config = ctx.config;
    let cfg = &config.forces;
    let (a, b) = world.pair_mut(i, j);
    let order = a.bond_order_with(b.id);
    let ideal = ideal_length(a.radius, b.radius, order);

    if dist > cfg.bond_snap_ratio * ideal && a.cooldown <= 0.0 && b.cooldown <= 0.0 {
        let (ida, idb) = (a.id, b.id);
        let mid = vector::scale(&vector::add(&a.pos, &b.pos), 0.5);
        world.remove_all_bonds(ida, idb);
        ctx.cancel_labels(ida);
        ctx.cancel_labels(idb);
        bonds::redistribute_charge(world, ida, ctx.sink);
        bonds::redistribute_charge(world, idb, ctx.sink);
        ctx.burst(mid, 0.5, "Bond snapped");
        ctx.diagnose(
            DiagnosticKind::Housekeeping,
            Some(ida),
            format!("bond to {idb} snapped at {dist:.1} (ideal {ideal:.1})"),
        );
        return BondOutcome::Snapped;
    }

    let stretch = dist - ideal;
    let spring = (cfg.bond_stiffness * stretch).clamp(-cfg.bond_max_force, cfg.bond_max_force);
    let rel_vel = vector::sub(&b.vel, &a.vel);
    let damping = cfg.bond_damping * vector::dot(&rel_vel, normal);
    let magnitude = spring + damping;
    if !magnitude.is_finite() {
        return BondOutcome::Held;
    }
    // Positive magnitude pulls the endpoints together.
    vector::add_scaled(&mut a.force, normal, magnitude);
    vector::add_scaled(&mut b.force, normal, -magnitude);
    BondOutcome::Held
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::body::{Body, BodyId, Species};
    use crate::core::context::Harness;
    use crate::core::elements::ElementTable;
    use crate::core::vector::ZERO;
    use crate::error::Result;

    /// Two bonded hydrogens `dist` apart along x.
    fn pair(dist: f64) -> Result<(World, BodyId, BodyId)> {
        let elements = ElementTable::global()?;
        let mut w = World::new();
        let mut ids = Vec::new();
        for x in [0.0, dist] {
            let id = w.allocate_id();
            let body = Body::spawn(id, Species::Element(1), [x, 0.0, 0.0], ZERO, elements, 0.0)?;
            ids.push(w.insert(body));
        }
        w.add_bond(ids[0], ids[1]);
        Ok((w, ids[0], ids[1]))
    }

    #[test]
    fn overstretched_bond_snaps() -> Result<()> {
        let mut h = Harness::new(1);
        let (mut w, a, b) = pair(400.0)?;
        let mut ctx = h.ctx(0.01);
        let outcome = apply_bond_forces(&mut w, 0, 1, &[1.0, 0.0, 0.0], 400.0, &mut ctx);
        assert_eq!(outcome, BondOutcome::Snapped);
        assert!(!w.are_bonded(a, b));
        assert_eq!(h.sink.count(DiagnosticKind::Housekeeping), 1);
        Ok(())
    }

    #[test]
    fn stretched_bond_below_snap_ratio_pulls_together() -> Result<()> {
        let mut h = Harness::new(1);
        let (mut w, a, b) = pair(300.0)?;
        let mut ctx = h.ctx(0.01);
        let outcome = apply_bond_forces(&mut w, 0, 1, &[1.0, 0.0, 0.0], 300.0, &mut ctx);
        assert_eq!(outcome, BondOutcome::Held);
        assert!(w.are_bonded(a, b));
        assert!(w.at(0).force[0] > 0.0 && w.at(1).force[0] < 0.0);
        Ok(())
    }

    #[test]
    fn cooling_bodies_do_not_snap() -> Result<()> {
        let mut h = Harness::new(1);
        let (mut w, a, b) = pair(400.0)?;
        w.at_mut(0).cooldown = 0.5;
        let mut ctx = h.ctx(0.01);
        let outcome = apply_bond_forces(&mut w, 0, 1, &[1.0, 0.0, 0.0], 400.0, &mut ctx);
        assert_eq!(outcome, BondOutcome::Held);
        assert!(w.are_bonded(a, b));
        Ok(())
    }

    #[test]
    fn ideal_length_shrinks_with_order() {
        let single = ideal_length(40.0, 55.0, 1);
        let double = ideal_length(40.0, 55.0, 2);
        let triple = ideal_length(40.0, 55.0, 3);
        assert!((single - 85.5).abs() < 1e-12);
        assert!(single > double && double > triple);
        assert!((double - 95.0 * 0.78).abs() < 1e-12);
    }

    #[test]
    fn order_zero_treated_as_single() {
        assert_eq!(ideal_length(10.0, 10.0, 0), ideal_length(10.0, 10.0, 1));
    }
}
