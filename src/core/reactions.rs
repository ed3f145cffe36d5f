//! Contact reactions checked, in priority order, for unbonded touching pairs:
//! annihilation, positron capture by a bound electron, electron capture and
//! neutron capture.
//!
//! Each check returns `None` when it does not apply to the pair, or the
//! [`PairOutcome`] telling the resolver which of the two indices were removed.

use crate::core::body::{AtomState, BodyKind, LeptonKind, NucleonKind, Species, NEUTRON_MASS};
use crate::core::bonds;
use crate::core::context::TickContext;
use crate::core::elements::{DecayMode, Isotope, MAX_Z};
use crate::core::lifecycle;
use crate::core::vector::{self, Vec3};
use crate::core::world::World;

/// What happened to the two bodies of a pair during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// Both bodies still exist at their indices.
    Continue,
    /// The body at the lower index was removed.
    RemovedFirst,
    /// The body at the higher index was removed.
    RemovedSecond,
    RemovedBoth,
}

impl PairOutcome {
    fn removed(first: bool) -> Self {
        if first {
            PairOutcome::RemovedFirst
        } else {
            PairOutcome::RemovedSecond
        }
    }
}

/// Matter meets its antiparticle: both vanish into two photons.
pub fn try_annihilation(
    world: &mut World,
    i: usize,
    j: usize,
    normal: &Vec3,
    ctx: &mut TickContext<'_>,
) -> Option<PairOutcome> {
    let (a, b) = (world.at(i), world.at(j));
    let opposite = match (&a.kind, &b.kind) {
        (BodyKind::Lepton(x), BodyKind::Lepton(y)) => x != y,
        (
            BodyKind::Quark {
                flavor: fa,
                anti: aa,
            },
            BodyKind::Quark {
                flavor: fb,
                anti: ab,
            },
        ) => fa == fb && aa != ab,
        _ => false,
    };
    if !opposite {
        return None;
    }

    let (ida, idb) = (a.id, b.id);
    let mid = vector::weighted_mean([(1.0, a.pos), (1.0, b.pos)]);
    let drift = vector::weighted_mean([(a.mass, a.vel), (b.mass, b.vel)]);
    // Higher index first so the lower index stays valid.
    lifecycle::destroy(world, ctx, idb, "Annihilation");
    lifecycle::destroy(world, ctx, ida, "Annihilation");

    let dir = vector::perpendicular(normal);
    let speed = ctx.config.reactions.photon_speed;
    for sign in [1.0, -1.0] {
        let vel = vector::add(&drift, &vector::scale(&dir, sign * speed));
        lifecycle::spawn(world, ctx, Species::Photon, mid, vel, "Annihilation photon");
    }
    ctx.burst(mid, 1.5, "Annihilation");
    Some(PairOutcome::RemovedBoth)
}

/// A positron meets an atom that still has electrons: one electron is
/// annihilated and the atom is ionized.
pub fn try_positron_capture(
    world: &mut World,
    i: usize,
    j: usize,
    ctx: &mut TickContext<'_>,
) -> Option<PairOutcome> {
    let (a, b) = (world.at(i), world.at(j));
    let (positron_first, atom) = match (&a.kind, &b.kind) {
        (BodyKind::Lepton(LeptonKind::Positron), BodyKind::Atom(_)) => (true, b),
        (BodyKind::Atom(_), BodyKind::Lepton(LeptonKind::Positron)) => (false, a),
        _ => return None,
    };
    let z = atom.atom().map(|s| s.z)? as f64;
    if atom.charge > z - 1.0 + 1e-6 {
        // Fully ionized: no bound electron left.
        return None;
    }
    let (positron, atom) = if positron_first { (a, b) } else { (b, a) };
    let (pid, aid, site) = (positron.id, atom.id, atom.pos);

    lifecycle::destroy(world, ctx, pid, "Positron annihilation");
    let cooldown = ctx.config.reactions.reaction_cooldown;
    let now = ctx.now;
    if let Some(body) = world.get_mut(aid) {
        body.charge += 1.0;
        body.mark_reacted(now, cooldown);
    }
    bonds::redistribute_charge(world, aid, ctx.sink);
    ctx.burst(site, 1.0, "Ionization");
    Some(PairOutcome::removed(positron_first))
}

/// An electron meets a positive ion or bare proton and is absorbed.
pub fn try_electron_capture(
    world: &mut World,
    i: usize,
    j: usize,
    ctx: &mut TickContext<'_>,
) -> Option<PairOutcome> {
    let (a, b) = (world.at(i), world.at(j));
    let electron_first = match (&a.kind, &b.kind) {
        (BodyKind::Lepton(LeptonKind::Electron), _) => true,
        (_, BodyKind::Lepton(LeptonKind::Electron)) => false,
        _ => return None,
    };
    let (electron, target) = if electron_first { (a, b) } else { (b, a) };
    let bare_proton = matches!(target.kind, BodyKind::Nucleon(NucleonKind::Proton));
    let positive_atom = target.is_atom() && target.charge > 1e-6;
    if !bare_proton && !positive_atom {
        return None;
    }
    let (eid, tid, site) = (electron.id, target.id, target.pos);
    let merged_vel =
        vector::weighted_mean([(electron.mass, electron.vel), (target.mass, target.vel)]);
    let h = ctx.elements().get(1).map(|el| el.isotopes[0].mass)?;

    lifecycle::destroy(world, ctx, eid, "Electron capture");
    if bare_proton {
        let kind = BodyKind::Atom(AtomState {
            z: 1,
            isotope: 0,
            synthetic: None,
        });
        lifecycle::transmute(world, ctx, tid, kind, h, "Electron capture");
        if let Some(body) = world.get_mut(tid) {
            body.charge = 0.0;
            body.vel = merged_vel;
        }
    } else {
        let cooldown = ctx.config.reactions.reaction_cooldown;
        let now = ctx.now;
        if let Some(body) = world.get_mut(tid) {
            body.charge -= 1.0;
            body.vel = merged_vel;
            body.mark_reacted(now, cooldown);
        }
    }
    bonds::redistribute_charge(world, tid, ctx.sink);
    ctx.burst(site, 0.8, "Electron capture");
    Some(PairOutcome::removed(electron_first))
}

/// A free neutron is absorbed by a proton (forming a deuteron) or by an atom
/// (raising its mass number by one).
///
/// When the heavier isotope is not tabulated the atom receives a synthetic,
/// neutron-rich isotope that beta-decays.
pub fn try_neutron_capture(
    world: &mut World,
    i: usize,
    j: usize,
    ctx: &mut TickContext<'_>,
) -> Option<PairOutcome> {
    let (a, b) = (world.at(i), world.at(j));
    let is_neutron = |k: &BodyKind| matches!(k, BodyKind::Nucleon(NucleonKind::Neutron));
    let neutron_first = if is_neutron(&a.kind) && !is_neutron(&b.kind) {
        true
    } else if is_neutron(&b.kind) && !is_neutron(&a.kind) {
        false
    } else {
        return None;
    };
    let (neutron, target) = if neutron_first { (a, b) } else { (b, a) };
    let elements = ctx.elements();

    let (kind, mass, charge) = match &target.kind {
        BodyKind::Nucleon(NucleonKind::Proton) => {
            let el = elements.get(1)?;
            let idx = el.isotope_index(2)?;
            let kind = BodyKind::Atom(AtomState {
                z: 1,
                isotope: idx,
                synthetic: None,
            });
            (kind, el.isotopes[idx].mass, target.charge)
        }
        BodyKind::Atom(state) => {
            let el = elements.get(state.z)?;
            let a_now = state.isotope(el)?.mass_number;
            let a_next = a_now + 1;
            match el.isotope_index(a_next) {
                Some(idx) => {
                    let kind = BodyKind::Atom(AtomState {
                        z: state.z,
                        isotope: idx,
                        synthetic: None,
                    });
                    (kind, el.isotopes[idx].mass, target.charge)
                }
                None => {
                    let mass = target.mass + NEUTRON_MASS;
                    let (mode, daughter) = if state.z < MAX_Z {
                        (DecayMode::BetaMinus, Some([state.z + 1, a_next]))
                    } else {
                        (DecayMode::Fission, None)
                    };
                    let synthetic = Isotope {
                        mass_number: a_next,
                        mass,
                        half_life: Some(ctx.config.nuclear.synthetic_half_life),
                        mode: Some(mode),
                        daughter,
                    };
                    let kind = BodyKind::Atom(AtomState {
                        z: state.z,
                        isotope: state.isotope,
                        synthetic: Some(synthetic),
                    });
                    (kind, mass, target.charge)
                }
            }
        }
        _ => return None,
    };

    let (nid, tid, site) = (neutron.id, target.id, target.pos);
    let merged_vel =
        vector::weighted_mean([(neutron.mass, neutron.vel), (target.mass, target.vel)]);
    lifecycle::destroy(world, ctx, nid, "Neutron capture");
    lifecycle::transmute(world, ctx, tid, kind, mass, "Neutron capture");
    if let Some(body) = world.get_mut(tid) {
        body.charge = charge;
        body.vel = merged_vel;
    }
    bonds::redistribute_charge(world, tid, ctx.sink);
    ctx.burst(site, 1.0, "Neutron capture");
    Some(PairOutcome::removed(neutron_first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditKind;
    use crate::core::body::Body;
    use crate::core::context::{Effect, Harness};
    use crate::core::elements::ElementTable;
    use crate::core::vector::ZERO;
    use crate::error::Result;

    fn spawn(world: &mut World, species: Species, pos: Vec3) -> Result<usize> {
        let id = world.allocate_id();
        let body = Body::spawn(id, species, pos, ZERO, ElementTable::global()?, 0.0)?;
        world.insert(body);
        Ok(world.len() - 1)
    }

    #[test]
    fn positron_ionizes_an_atom_with_electrons() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        spawn(&mut w, Species::Element(8), ZERO)?;
        spawn(&mut w, Species::Positron, [40.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 240.0);
        let outcome = try_positron_capture(&mut w, 0, 1, &mut ctx);
        assert_eq!(outcome, Some(PairOutcome::RemovedSecond));
        assert_eq!(w.len(), 1);
        assert_eq!(w.at(0).charge, 1.0);
        assert_eq!(h.audit.count(AuditKind::Destroy, "Positron annihilation"), 1);
        assert!(h
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Burst { reason: "Ionization", .. })));
        Ok(())
    }

    #[test]
    fn bare_nucleus_ignores_positron() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        spawn(&mut w, Species::Positron, [-30.0, 0.0, 0.0])?;
        let hydrogen = spawn(&mut w, Species::Element(1), ZERO)?;
        w.at_mut(hydrogen).charge = 1.0;
        let mut ctx = h.ctx(1.0 / 240.0);
        assert_eq!(try_positron_capture(&mut w, 0, 1, &mut ctx), None);
        assert_eq!(w.len(), 2);
        Ok(())
    }

    #[test]
    fn neutron_capture_climbs_to_tabulated_isotope() -> Result<()> {
        let elements = ElementTable::global()?;
        let mut h = Harness::new(1);
        let mut w = World::new();
        spawn(&mut w, Species::Element(8), ZERO)?;
        spawn(&mut w, Species::Neutron, [40.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 240.0);
        let outcome = try_neutron_capture(&mut w, 0, 1, &mut ctx);
        assert_eq!(outcome, Some(PairOutcome::RemovedSecond));
        let o = w.at(0);
        assert_eq!(o.label(elements), "O-17");
        assert!(o.atom().is_some_and(|a| a.synthetic.is_none()));
        Ok(())
    }

    #[test]
    fn neutron_capture_past_the_table_makes_synthetic_isotope() -> Result<()> {
        let elements = ElementTable::global()?;
        let mut h = Harness::new(1);
        let mut w = World::new();
        spawn(&mut w, Species::Neutron, [-40.0, 0.0, 0.0])?;
        spawn(&mut w, Species::Element(9), ZERO)?;
        let fluorine_mass = w.at(1).mass;
        let mut ctx = h.ctx(1.0 / 240.0);
        let outcome = try_neutron_capture(&mut w, 0, 1, &mut ctx);
        assert_eq!(outcome, Some(PairOutcome::RemovedFirst));
        let f = w.at(0);
        assert_eq!(f.atomic_number(), Some(9));
        assert_eq!(f.mass_number(elements), Some(20));
        assert!((f.mass - (fluorine_mass + NEUTRON_MASS)).abs() < 1e-12);
        let iso = f
            .atom()
            .and_then(|a| a.synthetic.clone())
            .expect("synthetic isotope");
        assert_eq!(iso.mode, Some(DecayMode::BetaMinus));
        assert_eq!(iso.daughter, Some([10, 20]));
        assert_eq!(iso.half_life, Some(h.config.nuclear.synthetic_half_life));
        Ok(())
    }
}
