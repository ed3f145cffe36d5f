//! Semi-implicit Euler integration with the arena's damping regimes.
//!
//! Photons fly straight; assembling groups are heavily damped until released;
//! everything else gets clamped acceleration, drag or cooldown damping, a speed
//! cap, a Z restoring spring per bonded group and bounded walls.

use crate::core::body::BodyId;
use crate::core::context::{Effect, TickContext};
use crate::core::diagnostics::DiagnosticKind;
use crate::core::lifecycle;
use crate::core::vector::{self, ZERO};
use crate::core::world::World;
use std::collections::HashMap;

/// Advance every body by `ctx.dt` and reset force accumulators.
pub fn integrate(world: &mut World, ctx: &mut TickContext<'_>) {
    rescue_state(world, ctx);
    move_photons(world, ctx);
    release_settled_groups(world, ctx);

    let z_pull = group_z_pull(world, ctx);
    let dt = ctx.dt;
    let cfg = &ctx.config.integrator;
    let half = ctx.config.world.half_extents;
    let assembling_keep = ctx.config.assembly.assembling_damping.powf(dt);

    for b in world.bodies_mut() {
        if b.is_photon() {
            continue;
        }
        let mut accel = vector::scale(&b.force, 1.0 / b.mass.max(cfg.min_mass));
        accel = vector::clamp_magnitude(&accel, cfg.max_accel);
        b.force = ZERO;

        if b.is_assembling() {
            vector::add_scaled(&mut b.vel, &accel, dt);
            b.vel = vector::scale(&b.vel, assembling_keep);
            b.assembly.countdown -= dt;
            let vel = b.vel;
            vector::add_scaled(&mut b.pos, &vel, dt);
            continue;
        }

        vector::add_scaled(&mut b.vel, &accel, dt);
        if let Some(&pull) = z_pull.get(&b.id) {
            b.vel[2] += pull * dt;
        }
        let rate = if b.cooldown > 0.0 {
            cfg.drag + cfg.cooldown_damping * b.cooldown
        } else {
            cfg.drag
        };
        b.vel = vector::scale(&b.vel, (-rate * dt).exp());
        b.vel = vector::clamp_magnitude(&b.vel, cfg.max_speed);
        b.cooldown = (b.cooldown - dt / cfg.cooldown_duration.max(1e-9)).max(0.0);

        let vel = b.vel;
        vector::add_scaled(&mut b.pos, &vel, dt);

        for k in 0..2 {
            let limit = (half[k] - b.radius).max(0.0);
            if b.pos[k] > limit {
                b.pos[k] = limit;
                if b.vel[k] > 0.0 {
                    b.vel[k] = -b.vel[k] * cfg.restitution;
                }
            } else if b.pos[k] < -limit {
                b.pos[k] = -limit;
                if b.vel[k] < 0.0 {
                    b.vel[k] = -b.vel[k] * cfg.restitution;
                }
            }
        }
        let z_limit = (half[2] - b.radius).max(0.0);
        if b.pos[2].abs() > z_limit {
            b.pos[2] = b.pos[2].clamp(-z_limit, z_limit);
            b.vel[2] = 0.0;
        }
    }
}

// ============ Internal helpers ============

/// Zero non-finite forces and velocities, recentre non-finite positions and
/// clamp non-positive masses.
fn rescue_state(world: &mut World, ctx: &mut TickContext<'_>) {
    let safe = ctx.config.world.safe_position;
    let min_mass = ctx.config.integrator.min_mass;
    let mut reports: Vec<(DiagnosticKind, BodyId, &'static str)> = Vec::new();
    for b in world.bodies_mut() {
        if !vector::is_finite(&b.force) {
            b.force = ZERO;
            reports.push((DiagnosticKind::NumericalRescue, b.id, "non-finite force zeroed"));
        }
        if !vector::is_finite(&b.vel) {
            b.vel = ZERO;
            reports.push((DiagnosticKind::NumericalRescue, b.id, "non-finite velocity zeroed"));
        }
        if !vector::is_finite(&b.pos) {
            b.pos = safe;
            b.vel = ZERO;
            reports.push((DiagnosticKind::NumericalRescue, b.id, "non-finite position recentred"));
        }
        if !b.charge.is_finite() {
            b.charge = 0.0;
            reports.push((DiagnosticKind::NumericalRescue, b.id, "non-finite charge zeroed"));
        }
        if !b.is_photon() && !(b.mass.is_finite() && b.mass > 0.0) {
            b.mass = min_mass;
            reports.push((DiagnosticKind::StateClamp, b.id, "non-positive mass clamped"));
        }
    }
    for (kind, id, msg) in reports {
        ctx.diagnose(kind, Some(id), msg);
    }
}

/// Photons ignore forces and are removed once they leave the arena.
fn move_photons(world: &mut World, ctx: &mut TickContext<'_>) {
    let dt = ctx.dt;
    let half = ctx.config.world.half_extents;
    let margin = ctx.config.world.photon_escape_margin;
    let mut escaped: Vec<BodyId> = Vec::new();
    for b in world.bodies_mut() {
        if !b.is_photon() {
            continue;
        }
        let vel = b.vel;
        vector::add_scaled(&mut b.pos, &vel, dt);
        b.force = ZERO;
        if (0..3).any(|k| b.pos[k].abs() > half[k] + margin) {
            escaped.push(b.id);
        }
    }
    for id in escaped {
        lifecycle::destroy(world, ctx, id, "Escaped");
    }
}

/// Release assembling groups whose members have settled or timed out.
///
/// Released members get their ejection velocity back and a release cue is
/// queued at the group's centroid.
fn release_settled_groups(world: &mut World, ctx: &mut TickContext<'_>) {
    let tension = ctx.config.assembly.release_tension;
    let mut visited: Vec<BodyId> = Vec::new();
    let mut ready: Vec<Vec<BodyId>> = Vec::new();
    for b in world.iter().filter(|b| b.is_assembling()) {
        if visited.contains(&b.id) {
            continue;
        }
        let group: Vec<BodyId> = world
            .connected_group(b.id)
            .into_iter()
            .filter(|&m| world.get(m).is_some_and(|x| x.is_assembling()))
            .collect();
        visited.extend_from_slice(&group);
        let members = || group.iter().filter_map(|&m| world.get(m));
        let relaxed = members().all(|m| vector::norm(&m.force) < tension);
        let expired = members().any(|m| m.assembly.countdown <= 0.0);
        if relaxed || expired {
            ready.push(group);
        }
    }

    for group in ready {
        let center = world.centroid(&group);
        for &id in &group {
            if let Some(b) = world.get_mut(id) {
                b.assembly.active = false;
                b.vel = b.assembly.ejection;
                b.assembly.countdown = 0.0;
            }
        }
        ctx.effects.push(Effect::ReleaseCue {
            pos: center,
            bodies: group,
        });
    }
}

/// Z velocity change per second for each free body: minus `z_restoring` times
/// its bonded group's mean Z.
fn group_z_pull(world: &World, ctx: &TickContext<'_>) -> HashMap<BodyId, f64> {
    let k = ctx.config.integrator.z_restoring;
    let mut out = HashMap::new();
    for group in world.components() {
        let members: Vec<f64> = group
            .iter()
            .filter_map(|&id| world.get(id))
            .filter(|b| !b.is_photon() && !b.is_assembling())
            .map(|b| b.pos[2])
            .collect();
        if members.is_empty() {
            continue;
        }
        let mean_z = members.iter().sum::<f64>() / members.len() as f64;
        for id in group {
            out.insert(id, -k * mean_z);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::body::{Body, Species};
    use crate::core::context::Harness;
    use crate::core::elements::ElementTable;
    use crate::core::vector::Vec3;
    use crate::error::Result;

    fn spawn(world: &mut World, species: Species, pos: Vec3, vel: Vec3) -> Result<BodyId> {
        let id = world.allocate_id();
        let body = Body::spawn(id, species, pos, vel, ElementTable::global()?, 0.0)?;
        Ok(world.insert(body))
    }

    #[test]
    fn bounces_off_side_walls_with_restitution() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        let id = spawn(&mut w, Species::Element(1), [1159.0, 0.0, 0.0], [600.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 60.0);
        integrate(&mut w, &mut ctx);
        let b = w.get(id).expect("body");
        assert!(b.vel[0] < 0.0);
        assert!(b.pos[0] <= 1200.0 - b.radius + 1e-9);
        Ok(())
    }

    #[test]
    fn z_is_hard_clamped() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        let id = spawn(&mut w, Species::Electron, [0.0, 0.0, 280.0], [0.0, 0.0, 900.0])?;
        let mut ctx = h.ctx(1.0 / 60.0);
        integrate(&mut w, &mut ctx);
        let b = w.get(id).expect("body");
        assert!(b.pos[2] <= 300.0 - b.radius + 1e-9);
        assert_eq!(b.vel[2], 0.0);
        Ok(())
    }

    #[test]
    fn speed_is_capped() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        let id = spawn(&mut w, Species::Neutron, ZERO, [5000.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 240.0);
        integrate(&mut w, &mut ctx);
        let speed = w.get(id).map(|b| vector::norm(&b.vel)).unwrap_or(0.0);
        assert!(speed <= 1500.0 + 1e-9);
        Ok(())
    }

    #[test]
    fn non_finite_state_is_rescued() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        let id = spawn(&mut w, Species::Proton, ZERO, ZERO)?;
        if let Some(b) = w.get_mut(id) {
            b.pos = [f64::NAN, 0.0, 0.0];
            b.force = [f64::INFINITY, 0.0, 0.0];
        }
        let mut ctx = h.ctx(1.0 / 240.0);
        integrate(&mut w, &mut ctx);
        let b = w.get(id).expect("body");
        assert!(vector::is_finite(&b.pos) && vector::is_finite(&b.vel));
        assert_eq!(h.sink.count(DiagnosticKind::NumericalRescue), 2);
        Ok(())
    }

    #[test]
    fn photons_escape_and_are_logged() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        spawn(&mut w, Species::Photon, [1290.0, 0.0, 0.0], [900.0, 0.0, 0.0])?;
        let mut ctx = h.ctx(1.0 / 60.0);
        integrate(&mut w, &mut ctx);
        assert!(w.is_empty());
        assert_eq!(
            h.audit.count(crate::core::audit::AuditKind::Destroy, "Escaped"),
            1
        );
        Ok(())
    }

    #[test]
    fn settled_group_is_released_with_ejection() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        let a = spawn(&mut w, Species::Element(1), ZERO, ZERO)?;
        let b = spawn(&mut w, Species::Element(1), [72.0, 0.0, 0.0], ZERO)?;
        w.add_bond(a, b);
        for id in [a, b] {
            if let Some(body) = w.get_mut(id) {
                body.assembly.active = true;
                body.assembly.countdown = 1.0;
                body.assembly.ejection = [50.0, 0.0, 0.0];
            }
        }
        let mut ctx = h.ctx(1.0 / 240.0);
        integrate(&mut w, &mut ctx);
        assert!(w.iter().all(|b| !b.is_assembling()));
        assert!(h
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ReleaseCue { bodies, .. } if bodies.len() == 2)));
        Ok(())
    }

    #[test]
    fn group_z_drifts_back_toward_plane() -> Result<()> {
        let mut h = Harness::new(1);
        let mut w = World::new();
        let id = spawn(&mut w, Species::Element(8), [0.0, 0.0, 100.0], ZERO)?;
        let mut ctx = h.ctx(1.0 / 60.0);
        integrate(&mut w, &mut ctx);
        assert!(w.get(id).is_some_and(|b| b.vel[2] < 0.0 && b.pos[2] < 100.0));
        Ok(())
    }
}
