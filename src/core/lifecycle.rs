//! Audited creation, destruction and transmutation of bodies.
//!
//! Every path that changes which bodies exist goes through here so the audit
//! log stays the complete record of the world's population.

use crate::core::body::{Body, BodyId, BodyKind, Species};
use crate::core::bonds;
use crate::core::context::TickContext;
use crate::core::diagnostics::DiagnosticKind;
use crate::core::vector::Vec3;
use crate::core::world::World;

/// Create and insert a body, logging a `Create` event.
///
/// Returns `None` (with a diagnostic) if the species cannot be built.
pub fn spawn(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    species: Species,
    pos: Vec3,
    vel: Vec3,
    reason: &str,
) -> Option<BodyId> {
    let id = world.allocate_id();
    match Body::spawn(id, species, pos, vel, ctx.elements(), ctx.now) {
        Ok(body) => {
            ctx.log_create(&body, reason);
            Some(world.insert(body))
        }
        Err(e) => {
            ctx.diagnose(
                DiagnosticKind::MissingData,
                None,
                format!("could not create {species:?}: {e}"),
            );
            None
        }
    }
}

/// Insert an already-built body, logging a `Create` event.
pub fn insert(world: &mut World, ctx: &mut TickContext<'_>, body: Body, reason: &str) -> BodyId {
    ctx.log_create(&body, reason);
    world.insert(body)
}

/// Remove a body, log a `Destroy` event and rebalance charge on former partners.
pub fn destroy(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    id: BodyId,
    reason: &str,
) -> Option<Body> {
    let body = world.remove(id)?;
    ctx.log_destroy(&body, reason);
    ctx.cancel_labels(id);
    let mut partners = body.bonds.clone();
    partners.sort();
    partners.dedup();
    for p in partners {
        ctx.cancel_labels(p);
        bonds::redistribute_charge(world, p, ctx.sink);
    }
    Some(body)
}

/// Change a body's species in place, keeping its id, position and every
/// bond the new species can still hold.
///
/// Logged as a `Destroy` of the old label followed by a `Create` of the new one,
/// both carrying `reason`.
pub fn transmute(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    id: BodyId,
    kind: BodyKind,
    mass: f64,
    reason: &str,
) -> bool {
    let cooldown = ctx.config.reactions.reaction_cooldown;
    let now = ctx.now;
    let Some(body) = world.get_mut(id) else {
        return false;
    };
    ctx.log_destroy(body, reason);
    body.kind = kind;
    body.mass = mass;
    body.refresh_radius();
    body.mark_reacted(now, cooldown);
    body.last_decay_check = now;
    ctx.log_create(body, reason);
    bonds::revalidate(world, id, ctx);
    true
}
