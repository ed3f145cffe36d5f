//! Pair production from photon energy and hadronization of quark triplets.

use crate::core::body::{BodyId, BodyKind, QuarkFlavor, Species};
use crate::core::context::{Effect, TickContext};
use crate::core::lifecycle;
use crate::core::nuclear::random_direction;
use crate::core::vector::{self, Vec3};
use crate::core::world::World;

/// A particle/antiparticle pair and the photon energy (MeV) needed to make it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairChannel {
    pub particle: Species,
    pub antiparticle: Species,
    pub threshold: f64,
}

/// Channels sorted by threshold.
pub const PAIR_CHANNELS: [PairChannel; 3] = [
    PairChannel {
        particle: Species::Electron,
        antiparticle: Species::Positron,
        threshold: 1.022,
    },
    PairChannel {
        particle: Species::UP,
        antiparticle: Species::ANTI_UP,
        threshold: 4.4,
    },
    PairChannel {
        particle: Species::DOWN,
        antiparticle: Species::ANTI_DOWN,
        threshold: 9.4,
    },
];

/// The channel whose threshold is nearest to `energy`, if within `tolerance`
/// (relative).
pub fn match_channel(energy: f64, tolerance: f64) -> Option<&'static PairChannel> {
    if !energy.is_finite() || energy <= 0.0 {
        return None;
    }
    PAIR_CHANNELS
        .iter()
        .map(|c| (((energy - c.threshold) / c.threshold).abs(), c))
        .filter(|(rel, _)| *rel <= tolerance)
        .min_by(|(x, _), (y, _)| x.total_cmp(y))
        .map(|(_, c)| c)
}

/// Convert a photon of `energy` at `pos` into a back-to-back pair.
///
/// `on_discover` is called with the symbol of each produced species. Returns
/// the created ids (empty when no threshold matches).
pub fn pair_production(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    pos: Vec3,
    energy: f64,
    on_discover: &mut dyn FnMut(&str),
) -> Vec<BodyId> {
    let Some(channel) = match_channel(energy, ctx.config.nuclear.pair_tolerance) else {
        return Vec::new();
    };
    let nuclear = &ctx.config.nuclear;
    let (speed, offset) = (nuclear.pair_speed, nuclear.pair_offset);

    // Pairs stay in the XY plane of the view.
    let mut axis = random_direction(ctx.rng);
    axis[2] = 0.0;
    let axis = vector::normalized(&axis).unwrap_or([1.0, 0.0, 0.0]);

    let mut created = Vec::with_capacity(2);
    for (species, sign) in [(channel.particle, 1.0), (channel.antiparticle, -1.0)] {
        let p = vector::add(&pos, &vector::scale(&axis, sign * offset));
        let v = vector::scale(&axis, sign * speed);
        let Some(id) = lifecycle::spawn(world, ctx, species, p, v, "Pair production") else {
            continue;
        };
        let Some(symbol) = world.get(id).map(|b| b.symbol(ctx.elements())) else {
            continue;
        };
        on_discover(&symbol);
        ctx.effects.push(Effect::Discovery { pos: p, symbol });
        created.push(id);
    }
    ctx.burst(pos, 1.2, "Pair production");
    created
}

/// Pull nearby quark triplets together and turn tight ones into nucleons.
///
/// `uud` becomes a proton and `udd` a neutron, created at the triplet's
/// center of momentum. Antiquarks never hadronize.
pub fn hadronize(world: &mut World, ctx: &mut TickContext<'_>) {
    let quarks: Vec<(BodyId, QuarkFlavor, Vec3)> = world
        .iter()
        .filter(|b| !b.is_assembling())
        .filter_map(|b| match b.kind {
            BodyKind::Quark {
                flavor,
                anti: false,
            } => Some((b.id, flavor, b.pos)),
            _ => None,
        })
        .collect();
    if quarks.len() < 3 {
        return;
    }

    let radius = ctx.config.nuclear.hadron_radius;
    let mut used: Vec<BodyId> = Vec::new();
    for (n, &(id, _, pos)) in quarks.iter().enumerate() {
        if used.contains(&id) {
            continue;
        }
        let mut near: Vec<(f64, usize)> = quarks
            .iter()
            .enumerate()
            .filter(|&(m, (other, _, _))| m != n && !used.contains(other))
            .map(|(m, (_, _, p))| (vector::distance(&pos, p), m))
            .filter(|(d, _)| *d <= radius)
            .collect();
        near.sort_by(|x, y| x.0.total_cmp(&y.0));

        let Some((m1, m2, species)) = pick_triplet(&quarks, n, &near) else {
            continue;
        };
        let triplet = [id, quarks[m1].0, quarks[m2].0];
        used.extend_from_slice(&triplet);
        bind_triplet(world, ctx, triplet, species);
    }
}

// ============ Internal helpers ============

fn nucleon_for(flavors: [QuarkFlavor; 3]) -> Option<Species> {
    let ups = flavors.iter().filter(|&&f| f == QuarkFlavor::Up).count();
    match ups {
        2 => Some(Species::Proton),
        1 => Some(Species::Neutron),
        _ => None,
    }
}

/// Closest pair of neighbours that completes a nucleon with quark `n`.
fn pick_triplet(
    quarks: &[(BodyId, QuarkFlavor, Vec3)],
    n: usize,
    near: &[(f64, usize)],
) -> Option<(usize, usize, Species)> {
    let mut best: Option<(f64, usize, usize, Species)> = None;
    for (k, &(d1, m1)) in near.iter().enumerate() {
        for &(d2, m2) in &near[k + 1..] {
            let Some(species) = nucleon_for([quarks[n].1, quarks[m1].1, quarks[m2].1]) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| d1 + d2 < b.0) {
                best = Some((d1 + d2, m1, m2, species));
            }
        }
    }
    best.map(|(_, m1, m2, s)| (m1, m2, s))
}

fn bind_triplet(
    world: &mut World,
    ctx: &mut TickContext<'_>,
    triplet: [BodyId; 3],
    species: Species,
) {
    let members: Vec<(f64, Vec3, Vec3)> = triplet
        .iter()
        .filter_map(|&id| world.get(id).map(|b| (b.mass, b.pos, b.vel)))
        .collect();
    if members.len() != 3 {
        return;
    }
    let center = vector::weighted_mean(members.iter().map(|m| (m.0, m.1)));
    let drift = vector::weighted_mean(members.iter().map(|m| (m.0, m.2)));
    let spread = members
        .iter()
        .map(|m| vector::distance(&m.1, &center))
        .fold(0.0, f64::max);

    if spread > ctx.config.nuclear.hadron_fusion_distance {
        let step = (ctx.config.nuclear.hadron_pull * ctx.dt).min(1.0);
        for &id in &triplet {
            if let Some(b) = world.get_mut(id) {
                let toward = vector::sub(&center, &b.pos);
                vector::add_scaled(&mut b.pos, &toward, step);
                b.vel = drift;
            }
        }
        return;
    }

    for &id in &triplet {
        lifecycle::destroy(world, ctx, id, "Hadronization");
    }
    lifecycle::spawn(world, ctx, species, center, drift, "Hadronization");
    ctx.burst(center, 1.0, "Hadronization");
}
