//! Force-directed 3D layout of a single molecule.
//!
//! Pure function of slot radii and recipe bonds; the assembly engine applies
//! the returned offsets around its placement center.

use crate::core::config::AssemblyConfig;
use crate::core::recipes::RecipeBond;
use crate::core::springs::ideal_length;
use crate::core::vector::{self, Vec3, ZERO};

/// Closest distance used when evaluating repulsion.
const MIN_SEPARATION: f64 = 1.0;

/// Offsets of each slot from the molecule's center.
///
/// Slots start on a Fibonacci sphere and relax for `cfg.layout_steps` damped
/// steps under inverse-square repulsion between every pair of slots and springs
/// toward the bond rest length along recipe bonds. If the relaxation produces
/// a non-finite position the slots are placed radially around the first one
/// instead.
pub fn layout(radii: &[f64], bonds: &[RecipeBond], cfg: &AssemblyConfig) -> Vec<Vec3> {
    let n = radii.len();
    if n <= 1 {
        return vec![ZERO; n];
    }
    let mean_radius = radii.iter().sum::<f64>() / n as f64;
    let shell = ideal_length(mean_radius, mean_radius, 1) * (n as f64).sqrt() * 0.6;

    let mut pos = fibonacci_sphere(n, shell);
    let mut vel = vec![ZERO; n];
    let mut force = vec![ZERO; n];

    let mut temperature = 1.0;
    for _ in 0..cfg.layout_steps {
        force.iter_mut().for_each(|f| *f = ZERO);

        for i in 0..n {
            for j in (i + 1)..n {
                let delta = vector::sub(&pos[j], &pos[i]);
                let d = vector::norm(&delta).max(MIN_SEPARATION);
                let dir = vector::scale(&delta, 1.0 / d);
                let push = cfg.layout_repulsion / (d * d);
                vector::add_scaled(&mut force[i], &dir, -push);
                vector::add_scaled(&mut force[j], &dir, push);
            }
        }

        for b in bonds {
            let delta = vector::sub(&pos[b.b], &pos[b.a]);
            let d = vector::norm(&delta).max(MIN_SEPARATION);
            let dir = vector::scale(&delta, 1.0 / d);
            let rest = ideal_length(radii[b.a], radii[b.b], b.order as usize);
            let pull = cfg.layout_spring * (d - rest);
            vector::add_scaled(&mut force[b.a], &dir, pull);
            vector::add_scaled(&mut force[b.b], &dir, -pull);
        }

        for ((p, v), f) in pos.iter_mut().zip(&mut vel).zip(&force) {
            let f = vector::clamp_magnitude(f, cfg.layout_max_force);
            let mut next = vector::scale(&vector::add(v, &f), cfg.layout_damping);
            next = vector::clamp_magnitude(&next, cfg.layout_max_speed);
            *v = next;
            vector::add_scaled(p, v, temperature);
        }
        temperature *= cfg.layout_cooling;
    }

    if !pos.iter().all(vector::is_finite) {
        return radial_fallback(radii);
    }
    recenter(&mut pos);
    pos
}

// ============ Internal helpers ============

fn fibonacci_sphere(n: usize, radius: f64) -> Vec<Vec3> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f64;
            [theta.cos() * r * radius, y * radius, theta.sin() * r * radius]
        })
        .collect()
}

/// First slot at the center, the rest evenly spaced on a ring in the XY plane.
fn radial_fallback(radii: &[f64]) -> Vec<Vec3> {
    let n = radii.len();
    let mut out = vec![ZERO; n];
    let spokes = (n - 1).max(1) as f64;
    for (k, slot) in out.iter_mut().enumerate().skip(1) {
        let angle = (k - 1) as f64 * std::f64::consts::TAU / spokes;
        let reach = ideal_length(radii[0], radii[k], 1);
        *slot = [angle.cos() * reach, angle.sin() * reach, 0.0];
    }
    out
}

fn recenter(pos: &mut [Vec3]) {
    let center = vector::weighted_mean(pos.iter().map(|p| (1.0, *p)));
    for p in pos.iter_mut() {
        *p = vector::sub(p, &center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> (Vec<f64>, Vec<RecipeBond>) {
        let radii = vec![55.0, 40.0, 40.0];
        let bonds = vec![
            RecipeBond { a: 0, b: 1, order: 1 },
            RecipeBond { a: 0, b: 2, order: 1 },
        ];
        (radii, bonds)
    }

    #[test]
    fn single_atom_sits_at_origin() {
        let cfg = AssemblyConfig::default();
        assert_eq!(layout(&[40.0], &[], &cfg), vec![ZERO]);
        assert!(layout(&[], &[], &cfg).is_empty());
    }

    #[test]
    fn bonds_relax_near_rest_length() {
        let cfg = AssemblyConfig::default();
        let (radii, bonds) = water();
        let pos = layout(&radii, &bonds, &cfg);
        let rest = ideal_length(55.0, 40.0, 1);
        for b in &bonds {
            let d = vector::distance(&pos[b.a], &pos[b.b]);
            assert!((d - rest).abs() < 0.15 * rest, "bond length {d} vs {rest}");
        }
        // Hydrogens pushed apart rather than collapsing onto each other.
        assert!(vector::distance(&pos[1], &pos[2]) > rest);
    }

    #[test]
    fn repulsion_stretches_bonds_only_slightly() {
        let cfg = AssemblyConfig::default();
        let radii = vec![55.0, 40.0];
        let bonds = vec![RecipeBond { a: 0, b: 1, order: 1 }];
        let pos = layout(&radii, &bonds, &cfg);
        let rest = ideal_length(55.0, 40.0, 1);
        let d = vector::distance(&pos[0], &pos[1]);
        // Spring and repulsion balance just past the rest length.
        let equilibrium = rest + cfg.layout_repulsion / (rest * rest) / cfg.layout_spring;
        assert!(d > rest, "bond length {d} vs {rest}");
        assert!((d - equilibrium).abs() < 0.05 * rest, "bond length {d} vs {equilibrium}");
    }

    #[test]
    fn layout_is_centered_and_deterministic() {
        let cfg = AssemblyConfig::default();
        let (radii, bonds) = water();
        let a = layout(&radii, &bonds, &cfg);
        let b = layout(&radii, &bonds, &cfg);
        assert_eq!(a, b);
        let c = vector::weighted_mean(a.iter().map(|p| (1.0, *p)));
        assert!(vector::norm(&c) < 1e-9);
    }

    #[test]
    fn fallback_places_ring_around_hub() {
        let pos = radial_fallback(&[50.0, 40.0, 40.0, 40.0]);
        assert_eq!(pos[0], ZERO);
        let reach = ideal_length(50.0, 40.0, 1);
        for p in &pos[1..] {
            assert!((vector::norm(p) - reach).abs() < 1e-9);
        }
    }
}
