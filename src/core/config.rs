use crate::core::vector::{Vec3, DIM};
use crate::error::{Error, Result};
use serde::Deserialize;

/// Tunable parameters for the simulation core.
///
/// Distances are in arena units, times in seconds and velocities in units per
/// second. Magnitudes are tuned for legible, game-paced interaction rather than
/// physical accuracy. Every field has a default, so a TOML override only needs
/// to name the values it changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub tick: TickConfig,
    pub forces: ForceConfig,
    pub reactions: ReactionConfig,
    pub nuclear: NuclearConfig,
    pub assembly: AssemblyConfig,
    pub integrator: IntegratorConfig,
}

/// Arena bounds, centred on the origin.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Half-extents of the arena along x, y, z.
    pub half_extents: Vec3,
    /// Photons are removed once this far outside the arena.
    pub photon_escape_margin: f64,
    /// Positions rescued from numerical corruption are reset here.
    pub safe_position: Vec3,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            half_extents: [1200.0, 800.0, 300.0],
            photon_escape_margin: 100.0,
            safe_position: [0.0; DIM],
        }
    }
}

/// Substep layout of a rendered frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Integration substeps per `advance_frame` call.
    pub substeps: u32,
    /// Default frame duration used by callers that do not track wall time.
    pub frame_dt: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            substeps: 4,
            frame_dt: 1.0 / 60.0,
        }
    }
}

/// Pairwise force constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Coulomb constant for unbonded charged pairs.
    pub coulomb_k: f64,
    /// Softening length added to the Coulomb denominator.
    pub coulomb_softening: f64,
    /// Coulomb interaction is ignored beyond this distance.
    pub coulomb_cutoff: f64,
    /// Penalty stiffness of Pauli/contact repulsion.
    pub contact_stiffness: f64,
    /// Damping applied to approaching contact pairs.
    pub contact_damping: f64,
    /// Bond spring stiffness.
    pub bond_stiffness: f64,
    /// Bond damping coefficient (along the bond normal).
    pub bond_damping: f64,
    /// Upper bound on the spring force magnitude.
    pub bond_max_force: f64,
    /// A bond snaps when stretched beyond this multiple of its ideal length.
    pub bond_snap_ratio: f64,
    /// Relative tick displacement, as a fraction of the contact distance (sum of
    /// radii), above which a pair is swept for contact.
    pub ccd_fraction: f64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            coulomb_k: 4.0e5,
            coulomb_softening: 40.0,
            coulomb_cutoff: 900.0,
            contact_stiffness: 600.0,
            contact_damping: 4.0,
            bond_stiffness: 180.0,
            bond_damping: 6.0,
            bond_max_force: 40_000.0,
            bond_snap_ratio: 5.0,
            ccd_fraction: 0.5,
        }
    }
}

/// Thresholds for the reaction chain and the bond annealing passes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    /// Bonds form below this relative speed...
    pub bond_speed_max: f64,
    /// ...or are forced above this one.
    pub forced_bond_speed: f64,
    /// Cooldown given to bodies that took part in a reaction.
    pub reaction_cooldown: f64,
    /// Speed of the two photons released by annihilation.
    pub photon_speed: f64,
    /// Impulse scale applied when annealing breaks a bond.
    pub separation_impulse: f64,
    /// Search radius for a better bonding partner.
    pub optimize_radius: f64,
    /// Speed given toward a better bonding partner.
    pub optimize_impulse: f64,
    /// Bonds longer than this are pruned as ghosts.
    pub ghost_bond_distance: f64,
    /// Lifetime of floating molecule labels.
    pub label_lifetime: f64,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            bond_speed_max: 260.0,
            forced_bond_speed: 900.0,
            reaction_cooldown: 1.0,
            photon_speed: 900.0,
            separation_impulse: 80.0,
            optimize_radius: 200.0,
            optimize_impulse: 60.0,
            ghost_bond_distance: 500.0,
            label_lifetime: 4.0,
        }
    }
}

/// Timings and geometry of the nuclear system.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NuclearConfig {
    /// No decay draw happens this soon after a body was created or reacted.
    pub decay_grace: f64,
    /// Half-lives are floored to this value before computing the decay constant.
    pub min_half_life: f64,
    /// Up/down quarks expire after this long without hadronizing.
    pub quark_lifetime: f64,
    /// Antiquarks and other exotic placeholders expire after this long.
    pub exotic_lifetime: f64,
    /// Quark triplets are considered within this radius.
    pub hadron_radius: f64,
    /// Triplets tighter than this spread combine into a nucleon.
    pub hadron_fusion_distance: f64,
    /// Velocity gain of the centripetal pull applied to loose triplets.
    pub hadron_pull: f64,
    /// Relative tolerance when matching pair-production thresholds.
    pub pair_tolerance: f64,
    /// Speed of freshly produced pairs.
    pub pair_speed: f64,
    /// Lateral offset of each member of a produced pair from the injection point.
    pub pair_offset: f64,
    /// Mass tolerance when matching fusion ladder inputs.
    pub fusion_mass_tolerance: f64,
    /// Recoil speed after alpha decay.
    pub alpha_recoil: f64,
    /// Recoil speed after beta decay.
    pub beta_recoil: f64,
    /// Kick speed of fission fragments.
    pub fission_kick: f64,
    /// Kick speed of fission neutrons.
    pub fission_neutron_speed: f64,
    /// Half-life of synthetic isotopes created by neutron capture.
    pub synthetic_half_life: f64,
}

impl Default for NuclearConfig {
    fn default() -> Self {
        Self {
            decay_grace: 0.3,
            min_half_life: 0.3,
            quark_lifetime: 5.0,
            exotic_lifetime: 0.5,
            hadron_radius: 180.0,
            hadron_fusion_distance: 30.0,
            hadron_pull: 6.0,
            pair_tolerance: 0.05,
            pair_speed: 240.0,
            pair_offset: 40.0,
            fusion_mass_tolerance: 0.2,
            alpha_recoil: 90.0,
            beta_recoil: 25.0,
            fission_kick: 220.0,
            fission_neutron_speed: 420.0,
            synthetic_half_life: 2.0,
        }
    }
}

/// Molecular assembly and layout parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Relaxation steps of the force-directed layout.
    pub layout_steps: usize,
    /// Inverse-square repulsion constant between non-bonded atom pairs.
    pub layout_repulsion: f64,
    /// Spring constant along recipe bonds.
    pub layout_spring: f64,
    /// Per-step velocity retention.
    pub layout_damping: f64,
    /// Per-step force clamp.
    pub layout_max_force: f64,
    /// Per-step velocity clamp.
    pub layout_max_speed: f64,
    /// Multiplicative cooling applied to the step size each iteration.
    pub layout_cooling: f64,
    /// Distance between the centres of several molecules assembled at once.
    pub instance_spacing: f64,
    /// Positional jitter of leftover atoms.
    pub leftover_jitter: f64,
    /// Relative randomization of the leftover ejection velocity.
    pub leftover_spread: f64,
    /// Countdown before an assembling group is released regardless of tension.
    pub release_timeout: f64,
    /// Groups whose members all feel less force than this are released early.
    pub release_tension: f64,
    /// Per-second velocity retention while assembling.
    pub assembling_damping: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            layout_steps: 400,
            layout_repulsion: 4_000.0,
            layout_spring: 0.5,
            layout_damping: 0.85,
            layout_max_force: 50.0,
            layout_max_speed: 20.0,
            layout_cooling: 0.995,
            instance_spacing: 260.0,
            leftover_jitter: 25.0,
            leftover_spread: 0.3,
            release_timeout: 1.5,
            release_tension: 150.0,
            assembling_damping: 0.02,
        }
    }
}

/// Integration limits and damping regimes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Acceleration magnitude clamp.
    pub max_accel: f64,
    /// Hard speed cap for free bodies.
    pub max_speed: f64,
    /// Steady drag rate (per second).
    pub drag: f64,
    /// Extra damping rate at full cooldown (per second).
    pub cooldown_damping: f64,
    /// Time for cooldown to decay from 1 to 0.
    pub cooldown_duration: f64,
    /// Restoring spring pulling each bonded group's mean Z toward 0.
    pub z_restoring: f64,
    /// Velocity kept after bouncing off an X/Y wall.
    pub restitution: f64,
    /// Mass assigned to massive bodies found with a non-positive mass.
    pub min_mass: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            max_accel: 40_000.0,
            max_speed: 1500.0,
            drag: 0.4,
            cooldown_damping: 6.0,
            cooldown_duration: 0.6,
            z_restoring: 2.0,
            restitution: 0.8,
            min_mass: 0.000_5,
        }
    }
}

impl SimConfig {
    /// Parse a (partial) TOML override on top of the defaults.
    ///
    /// Errors:
    /// - `Error::ResourceParse` on malformed TOML
    /// - `Error::InvalidParam` if a parsed value is out of range
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let cfg: SimConfig = toml::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check ranges that would otherwise make the integrator misbehave.
    pub fn validate(&self) -> Result<()> {
        if !self
            .world
            .half_extents
            .iter()
            .all(|&h| h.is_finite() && h > 0.0)
        {
            return Err(Error::InvalidParam(
                "world.half_extents must be finite and > 0".into(),
            ));
        }
        if self.tick.substeps == 0 {
            return Err(Error::InvalidParam("tick.substeps must be > 0".into()));
        }
        if !self.tick.frame_dt.is_finite() || self.tick.frame_dt <= 0.0 {
            return Err(Error::InvalidParam("tick.frame_dt must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.integrator.restitution) {
            return Err(Error::InvalidParam(
                "integrator.restitution must lie in [0, 1]".into(),
            ));
        }
        if self.integrator.max_speed <= 0.0 || self.integrator.max_accel <= 0.0 {
            return Err(Error::InvalidParam(
                "integrator speed and acceleration caps must be > 0".into(),
            ));
        }
        if self.nuclear.min_half_life <= 0.0 {
            return Err(Error::InvalidParam(
                "nuclear.min_half_life must be > 0".into(),
            ));
        }
        if self.forces.bond_snap_ratio <= 1.0 {
            return Err(Error::InvalidParam(
                "forces.bond_snap_ratio must be > 1".into(),
            ));
        }
        Ok(())
    }
}
