use crate::core::elements::{ElementKind, ElementTable, Isotope};
use crate::core::vector::{self, Vec3, ZERO};
use crate::error::{Error, Result};
use std::fmt;

/// Stable identifier of a body. Never reused within a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Display radius of an electron or positron.
pub const LEPTON_RADIUS: f64 = 12.0;
/// Display radius of a quark or antiquark.
pub const QUARK_RADIUS: f64 = 10.0;
/// Display radius of a bare proton or neutron.
pub const NUCLEON_RADIUS: f64 = 24.0;
/// Display radius of a photon.
pub const PHOTON_RADIUS: f64 = 6.0;

pub const ELECTRON_MASS: f64 = 0.000_549;
pub const PROTON_MASS: f64 = 1.007;
pub const NEUTRON_MASS: f64 = 1.009;
/// Constituent quark mass: three quarks make roughly one nucleon.
pub const QUARK_MASS: f64 = 0.336;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuarkFlavor {
    Up,
    Down,
}

impl QuarkFlavor {
    /// Electric charge of the (non-anti) quark.
    pub fn charge(self) -> f64 {
        match self {
            QuarkFlavor::Up => 2.0 / 3.0,
            QuarkFlavor::Down => -1.0 / 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeptonKind {
    Electron,
    Positron,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NucleonKind {
    Proton,
    Neutron,
}

/// Atom-specific state: element, selected isotope and an optional synthetic override.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomState {
    pub z: u32,
    /// Index into the element's isotope list.
    pub isotope: usize,
    /// Transient isotope not present in the table (e.g. produced by neutron capture).
    pub synthetic: Option<Isotope>,
}

impl AtomState {
    /// The isotope currently in effect.
    pub fn isotope<'a>(&'a self, element: &'a ElementKind) -> Option<&'a Isotope> {
        match &self.synthetic {
            Some(iso) => Some(iso),
            None => element.isotopes.get(self.isotope),
        }
    }
}

/// What a body is. Matched exhaustively instead of sentinel atomic numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyKind {
    Quark { flavor: QuarkFlavor, anti: bool },
    Lepton(LeptonKind),
    Nucleon(NucleonKind),
    Atom(AtomState),
    /// Massless boson; flies straight and ignores forces.
    Photon,
}

/// A species a caller can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Electron,
    Positron,
    Proton,
    Neutron,
    Quark { flavor: QuarkFlavor, anti: bool },
    Photon,
    /// Element in its default isotope.
    Element(u32),
    /// Element in a specific isotope (mass number).
    Isotope { z: u32, a: u32 },
}

impl Species {
    pub const UP: Species = Species::Quark {
        flavor: QuarkFlavor::Up,
        anti: false,
    };
    pub const DOWN: Species = Species::Quark {
        flavor: QuarkFlavor::Down,
        anti: false,
    };
    pub const ANTI_UP: Species = Species::Quark {
        flavor: QuarkFlavor::Up,
        anti: true,
    };
    pub const ANTI_DOWN: Species = Species::Quark {
        flavor: QuarkFlavor::Down,
        anti: true,
    };

    /// Parse a particle name, glyph, element symbol or `Symbol-A` isotope.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if the name matches nothing
    pub fn parse(name: &str, elements: &ElementTable) -> Result<Species> {
        let species = match name.trim() {
            "electron" | "e-" | "e⁻" => Species::Electron,
            "positron" | "e+" | "e⁺" => Species::Positron,
            "proton" | "p" | "p+" | "p⁺" => Species::Proton,
            "neutron" | "n" | "n0" | "n⁰" => Species::Neutron,
            "photon" | "γ" => Species::Photon,
            "up" | "u" => Species::UP,
            "down" | "d" => Species::DOWN,
            "anti-up" | "ū" => Species::ANTI_UP,
            "anti-down" | "d̄" => Species::ANTI_DOWN,
            other => match other.split_once('-') {
                Some((symbol, a)) => {
                    let el = elements
                        .by_symbol(symbol)
                        .ok_or_else(|| Error::InvalidParam(format!("unknown species '{name}'")))?;
                    let a = a
                        .parse::<u32>()
                        .map_err(|_| Error::InvalidParam(format!("bad mass number in '{name}'")))?;
                    Species::Isotope { z: el.z, a }
                }
                None => elements
                    .by_symbol(other)
                    .map(|el| Species::Element(el.z))
                    .ok_or_else(|| Error::InvalidParam(format!("unknown species '{name}'")))?,
            },
        };
        Ok(species)
    }
}

/// Placement sub-state used while the assembly engine positions a body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyState {
    pub active: bool,
    /// Seconds left before the group is released regardless of tension.
    pub countdown: f64,
    /// Velocity restored on release.
    pub ejection: Vec3,
}

/// Any simulated particle, atom or ion.
///
/// Fields:
/// - `id`: stable identifier
/// - `pos`, `vel`, `force`: position, velocity and per-tick force accumulator
/// - `mass`: mass in atomic mass units (0 for photons)
/// - `radius`: derived display radius, see [`display_radius`]
/// - `charge`: electric charge in units of e (fractional for quarks and shared groups)
/// - `bonds`: bonded body ids; an id repeated n times is a bond of order n
/// - `cooldown`: in [0, 1], softens collisions right after a reaction
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    pub pos: Vec3,
    pub vel: Vec3,
    pub force: Vec3,
    pub mass: f64,
    pub radius: f64,
    pub charge: f64,
    pub bonds: Vec<BodyId>,
    pub cooldown: f64,
    pub assembly: AssemblyState,
    pub created_at: f64,
    pub last_decay_check: f64,
    pub last_reaction: f64,
}

/// Display radius: `30 + mass^0.33 * 10`, with fixed sizes for particles.
pub fn display_radius(kind: &BodyKind, mass: f64) -> f64 {
    match kind {
        BodyKind::Lepton(_) => LEPTON_RADIUS,
        BodyKind::Quark { .. } => QUARK_RADIUS,
        BodyKind::Nucleon(_) => NUCLEON_RADIUS,
        BodyKind::Photon => PHOTON_RADIUS,
        BodyKind::Atom(_) => 30.0 + mass.max(0.0).powf(0.33) * 10.0,
    }
}

impl Body {
    /// Build a body of `species` at rest state `pos`/`vel`.
    ///
    /// Errors:
    /// - `Error::UnknownElement` for an atomic number outside the table
    /// - `Error::InvalidParam` for non-finite position/velocity or an untabulated isotope
    pub fn spawn(
        id: BodyId,
        species: Species,
        pos: Vec3,
        vel: Vec3,
        elements: &ElementTable,
        now: f64,
    ) -> Result<Self> {
        if !vector::is_finite(&pos) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        if !vector::is_finite(&vel) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        let (kind, mass, charge) = match species {
            Species::Electron => (BodyKind::Lepton(LeptonKind::Electron), ELECTRON_MASS, -1.0),
            Species::Positron => (BodyKind::Lepton(LeptonKind::Positron), ELECTRON_MASS, 1.0),
            Species::Proton => (BodyKind::Nucleon(NucleonKind::Proton), PROTON_MASS, 1.0),
            Species::Neutron => (BodyKind::Nucleon(NucleonKind::Neutron), NEUTRON_MASS, 0.0),
            Species::Quark { flavor, anti } => {
                let q = if anti { -flavor.charge() } else { flavor.charge() };
                (BodyKind::Quark { flavor, anti }, QUARK_MASS, q)
            }
            Species::Photon => (BodyKind::Photon, 0.0, 0.0),
            Species::Element(z) => {
                let el = elements.require(z)?;
                let atom = AtomState {
                    z,
                    isotope: 0,
                    synthetic: None,
                };
                (BodyKind::Atom(atom), el.isotopes[0].mass, 0.0)
            }
            Species::Isotope { z, a } => {
                let el = elements.require(z)?;
                let idx = el.isotope_index(a).ok_or_else(|| {
                    Error::InvalidParam(format!("{}-{a} is not a tabulated isotope", el.symbol))
                })?;
                let atom = AtomState {
                    z,
                    isotope: idx,
                    synthetic: None,
                };
                (BodyKind::Atom(atom), el.isotopes[idx].mass, 0.0)
            }
        };
        Ok(Self::from_parts(id, kind, mass, charge, pos, vel, now))
    }

    /// Assemble a body from already-validated parts.
    pub fn from_parts(
        id: BodyId,
        kind: BodyKind,
        mass: f64,
        charge: f64,
        pos: Vec3,
        vel: Vec3,
        now: f64,
    ) -> Self {
        let radius = display_radius(&kind, mass);
        Self {
            id,
            kind,
            pos,
            vel,
            force: ZERO,
            mass,
            radius,
            charge,
            bonds: Vec::new(),
            cooldown: 0.0,
            assembly: AssemblyState::default(),
            created_at: now,
            last_decay_check: now,
            last_reaction: now,
        }
    }

    /// Recompute the display radius from kind and mass.
    #[inline]
    pub fn refresh_radius(&mut self) {
        self.radius = display_radius(&self.kind, self.mass);
    }

    #[inline]
    pub fn atom(&self) -> Option<&AtomState> {
        match &self.kind {
            BodyKind::Atom(a) => Some(a),
            _ => None,
        }
    }

    /// Atomic number for atoms and bare protons (1), `None` otherwise.
    pub fn atomic_number(&self) -> Option<u32> {
        match &self.kind {
            BodyKind::Atom(a) => Some(a.z),
            BodyKind::Nucleon(NucleonKind::Proton) => Some(1),
            _ => None,
        }
    }

    /// Mass number of the current isotope (atoms) or 1 (nucleons).
    pub fn mass_number(&self, elements: &ElementTable) -> Option<u32> {
        match &self.kind {
            BodyKind::Atom(a) => {
                let el = elements.get(a.z)?;
                a.isotope(el).map(|iso| iso.mass_number)
            }
            BodyKind::Nucleon(_) => Some(1),
            _ => None,
        }
    }

    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self.kind, BodyKind::Atom(_))
    }

    #[inline]
    pub fn is_photon(&self) -> bool {
        matches!(self.kind, BodyKind::Photon)
    }

    #[inline]
    pub fn is_assembling(&self) -> bool {
        self.assembly.active
    }

    /// Maximum bond count: element valence for atoms, 0 for everything else.
    pub fn effective_max_valence(&self, elements: &ElementTable) -> usize {
        match &self.kind {
            BodyKind::Atom(a) => elements
                .get(a.z)
                .map(|el| el.effective_max_valence())
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Free bond slots.
    pub fn free_valence(&self, elements: &ElementTable) -> usize {
        self.effective_max_valence(elements)
            .saturating_sub(self.bonds.len())
    }

    /// Number of adjacency entries pointing at `other` (the bond order).
    #[inline]
    pub fn bond_order_with(&self, other: BodyId) -> usize {
        self.bonds.iter().filter(|&&b| b == other).count()
    }

    /// Short symbol: element symbol for atoms, particle glyph otherwise.
    pub fn symbol(&self, elements: &ElementTable) -> String {
        match &self.kind {
            BodyKind::Lepton(LeptonKind::Electron) => "e⁻".into(),
            BodyKind::Lepton(LeptonKind::Positron) => "e⁺".into(),
            BodyKind::Nucleon(NucleonKind::Proton) => "p⁺".into(),
            BodyKind::Nucleon(NucleonKind::Neutron) => "n⁰".into(),
            BodyKind::Quark { flavor, anti } => match (flavor, anti) {
                (QuarkFlavor::Up, false) => "u".into(),
                (QuarkFlavor::Down, false) => "d".into(),
                (QuarkFlavor::Up, true) => "ū".into(),
                (QuarkFlavor::Down, true) => "d̄".into(),
            },
            BodyKind::Photon => "γ".into(),
            BodyKind::Atom(a) => elements
                .get(a.z)
                .map(|el| el.symbol.clone())
                .unwrap_or_else(|| format!("Z{}", a.z)),
        }
    }

    /// Audit label: symbol plus mass number for atoms (e.g. `"Og-294"`).
    pub fn label(&self, elements: &ElementTable) -> String {
        match (&self.kind, self.mass_number(elements)) {
            (BodyKind::Atom(_), Some(a)) => format!("{}-{a}", self.symbol(elements)),
            _ => self.symbol(elements),
        }
    }

    /// Half-life of the current state, if unstable.
    pub fn half_life(&self, elements: &ElementTable) -> Option<f64> {
        match &self.kind {
            BodyKind::Atom(a) => {
                let el = elements.get(a.z)?;
                a.isotope(el).and_then(|iso| iso.half_life)
            }
            _ => None,
        }
    }

    /// 1/2 m |v|^2.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * vector::dot(&self.vel, &self.vel)
    }

    /// Add an instantaneous velocity change.
    #[inline]
    pub fn kick(&mut self, dv: &Vec3) {
        vector::add_scaled(&mut self.vel, dv, 1.0);
    }

    /// Mark the body as having just reacted.
    #[inline]
    pub fn mark_reacted(&mut self, now: f64, cooldown: f64) {
        self.last_reaction = now;
        self.cooldown = self.cooldown.max(cooldown.clamp(0.0, 1.0));
    }
}
