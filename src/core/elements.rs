//! Periodic table reference data.
//!
//! The table is embedded in the crate and parsed once; the simulation treats it
//! as immutable lookup data.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::sync::OnceLock;

const EMBEDDED_ELEMENTS: &str = include_str!("../../resources/elements.toml");

static ELEMENTS: OnceLock<ElementTable> = OnceLock::new();

/// Highest atomic number in the table.
pub const MAX_Z: u32 = 118;

/// Bond-count cap for elements that are not treated as covalent.
pub const NON_COVALENT_VALENCE_CAP: usize = 8;

/// Simplified metal / non-metal partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementClass {
    Nonmetal,
    Metalloid,
    Noble,
    Metal,
}

/// Nuclear decay channel of an unstable isotope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecayMode {
    Alpha,
    BetaMinus,
    BetaPlus,
    Fission,
}

impl DecayMode {
    /// Audit reason used when this decay happens.
    pub fn reason(self) -> &'static str {
        match self {
            DecayMode::Alpha => "Alpha decay",
            DecayMode::BetaMinus => "Beta-minus decay",
            DecayMode::BetaPlus => "Beta-plus decay",
            DecayMode::Fission => "Spontaneous fission",
        }
    }
}

/// One isotope record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Isotope {
    /// Mass number A.
    #[serde(rename = "a")]
    pub mass_number: u32,
    /// Isotope mass in atomic mass units.
    pub mass: f64,
    /// Half-life in simulation seconds; `None` means stable.
    #[serde(default)]
    pub half_life: Option<f64>,
    #[serde(default)]
    pub mode: Option<DecayMode>,
    /// Tabulated daughter as `[Z, A]`.
    #[serde(default)]
    pub daughter: Option<[u32; 2]>,
}

impl Isotope {
    #[inline]
    pub fn is_stable(&self) -> bool {
        self.half_life.is_none()
    }
}

/// Static definition of an atomic species.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementKind {
    pub z: u32,
    pub symbol: String,
    pub name: String,
    /// Periodic group (1..=18), 0 for the f-block.
    pub group: u32,
    pub class: ElementClass,
    /// Nominal maximum valence.
    pub valence: usize,
    /// Known isotopes; index 0 is the default form.
    pub isotopes: Vec<Isotope>,
}

impl ElementKind {
    /// Elements whose bond count is bounded by their own valence.
    #[inline]
    pub fn is_covalent(&self) -> bool {
        self.class != ElementClass::Metal
    }

    #[inline]
    pub fn is_metal(&self) -> bool {
        self.class == ElementClass::Metal
    }

    #[inline]
    pub fn is_noble(&self) -> bool {
        self.class == ElementClass::Noble
    }

    #[inline]
    pub fn is_halogen(&self) -> bool {
        self.group == 17
    }

    #[inline]
    pub fn is_chalcogen(&self) -> bool {
        self.group == 16
    }

    #[inline]
    pub fn is_pnictogen(&self) -> bool {
        self.group == 15
    }

    /// Maximum simultaneous bond count.
    pub fn effective_max_valence(&self) -> usize {
        if self.is_covalent() {
            self.valence
        } else {
            NON_COVALENT_VALENCE_CAP
        }
    }

    /// Index of the isotope with mass number `a`, if tabulated.
    pub fn isotope_index(&self, a: u32) -> Option<usize> {
        self.isotopes.iter().position(|iso| iso.mass_number == a)
    }

    /// Index of the tabulated isotope whose mass number is closest to `a`.
    pub fn nearest_isotope_index(&self, a: u32) -> usize {
        self.isotopes
            .iter()
            .enumerate()
            .min_by_key(|(_, iso)| iso.mass_number.abs_diff(a))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct ElementFile {
    elements: Vec<ElementKind>,
}

/// All elements, indexed by atomic number.
#[derive(Debug, Clone)]
pub struct ElementTable {
    elements: Vec<ElementKind>,
}

impl ElementTable {
    /// The embedded table, parsed on first use.
    pub fn global() -> Result<&'static ElementTable> {
        if let Some(table) = ELEMENTS.get() {
            return Ok(table);
        }
        let table = Self::from_toml_str(EMBEDDED_ELEMENTS)?;
        Ok(ELEMENTS.get_or_init(|| table))
    }

    /// Parse and validate a table.
    ///
    /// Errors:
    /// - `Error::ResourceParse` on malformed TOML
    /// - `Error::InvalidResource` if atomic numbers are not contiguous from 1,
    ///   an element has no isotopes, or an unstable isotope lacks a decay channel
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let file: ElementFile = toml::from_str(src)?;
        for (i, el) in file.elements.iter().enumerate() {
            if el.z as usize != i + 1 {
                return Err(Error::InvalidResource(format!(
                    "element {} listed at position {}",
                    el.symbol,
                    i + 1
                )));
            }
            if el.isotopes.is_empty() {
                return Err(Error::InvalidResource(format!(
                    "element {} has no isotopes",
                    el.symbol
                )));
            }
            for iso in &el.isotopes {
                if !iso.mass.is_finite() || iso.mass <= 0.0 {
                    return Err(Error::InvalidResource(format!(
                        "{}-{} has a non-positive mass",
                        el.symbol, iso.mass_number
                    )));
                }
                match (iso.half_life, iso.mode, iso.daughter) {
                    (None, _, _) => {}
                    (Some(_), None, _) => {
                        return Err(Error::InvalidResource(format!(
                            "{}-{} is unstable but has no decay mode",
                            el.symbol, iso.mass_number
                        )))
                    }
                    (Some(_), Some(DecayMode::Fission), _) => {}
                    (Some(_), Some(_), None) => {
                        return Err(Error::InvalidResource(format!(
                            "{}-{} has no daughter",
                            el.symbol, iso.mass_number
                        )))
                    }
                    (Some(_), Some(_), Some(_)) => {}
                }
            }
        }
        Ok(Self {
            elements: file.elements,
        })
    }

    /// Element with atomic number `z`.
    #[inline]
    pub fn get(&self, z: u32) -> Option<&ElementKind> {
        if z == 0 {
            return None;
        }
        self.elements.get(z as usize - 1)
    }

    /// Element with atomic number `z`, or `Error::UnknownElement`.
    pub fn require(&self, z: u32) -> Result<&ElementKind> {
        self.get(z).ok_or(Error::UnknownElement(z))
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&ElementKind> {
        self.elements.iter().find(|e| e.symbol == symbol)
    }

    /// Tabulated isotope `A` of element `Z`.
    pub fn isotope(&self, z: u32, a: u32) -> Option<&Isotope> {
        let el = self.get(z)?;
        el.isotope_index(a).map(|i| &el.isotopes[i])
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementKind> {
        self.elements.iter()
    }
}
