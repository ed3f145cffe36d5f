//! Molecule recipes and bond-dissociation energies.
//!
//! Both tables are embedded and parsed once. The catalog precomputes a net
//! energy score per recipe so the assembly engine can prefer saturated, stable
//! molecules when it has to partition a selection greedily.

use crate::core::elements::ElementTable;
use crate::error::{Error, Result};
use ordered_float::OrderedFloat;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

const EMBEDDED_MOLECULES: &str = include_str!("../../resources/molecules.toml");
const EMBEDDED_ENERGIES: &str = include_str!("../../resources/bond_energies.toml");

static ENERGIES: OnceLock<BondEnergyTable> = OnceLock::new();
static CATALOG: OnceLock<RecipeCatalog> = OnceLock::new();

#[derive(Debug, Deserialize)]
struct EnergyRow {
    a: u32,
    b: u32,
    order: u8,
    kj: f64,
}

#[derive(Debug, Deserialize)]
struct EnergyFile {
    energies: Vec<EnergyRow>,
}

/// Bond-dissociation energy lookup keyed by `(Z_a, Z_b, order)`, symmetric in the atoms.
#[derive(Debug, Clone, Default)]
pub struct BondEnergyTable {
    energies: HashMap<(u32, u32, u8), f64>,
}

impl BondEnergyTable {
    pub fn global() -> Result<&'static BondEnergyTable> {
        if let Some(table) = ENERGIES.get() {
            return Ok(table);
        }
        let table = Self::from_toml_str(EMBEDDED_ENERGIES)?;
        Ok(ENERGIES.get_or_init(|| table))
    }

    pub fn from_toml_str(src: &str) -> Result<Self> {
        let file: EnergyFile = toml::from_str(src)?;
        let mut energies = HashMap::with_capacity(file.energies.len());
        for row in file.energies {
            if row.order == 0 || !row.kj.is_finite() || row.kj < 0.0 {
                return Err(Error::InvalidResource(format!(
                    "bad bond energy row for Z={} / Z={}",
                    row.a, row.b
                )));
            }
            energies.insert(key(row.a, row.b, row.order), row.kj);
        }
        Ok(Self { energies })
    }

    /// Energy of a bond, if tabulated.
    pub fn get(&self, a: u32, b: u32, order: u8) -> Option<f64> {
        self.energies.get(&key(a, b, order)).copied()
    }

    /// Energy of a bond, 0 when untabulated.
    #[inline]
    pub fn energy(&self, a: u32, b: u32, order: u8) -> f64 {
        self.get(a, b, order).unwrap_or(0.0)
    }

    /// Per-atom baseline: half of the element's homonuclear single-bond energy.
    #[inline]
    pub fn atom_baseline(&self, z: u32) -> f64 {
        0.5 * self.energy(z, z, 1)
    }
}

#[inline]
fn key(a: u32, b: u32, order: u8) -> (u32, u32, u8) {
    if a <= b {
        (a, b, order)
    } else {
        (b, a, order)
    }
}

/// One recipe bond between two structure slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeBond {
    pub a: usize,
    pub b: usize,
    pub order: u8,
}

#[derive(Debug, Deserialize)]
struct RecipeRow {
    name: String,
    formula: String,
    atoms: Vec<u32>,
    bonds: Vec<[usize; 3]>,
    #[serde(default)]
    hidden: bool,
}

#[derive(Debug, Deserialize)]
struct RecipeFile {
    molecule: Vec<RecipeRow>,
}

/// A target molecular structure: exact atom slots plus explicit bonds.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub formula: String,
    /// Atomic number required in each slot.
    pub atoms: Vec<u32>,
    pub bonds: Vec<RecipeBond>,
    pub hidden: bool,
    /// Net energy score: bond energies minus per-atom baselines.
    pub score: f64,
    composition: Vec<u32>,
}

impl Recipe {
    /// Sorted atomic numbers of all slots.
    pub fn composition(&self) -> &[u32] {
        &self.composition
    }

    /// Total number of bond adjacency entries per side (sum of bond orders).
    pub fn bond_order_sum(&self) -> usize {
        self.bonds.iter().map(|b| b.order as usize).sum()
    }

    /// Number of distinct bonded slot pairs.
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }
}

/// Immutable molecule catalog with a precomputed score ranking.
#[derive(Debug, Clone)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    ranked: Vec<usize>,
}

impl RecipeCatalog {
    /// The embedded catalog, validated against the embedded element table.
    pub fn global() -> Result<&'static RecipeCatalog> {
        if let Some(catalog) = CATALOG.get() {
            return Ok(catalog);
        }
        let catalog = Self::from_toml_str(
            EMBEDDED_MOLECULES,
            ElementTable::global()?,
            BondEnergyTable::global()?,
        )?;
        Ok(CATALOG.get_or_init(|| catalog))
    }

    /// Parse, validate and score a catalog.
    ///
    /// Errors:
    /// - `Error::ResourceParse` on malformed TOML
    /// - `Error::InvalidResource` if a recipe names an unknown element, a bond
    ///   refers to a missing slot, or a slot would exceed its valence
    pub fn from_toml_str(
        src: &str,
        elements: &ElementTable,
        energies: &BondEnergyTable,
    ) -> Result<Self> {
        let file: RecipeFile = toml::from_str(src)?;
        let mut recipes = Vec::with_capacity(file.molecule.len());
        for row in file.molecule {
            let mut load = vec![0usize; row.atoms.len()];
            for &z in &row.atoms {
                if elements.get(z).is_none() {
                    return Err(Error::InvalidResource(format!(
                        "{}: unknown element Z={z}",
                        row.name
                    )));
                }
            }
            let mut bonds = Vec::with_capacity(row.bonds.len());
            for [a, b, order] in row.bonds {
                if a >= row.atoms.len() || b >= row.atoms.len() || a == b || order == 0 {
                    return Err(Error::InvalidResource(format!(
                        "{}: bad bond [{a}, {b}, {order}]",
                        row.name
                    )));
                }
                load[a] += order;
                load[b] += order;
                bonds.push(RecipeBond {
                    a,
                    b,
                    order: order as u8,
                });
            }
            for (slot, (&z, &used)) in row.atoms.iter().zip(&load).enumerate() {
                let cap = elements.require(z)?.effective_max_valence();
                if used > cap {
                    return Err(Error::InvalidResource(format!(
                        "{}: slot {slot} uses {used} bonds, valence is {cap}",
                        row.name
                    )));
                }
            }

            let bond_energy: f64 = bonds
                .iter()
                .map(|b| energies.energy(row.atoms[b.a], row.atoms[b.b], b.order))
                .sum();
            let baseline: f64 = row.atoms.iter().map(|&z| energies.atom_baseline(z)).sum();
            let mut composition = row.atoms.clone();
            composition.sort_unstable();

            recipes.push(Recipe {
                name: row.name,
                formula: row.formula,
                atoms: row.atoms,
                bonds,
                hidden: row.hidden,
                score: bond_energy - baseline,
                composition,
            });
        }

        let mut ranked: Vec<usize> = (0..recipes.len()).collect();
        // Stable sort: equal scores keep catalog order.
        ranked.sort_by_key(|&i| std::cmp::Reverse(OrderedFloat(recipes[i].score)));

        Ok(Self { recipes, ranked })
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Recipe> {
        self.recipes.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }

    /// Non-hidden recipes, highest score first.
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &Recipe)> {
        self.ranked
            .iter()
            .map(move |&i| (i, &self.recipes[i]))
            .filter(|(_, r)| !r.hidden)
    }

    /// Recipe whose element multiset equals `composition` (sorted), preferring visible recipes.
    pub fn exact_match(&self, composition: &[u32]) -> Option<(usize, &Recipe)> {
        let mut hidden = None;
        for (i, r) in self.recipes.iter().enumerate() {
            if r.composition == composition {
                if !r.hidden {
                    return Some((i, r));
                }
                hidden.get_or_insert((i, r));
            }
        }
        hidden
    }

    /// Recipe matching both a composition and a total bond-order sum.
    pub fn identify(&self, composition: &[u32], bond_order_sum: usize) -> Option<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.composition == composition && r.bond_order_sum() == bond_order_sum)
    }
}
