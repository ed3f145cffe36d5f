//! Arena of bodies addressed by stable ids.
//!
//! Bodies live in a `Vec` in creation order; an id→index map is maintained
//! alongside so lookups stay O(1). Bonds are stored as id lists on both
//! endpoints and every mutation here keeps them symmetric.

use crate::core::body::{Body, BodyId};
use crate::core::vector::{self, Vec3};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct World {
    bodies: Vec<Body>,
    index: HashMap<BodyId, usize>,
    next_id: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh id.
    pub fn allocate_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a body. Its id must come from [`World::allocate_id`].
    pub fn insert(&mut self, body: Body) -> BodyId {
        let id = body.id;
        self.index.insert(id, self.bodies.len());
        self.bodies.push(body);
        id
    }

    /// Remove a body, dropping every bond that referenced it.
    ///
    /// Order of the remaining bodies is preserved. Returns the removed body with
    /// its adjacency list intact so callers can redistribute charge on former
    /// partners.
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let idx = self.index.remove(&id)?;
        let body = self.bodies.remove(idx);
        for b in &mut self.bodies[idx..] {
            if let Some(slot) = self.index.get_mut(&b.id) {
                *slot -= 1;
            }
        }
        let mut partners: Vec<BodyId> = body.bonds.clone();
        partners.dedup();
        for partner in partners {
            if let Some(p) = self.get_mut(partner) {
                p.bonds.retain(|&b| b != id);
            }
        }
        Some(body)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: BodyId) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    pub fn index_of(&self, id: BodyId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[inline]
    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.index.get(&id).map(|&i| &self.bodies[i])
    }

    #[inline]
    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.bodies[i]),
            None => None,
        }
    }

    #[inline]
    pub fn at(&self, idx: usize) -> &Body {
        &self.bodies[idx]
    }

    #[inline]
    pub fn at_mut(&mut self, idx: usize) -> &mut Body {
        &mut self.bodies[idx]
    }

    /// Mutable access to two distinct bodies by index.
    pub fn pair_mut(&mut self, i: usize, j: usize) -> (&mut Body, &mut Body) {
        assert_ne!(i, j, "pair_mut requires distinct indices");
        if i < j {
            let (lo, hi) = self.bodies.split_at_mut(j);
            (&mut lo[i], &mut hi[0])
        } else {
            let (lo, hi) = self.bodies.split_at_mut(i);
            (&mut hi[0], &mut lo[j])
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    /// Ids in current order.
    pub fn ids(&self) -> Vec<BodyId> {
        self.bodies.iter().map(|b| b.id).collect()
    }

    // ============ Bond graph ============

    /// Add one bond order between `a` and `b` on both sides.
    pub fn add_bond(&mut self, a: BodyId, b: BodyId) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        if let Some(body) = self.get_mut(a) {
            body.bonds.push(b);
        }
        if let Some(body) = self.get_mut(b) {
            body.bonds.push(a);
        }
        true
    }

    /// Remove one bond order between `a` and `b` (one entry on each side).
    pub fn remove_bond(&mut self, a: BodyId, b: BodyId) -> bool {
        let mut removed = false;
        if let Some(body) = self.get_mut(a) {
            if let Some(pos) = body.bonds.iter().position(|&x| x == b) {
                body.bonds.remove(pos);
                removed = true;
            }
        }
        if let Some(body) = self.get_mut(b) {
            if let Some(pos) = body.bonds.iter().position(|&x| x == a) {
                body.bonds.remove(pos);
            }
        }
        removed
    }

    /// Remove every bond order between `a` and `b`.
    pub fn remove_all_bonds(&mut self, a: BodyId, b: BodyId) -> usize {
        let mut removed = 0;
        if let Some(body) = self.get_mut(a) {
            let before = body.bonds.len();
            body.bonds.retain(|&x| x != b);
            removed = before - body.bonds.len();
        }
        if let Some(body) = self.get_mut(b) {
            body.bonds.retain(|&x| x != a);
        }
        removed
    }

    /// Drop all bonds of `id`. Returns the distinct former partners.
    pub fn clear_bonds(&mut self, id: BodyId) -> Vec<BodyId> {
        let Some(body) = self.get_mut(id) else {
            return Vec::new();
        };
        let mut partners = std::mem::take(&mut body.bonds);
        partners.sort();
        partners.dedup();
        for &p in &partners {
            if let Some(pb) = self.get_mut(p) {
                pb.bonds.retain(|&x| x != id);
            }
        }
        partners
    }

    #[inline]
    pub fn bond_order(&self, a: BodyId, b: BodyId) -> usize {
        self.get(a).map(|body| body.bond_order_with(b)).unwrap_or(0)
    }

    #[inline]
    pub fn are_bonded(&self, a: BodyId, b: BodyId) -> bool {
        self.get(a).is_some_and(|body| body.bonds.contains(&b))
    }

    /// True when `a` and `b` share at least one bonded neighbor.
    pub fn share_neighbor(&self, a: BodyId, b: BodyId) -> bool {
        let (Some(ba), Some(bb)) = (self.get(a), self.get(b)) else {
            return false;
        };
        ba.bonds
            .iter()
            .any(|n| *n != b && *n != a && bb.bonds.contains(n))
    }

    /// Connected bond group containing `id`, in BFS order (starting with `id`).
    pub fn connected_group(&self, id: BodyId) -> Vec<BodyId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        seen.insert(id);
        queue.push_back(id);
        while let Some(cur) = queue.pop_front() {
            order.push(cur);
            if let Some(b) = self.get(cur) {
                for &n in &b.bonds {
                    if self.contains(n) && seen.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
        order
    }

    /// Partition of all bodies into connected bond groups, in body order.
    pub fn components(&self) -> Vec<Vec<BodyId>> {
        let mut seen: HashSet<BodyId> = HashSet::new();
        let mut out = Vec::new();
        for b in &self.bodies {
            if seen.contains(&b.id) {
                continue;
            }
            let group = self.connected_group(b.id);
            seen.extend(group.iter().copied());
            out.push(group);
        }
        out
    }

    /// True when every bond is reciprocated with the same multiplicity.
    pub fn bonds_symmetric(&self) -> bool {
        self.bodies.iter().all(|a| {
            a.bonds.iter().all(|&b| match self.get(b) {
                Some(other) => other.bond_order_with(a.id) == a.bond_order_with(b),
                None => false,
            })
        })
    }

    /// Mass-weighted centre of the given bodies.
    pub fn centroid(&self, ids: &[BodyId]) -> Vec3 {
        vector::weighted_mean(
            ids.iter()
                .filter_map(|&id| self.get(id))
                .map(|b| (b.mass, b.pos)),
        )
    }
}
