//! Dominance bookkeeping for accepted chains.
//!
//! Two structures share one admission call:
//!
//! - an exact-shape table keyed by the result and a structural hash of the
//!   cost vectors, which settles same-shape comparisons in one lookup;
//! - frontier buckets keyed by the three vector lengths, which catch
//!   Pareto dominance across different shapes.
//!
//! Costs are flattened into [`CostVectors`] so both structures compare
//! plain sorted `(key, quantity)` lists.

use crate::chain::RecipeChain;
use crate::id::{ChainId, ResourceId};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One cost dimension: sorted by key, coalesced, quantities non-zero.
pub type CostDim = Vec<(u64, u32)>;

/// The three cost dimensions of a chain in comparable form.
///
/// Physical costs are keyed by resource index, drone costs by the scrap
/// index with the number of drones consumed, and trades by
/// `(donor << 32) | index`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostVectors {
    pub physical: CostDim,
    pub drone: CostDim,
    pub trade: CostDim,
}

impl CostVectors {
    pub fn from_chain(chain: &RecipeChain) -> Self {
        let physical = chain
            .physical_cost
            .iter()
            .filter(|i| i.count > 0)
            .map(|i| (i.index.0 as u64, i.count))
            .collect();

        let mut drone: CostDim = Vec::with_capacity(chain.drone_cost.len());
        for d in &chain.drone_cost {
            let key = d.scrap_index.0 as u64;
            match drone.binary_search_by_key(&key, |&(k, _)| k) {
                Ok(pos) => drone[pos].1 += d.count,
                Err(pos) => drone.insert(pos, (key, d.count)),
            }
        }

        let trade = chain
            .trade_cost
            .iter()
            .filter(|t| t.trades_required > 0)
            .map(|t| (((t.donor.0 as u64) << 32) | t.index.0 as u64, t.trades_required))
            .collect();

        Self {
            physical,
            drone,
            trade,
        }
    }

    pub fn lens(&self) -> [usize; 3] {
        [self.physical.len(), self.drone.len(), self.trade.len()]
    }

    /// Lengths packed 10 bits each: `phys | drone << 10 | trade << 20`.
    pub fn packed_len(&self) -> u32 {
        pack_lens(self.lens())
    }

    fn dims(&self) -> [&CostDim; 3] {
        [&self.physical, &self.drone, &self.trade]
    }

    /// Same keys in every dimension, quantities ignored.
    pub fn same_shape(&self, other: &CostVectors) -> bool {
        self.dims().iter().zip(other.dims()).all(|(a, b)| {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.0 == y.0)
        })
    }
}

const LEN_MASK: u32 = (1 << 10) - 1;

pub fn pack_lens(lens: [usize; 3]) -> u32 {
    let clamp = |n: usize| (n as u32).min(LEN_MASK);
    clamp(lens[0]) | (clamp(lens[1]) << 10) | (clamp(lens[2]) << 20)
}

pub fn unpack_lens(packed: u32) -> [u32; 3] {
    [
        packed & LEN_MASK,
        (packed >> 10) & LEN_MASK,
        (packed >> 20) & LEN_MASK,
    ]
}

/// Merge-compare one dimension. Returns false as soon as `a` is worse
/// somewhere; sets `strict` when `a` is better somewhere.
fn dominates_dim(a: &CostDim, b: &CostDim, strict: &mut bool) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        match (a.get(i), b.get(j)) {
            (Some(&(ka, qa)), Some(&(kb, qb))) => match ka.cmp(&kb) {
                Ordering::Equal => {
                    if qa > qb {
                        return false;
                    }
                    if qa < qb {
                        *strict = true;
                    }
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    if qa > 0 {
                        return false;
                    }
                    i += 1;
                }
                Ordering::Greater => {
                    if qb > 0 {
                        *strict = true;
                    }
                    j += 1;
                }
            },
            (Some(&(_, qa)), None) => {
                if qa > 0 {
                    return false;
                }
                i += 1;
            }
            (None, Some(&(_, qb))) => {
                if qb > 0 {
                    *strict = true;
                }
                j += 1;
            }
            (None, None) => break,
        }
    }
    true
}

/// `a` Pareto-dominates `b`: no worse in any entry of any dimension and
/// strictly better in at least one.
pub fn dominates(a: &CostVectors, b: &CostVectors) -> bool {
    let mut strict = false;
    a.dims()
        .iter()
        .zip(b.dims())
        .all(|(da, db)| dominates_dim(da, db, &mut strict))
        && strict
}

/// Order two same-shape cost vectors: `Less` if `a` is uniformly no worse and
/// better somewhere, `Equal` if identical, `None` if incomparable.
fn compare_same_shape(a: &CostVectors, b: &CostVectors) -> Option<Ordering> {
    let mut result = Ordering::Equal;
    for (da, db) in a.dims().iter().zip(b.dims()) {
        for (&(_, qa), &(_, qb)) in da.iter().zip(db.iter()) {
            match (result, qa.cmp(&qb)) {
                (_, Ordering::Equal) => {}
                (Ordering::Equal, ord) => result = ord,
                (current, ord) if current == ord => {}
                _ => return None,
            }
        }
    }
    Some(result)
}

/// Structural signature of a chain's cost: result plus two independent
/// hashes over the key sets, plus packed vector lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CostShapeKey {
    pub result: ResourceId,
    pub result_count: u32,
    pub h1: u32,
    pub h2: u32,
    pub lens: u32,
}

impl CostShapeKey {
    pub fn new(result: ResourceId, result_count: u32, costs: &CostVectors) -> Self {
        let mut h1: u32 = 0x811c_9dc5;
        let mut h2: u32 = 0x9e37_79b9;
        for (dim, vec) in costs.dims().iter().enumerate() {
            for word in std::iter::once(0xfeed_0000 | dim as u32).chain(
                vec.iter()
                    .flat_map(|&(k, _)| [k as u32, (k >> 32) as u32]),
            ) {
                for byte in word.to_le_bytes() {
                    h1 = (h1 ^ byte as u32).wrapping_mul(0x0100_0193);
                }
                h2 = (h2 ^ word).rotate_left(13).wrapping_mul(0x85eb_ca6b);
            }
        }
        Self {
            result,
            result_count,
            h1,
            h2,
            lens: costs.packed_len(),
        }
    }
}

/// Best-known chain for one cost shape.
#[derive(Debug, Clone)]
pub struct BestCostRecord {
    pub chain: ChainId,
    pub costs: CostVectors,
}

/// Outcome of submitting a chain to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Kept. Previously kept chains it dominated are listed for pruning.
    Accepted { pruned: Vec<ChainId> },
    /// An equal or better chain is already kept.
    Rejected,
}

type FrontierBuckets = HashMap<u32, Vec<(ChainId, CostVectors)>>;

#[derive(Debug, Default)]
pub struct DominanceIndex {
    shapes: HashMap<CostShapeKey, BestCostRecord>,
    frontier: HashMap<(ResourceId, u32), FrontierBuckets>,
}

impl DominanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.frontier.clear();
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Chains currently on the frontier for one result.
    pub fn frontier_len(&self, result: ResourceId, result_count: u32) -> usize {
        self.frontier
            .get(&(result, result_count))
            .map(|buckets| buckets.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Submit `chain` (already stored under `id`) for admission.
    pub fn admit(&mut self, id: ChainId, chain: &RecipeChain) -> Admission {
        let costs = CostVectors::from_chain(chain);
        let shape = CostShapeKey::new(chain.result, chain.result_count, &costs);

        let mut replaces_shape = false;
        if let Some(best) = self.shapes.get(&shape) {
            if best.costs.same_shape(&costs) {
                match compare_same_shape(&costs, &best.costs) {
                    Some(Ordering::Equal) | Some(Ordering::Greater) => return Admission::Rejected,
                    Some(Ordering::Less) => replaces_shape = true,
                    None => {}
                }
            }
        }

        let frontier_key = (chain.result, chain.result_count);
        let lens = unpack_lens(costs.packed_len());
        if let Some(buckets) = self.frontier.get(&frontier_key) {
            let dominated = buckets.iter().any(|(&packed, entries)| {
                let bucket = unpack_lens(packed);
                bucket.iter().zip(lens).all(|(&b, c)| b <= c)
                    && entries.iter().any(|(_, kept)| dominates(kept, &costs))
            });
            if dominated {
                return Admission::Rejected;
            }
        }

        let mut pruned = Vec::new();
        let buckets = self.frontier.entry(frontier_key).or_default();
        for (&packed, entries) in buckets.iter_mut() {
            let bucket = unpack_lens(packed);
            if !bucket.iter().zip(lens).all(|(&b, c)| b >= c) {
                continue;
            }
            entries.retain(|(kept_id, kept)| {
                if dominates(&costs, kept) {
                    pruned.push(*kept_id);
                    false
                } else {
                    true
                }
            });
        }
        buckets.retain(|_, entries| !entries.is_empty());
        buckets
            .entry(costs.packed_len())
            .or_default()
            .push((id, costs.clone()));

        if !pruned.is_empty() {
            self.shapes.retain(|_, best| !pruned.contains(&best.chain));
        }
        if replaces_shape || !self.shapes.contains_key(&shape) {
            if let Some(old) = self.shapes.insert(shape, BestCostRecord { chain: id, costs }) {
                if old.chain != id && !pruned.contains(&old.chain) {
                    self.drop_from_frontier(frontier_key, old.chain);
                    pruned.push(old.chain);
                }
            }
        }

        Admission::Accepted { pruned }
    }

    fn drop_from_frontier(&mut self, key: (ResourceId, u32), id: ChainId) {
        if let Some(buckets) = self.frontier.get_mut(&key) {
            for entries in buckets.values_mut() {
                entries.retain(|(kept, _)| *kept != id);
            }
            buckets.retain(|_, entries| !entries.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Ingredient;
    use crate::chain::{ChainArena, ChainStep, Delta, DroneRequirement, TradeRequirement};
    use crate::id::{DonorId, DroneKey, RecipeId};

    fn dim(entries: &[(u64, u32)]) -> CostDim {
        entries.to_vec()
    }

    fn costs(p: &[(u64, u32)], d: &[(u64, u32)], t: &[(u64, u32)]) -> CostVectors {
        CostVectors {
            physical: dim(p),
            drone: dim(d),
            trade: dim(t),
        }
    }

    fn chain(physical: &[(u32, u32)]) -> RecipeChain {
        RecipeChain {
            parent: None,
            step: ChainStep::Craft(RecipeId(0)),
            depth: 1,
            result: ResourceId(9),
            result_count: 1,
            physical_cost: physical
                .iter()
                .map(|&(i, c)| Ingredient::new(ResourceId(i), c))
                .collect(),
            drone_cost: Vec::new(),
            trade_cost: Vec::new(),
            drone_overflow: Vec::new(),
            deltas: [Delta::default(); 3],
        }
    }

    #[test]
    fn strict_subset_dominates() {
        let a = costs(&[(1, 1)], &[], &[]);
        let b = costs(&[(1, 2)], &[], &[]);
        assert!(dominates(&a, &b));
        assert!(!dominates(&b, &a));
    }

    #[test]
    fn equal_does_not_dominate() {
        let a = costs(&[(1, 1)], &[(4, 1)], &[]);
        assert!(!dominates(&a, &a.clone()));
    }

    #[test]
    fn extra_key_blocks_dominance() {
        // 2 coins vs 1 coin + 1 drone: incomparable.
        let a = costs(&[(1, 2)], &[], &[]);
        let b = costs(&[(1, 1)], &[(3, 1)], &[]);
        assert!(!dominates(&a, &b));
        assert!(!dominates(&b, &a));
    }

    #[test]
    fn missing_key_is_improvement() {
        let a = costs(&[(1, 1)], &[], &[]);
        let b = costs(&[(1, 1)], &[], &[(7, 1)]);
        assert!(dominates(&a, &b));
    }

    #[test]
    fn vectors_flatten_all_dimensions() {
        let mut c = chain(&[(2, 1)]);
        let drone = |minion| DroneRequirement {
            key: DroneKey::new(1, minion),
            scrap_index: ResourceId(5),
            count: 1,
            capacity: 2,
            units: 1,
        };
        c.drone_cost = vec![drone(1), drone(2)];
        c.trade_cost = vec![TradeRequirement {
            donor: DonorId(3),
            index: ResourceId(4),
            trades_required: 1,
        }];
        let v = CostVectors::from_chain(&c);
        assert_eq!(v.physical, vec![(2, 1)]);
        assert_eq!(v.drone, vec![(5, 2)]);
        assert_eq!(v.trade, vec![((3u64 << 32) | 4, 1)]);
        assert_eq!(unpack_lens(v.packed_len()), [1, 1, 1]);
    }

    #[test]
    fn shape_key_ignores_quantities() {
        let a = costs(&[(1, 1)], &[], &[]);
        let b = costs(&[(1, 5)], &[], &[]);
        let c = costs(&[(2, 1)], &[], &[]);
        let r = ResourceId(0);
        assert_eq!(CostShapeKey::new(r, 1, &a), CostShapeKey::new(r, 1, &b));
        assert_ne!(CostShapeKey::new(r, 1, &a), CostShapeKey::new(r, 1, &c));
    }

    #[test]
    fn worse_same_shape_rejected() {
        let mut arena = ChainArena::new();
        let mut index = DominanceIndex::new();
        let cheap = chain(&[(1, 1)]);
        let dear = chain(&[(1, 2)]);
        let cheap_id = arena.insert(cheap.clone());
        let dear_id = arena.insert(dear.clone());
        assert_eq!(
            index.admit(cheap_id, &cheap),
            Admission::Accepted { pruned: vec![] }
        );
        assert_eq!(index.admit(dear_id, &dear), Admission::Rejected);
        assert_eq!(index.frontier_len(ResourceId(9), 1), 1);
    }

    #[test]
    fn better_same_shape_replaces() {
        let mut arena = ChainArena::new();
        let mut index = DominanceIndex::new();
        let cheap = chain(&[(1, 1)]);
        let dear = chain(&[(1, 2)]);
        let dear_id = arena.insert(dear.clone());
        let cheap_id = arena.insert(cheap.clone());
        index.admit(dear_id, &dear);
        assert_eq!(
            index.admit(cheap_id, &cheap),
            Admission::Accepted {
                pruned: vec![dear_id]
            }
        );
        assert_eq!(index.frontier_len(ResourceId(9), 1), 1);
        assert_eq!(index.shape_count(), 1);
    }

    #[test]
    fn cross_shape_dominance_rejects() {
        let mut arena = ChainArena::new();
        let mut index = DominanceIndex::new();
        let lean = chain(&[(1, 1)]);
        let bloated = chain(&[(1, 1), (2, 1)]);
        let lean_id = arena.insert(lean.clone());
        let bloated_id = arena.insert(bloated.clone());
        index.admit(lean_id, &lean);
        assert_eq!(index.admit(bloated_id, &bloated), Admission::Rejected);
    }

    #[test]
    fn cross_shape_dominance_prunes() {
        let mut arena = ChainArena::new();
        let mut index = DominanceIndex::new();
        let lean = chain(&[(1, 1)]);
        let bloated = chain(&[(1, 1), (2, 1)]);
        let bloated_id = arena.insert(bloated.clone());
        let lean_id = arena.insert(lean.clone());
        index.admit(bloated_id, &bloated);
        assert_eq!(
            index.admit(lean_id, &lean),
            Admission::Accepted {
                pruned: vec![bloated_id]
            }
        );
        assert_eq!(index.shape_count(), 1);
    }

    #[test]
    fn incomparable_chains_coexist() {
        let mut arena = ChainArena::new();
        let mut index = DominanceIndex::new();
        let a = chain(&[(1, 2)]);
        let b = chain(&[(2, 1)]);
        let a_id = arena.insert(a.clone());
        let b_id = arena.insert(b.clone());
        index.admit(a_id, &a);
        assert!(matches!(index.admit(b_id, &b), Admission::Accepted { .. }));
        assert_eq!(index.frontier_len(ResourceId(9), 1), 2);
    }
}
