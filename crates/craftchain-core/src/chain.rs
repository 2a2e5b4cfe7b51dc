//! Chain nodes and the per-pass chain arena.
//!
//! A chain is a parent-linked list of steps. Many chains share a prefix, so
//! nodes live in a slot map and refer to their parent by [`ChainId`]. Nodes
//! are immutable once inserted; the whole arena is cleared at the start of
//! every compute pass.

use crate::catalog::Ingredient;
use crate::id::{ChainId, DonorId, DroneKey, RecipeId, ResourceId};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// One step of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainStep {
    /// Apply a catalog recipe.
    Craft(RecipeId),
    /// Receive one unit of `index` from ally `donor`.
    Trade { donor: DonorId, index: ResourceId },
}

impl ChainStep {
    pub fn is_trade(&self) -> bool {
        matches!(self, ChainStep::Trade { .. })
    }
}

/// One drone instance scrapped by a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DroneRequirement {
    pub key: DroneKey,
    pub scrap_index: ResourceId,
    /// Drones consumed by this entry. Always 1: one entry per instance.
    pub count: u32,
    /// Scrap units this drone yields.
    pub capacity: u32,
    /// Units of that yield actually applied to deficits by the step that
    /// scrapped it.
    pub units: u32,
}

/// Units received from one donor for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeRequirement {
    pub donor: DonorId,
    pub index: ResourceId,
    pub trades_required: u32,
}

/// Net change of one resource caused by a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Delta {
    pub index: ResourceId,
    pub amount: i32,
}

/// One node: `step` applied on top of `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeChain {
    pub parent: Option<ChainId>,
    pub step: ChainStep,
    /// 1-based; `parent.depth + 1`.
    pub depth: u32,
    pub result: ResourceId,
    pub result_count: u32,
    /// Owned stock consumed from root to here. Sorted by index, coalesced.
    pub physical_cost: Vec<Ingredient>,
    /// Drones scrapped from root to here, one entry per instance.
    pub drone_cost: Vec<DroneRequirement>,
    /// Ally trades from root to here. Sorted by (donor, index), coalesced.
    pub trade_cost: Vec<TradeRequirement>,
    /// Scrap units left over from drones scrapped so far, per index.
    pub drone_overflow: Vec<Ingredient>,
    /// This node's own effect: +result, -ingredient A, -ingredient B.
    /// Unused slots have amount 0.
    pub deltas: [Delta; 3],
}

impl RecipeChain {
    pub fn physical_spent(&self, index: ResourceId) -> u32 {
        sparse_count(&self.physical_cost, index)
    }

    pub fn overflow(&self, index: ResourceId) -> u32 {
        sparse_count(&self.drone_overflow, index)
    }

    /// Trades already taken from `donor`, across all items.
    pub fn trades_with(&self, donor: DonorId) -> u32 {
        self.trade_cost
            .iter()
            .filter(|t| t.donor == donor)
            .map(|t| t.trades_required)
            .sum()
    }

    /// Units of `index` already taken from `donor`.
    pub fn traded(&self, donor: DonorId, index: ResourceId) -> u32 {
        self.trade_cost
            .iter()
            .find(|t| t.donor == donor && t.index == index)
            .map(|t| t.trades_required)
            .unwrap_or(0)
    }
}

/// Count for `index` in a sorted sparse vector, or 0.
pub fn sparse_count(vec: &[Ingredient], index: ResourceId) -> u32 {
    vec.binary_search_by_key(&index, |i| i.index)
        .map(|pos| vec[pos].count)
        .unwrap_or(0)
}

/// Add `count` of `index` into a sorted sparse vector, coalescing.
pub fn sparse_add(vec: &mut Vec<Ingredient>, index: ResourceId, count: u32) {
    if count == 0 {
        return;
    }
    match vec.binary_search_by_key(&index, |i| i.index) {
        Ok(pos) => vec[pos].count += count,
        Err(pos) => vec.insert(pos, Ingredient::new(index, count)),
    }
}

/// Per-pass arena of chain nodes.
#[derive(Debug, Default)]
pub struct ChainArena {
    nodes: SlotMap<ChainId, RecipeChain>,
}

impl ChainArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chain: RecipeChain) -> ChainId {
        self.nodes.insert(chain)
    }

    pub fn get(&self, id: ChainId) -> Option<&RecipeChain> {
        self.nodes.get(id)
    }

    /// Remove a node nothing points at yet (a rejected candidate).
    pub fn remove(&mut self, id: ChainId) -> Option<RecipeChain> {
        self.nodes.remove(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node. Invalidates all outstanding ids.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Walk from `id` to the root, nearest first.
    pub fn ancestors(&self, id: ChainId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: Some(id),
        }
    }

    /// Sum of deltas for `index` over `id` and all its ancestors.
    pub fn net_surplus_for(&self, id: ChainId, index: ResourceId) -> i32 {
        self.ancestors(id)
            .flat_map(|node| node.deltas.iter())
            .filter(|d| d.amount != 0 && d.index == index)
            .map(|d| d.amount)
            .sum()
    }

    /// Net surplus of the chain's own result.
    pub fn result_surplus(&self, id: ChainId) -> i32 {
        match self.get(id) {
            Some(node) => self.net_surplus_for(id, node.result),
            None => 0,
        }
    }

    /// Steps from root to `id`.
    pub fn steps(&self, id: ChainId) -> Vec<ChainStep> {
        let mut steps: Vec<ChainStep> = self.ancestors(id).map(|n| n.step).collect();
        steps.reverse();
        steps
    }
}

/// Iterator over a chain's nodes, leaf to root.
pub struct Ancestors<'a> {
    arena: &'a ChainArena,
    next: Option<ChainId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a RecipeChain;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.get(self.next?)?;
        self.next = node.parent;
        Some(node)
    }
}
