//! The crafting-chain planner.
//!
//! [`CraftPlanner`] owns the catalog, config and every per-pass buffer. One
//! call to [`CraftPlanner::compute`] runs a full pass:
//!
//! 1. early no-op checks and the relevance gate,
//! 2. recipe index rebuild for the snapshot's filtered list,
//! 3. depth-1 seeding in master-index order,
//! 4. layer-by-layer expansion up to `max_depth`,
//! 5. materialization into [`CraftableEntry`] values.
//!
//! Chains live in a [`ChainArena`] that is cleared at the start of every
//! pass. Scratch arrays are sized from `max_depth` and reused through
//! [`StampSet`] generations instead of being cleared.

use crate::catalog::RecipeCatalog;
use crate::chain::{ChainArena, ChainStep, RecipeChain};
use crate::config::{ConfigError, PlannerConfig};
use crate::cost::{available_for, is_recipe_affordable, CostResolver};
use crate::dominance::{Admission, DominanceIndex};
use crate::id::{ChainId, RecipeId, ResourceId};
use crate::mask::ResourceMask;
use crate::materialize::{materialize, CraftableEntry, EntryOrder, PlannedChain};
use crate::recipe_index::RecipeIndex;
use crate::snapshot::InventorySnapshot;
use crate::stamp::StampSet;
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// A chain with no remaining deficit is dropped when its weighted input
/// exceeds this multiple of its weighted output. Policy constant.
pub const INEFFICIENCY_FACTOR: u64 = 2;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// What changed since the last pass, as reported by the inventory observer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub indices: Vec<ResourceId>,
    /// Count the observer claims; a mismatch with `indices` is tolerated.
    pub reported_count: usize,
    /// Recompute regardless of relevance.
    pub force: bool,
}

impl ChangeSet {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    pub fn of(indices: impl IntoIterator<Item = ResourceId>) -> Self {
        let indices: Vec<ResourceId> = indices.into_iter().collect();
        Self {
            reported_count: indices.len(),
            indices,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The snapshot's filtered recipe list is empty.
    NoRecipes,
    /// The snapshot carries no physical stacks at all.
    NoInventory,
    /// Nothing that changed touches the last pass's inputs or outputs.
    Irrelevant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeOutcome {
    /// The pass did not run; the previous result list still stands.
    Skipped(SkipReason),
    Updated(Vec<CraftableEntry>),
}

impl ComputeOutcome {
    pub fn entries(&self) -> Option<&[CraftableEntry]> {
        match self {
            ComputeOutcome::Updated(entries) => Some(entries),
            ComputeOutcome::Skipped(_) => None,
        }
    }
}

/// Receives the result list whenever a pass runs.
pub trait CraftableSink {
    fn craftables_updated(&mut self, entries: &[CraftableEntry]);
}

impl<F: FnMut(&[CraftableEntry])> CraftableSink for F {
    fn craftables_updated(&mut self, entries: &[CraftableEntry]) {
        self(entries)
    }
}

/// Counters for the last completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub seeded: usize,
    pub expanded: usize,
    pub candidates_generated: usize,
    /// Candidates contributed by producers of missing bridge items.
    pub bridge_candidates: usize,
    pub trade_children: usize,
    pub chains_created: usize,
    pub accepted: usize,
    pub rejected_cap: usize,
    pub rejected_inefficient: usize,
    pub rejected_dominated: usize,
    pub pruned: usize,
    pub layers: u32,
}

// ---------------------------------------------------------------------------
// Scratch
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PassCache {
    recipes: Vec<RecipeId>,
    result_mask: ResourceMask,
    scrap: bool,
    pooling: bool,
}

/// Per-chain buffers reused across every expansion of a pass.
#[derive(Debug)]
struct Scratch {
    profile_keys: Vec<ResourceId>,
    profile_values: Vec<i32>,
    profile_len: usize,
    surplus_mask: ResourceMask,
    candidate_marks: StampSet,
    missing_marks: StampSet,
    candidates: Vec<RecipeId>,
    /// Bridge items with the count the consuming recipe needs.
    missing: Vec<(ResourceId, u32)>,
}

impl Scratch {
    fn new(catalog: &RecipeCatalog, max_depth: u32) -> Self {
        let total = catalog.space().total();
        let mut scratch = Self {
            profile_keys: Vec::new(),
            profile_values: Vec::new(),
            profile_len: 0,
            surplus_mask: ResourceMask::with_capacity(total),
            candidate_marks: StampSet::new(catalog.recipe_count()),
            missing_marks: StampSet::new(total),
            candidates: Vec::new(),
            missing: Vec::new(),
        };
        scratch.resize_profile(max_depth);
        scratch
    }

    /// Each node contributes at most three deltas.
    fn resize_profile(&mut self, max_depth: u32) {
        let len = 3 * max_depth as usize + 3;
        self.profile_keys.resize(len, ResourceId(0));
        self.profile_values.resize(len, 0);
        self.profile_len = 0;
    }

    fn profile(&self) -> impl Iterator<Item = (ResourceId, i32)> + '_ {
        self.profile_keys[..self.profile_len]
            .iter()
            .copied()
            .zip(self.profile_values[..self.profile_len].iter().copied())
    }

    /// Coalesce ancestor deltas into the surplus/deficit profile.
    fn build_profile(&mut self, arena: &ChainArena, id: ChainId) {
        self.profile_len = 0;
        for node in arena.ancestors(id) {
            for delta in node.deltas.iter().filter(|d| d.amount != 0) {
                let used = &self.profile_keys[..self.profile_len];
                match used.iter().position(|&k| k == delta.index) {
                    Some(pos) => self.profile_values[pos] += delta.amount,
                    None if self.profile_len < self.profile_keys.len() => {
                        self.profile_keys[self.profile_len] = delta.index;
                        self.profile_values[self.profile_len] = delta.amount;
                        self.profile_len += 1;
                    }
                    None => {}
                }
            }
        }

        self.surplus_mask.clear();
        for i in 0..self.profile_len {
            if self.profile_values[i] > 0 {
                self.surplus_mask.set(self.profile_keys[i]);
            }
        }
    }

    /// Collect candidate next steps for the profiled chain: consumers of its
    /// surplus, producers of its deficits, and a bounded number of producers
    /// for missing bridge items. Returns how many candidates the bridge
    /// producers added.
    fn build_candidates(
        &mut self,
        catalog: &RecipeCatalog,
        index: &RecipeIndex,
        have_mask: &ResourceMask,
        config: &PlannerConfig,
    ) -> usize {
        self.candidate_marks.begin();
        self.missing_marks.begin();
        self.candidates.clear();
        self.missing.clear();

        for p in 0..self.profile_len {
            let (key, value) = (self.profile_keys[p], self.profile_values[p]);
            if value > 0 {
                for &id in catalog.consumers_of(key) {
                    if !index.is_active(id) {
                        continue;
                    }
                    if self.candidate_marks.mark(id.index()) {
                        self.candidates.push(id);
                    }
                    let Some(recipe) = catalog.get_recipe(id) else {
                        continue;
                    };
                    for ing in &recipe.ingredients {
                        if ing.index == key
                            || have_mask.contains(ing.index)
                            || self.surplus_mask.contains(ing.index)
                        {
                            continue;
                        }
                        if self.missing_marks.mark(ing.index.index()) {
                            self.missing.push((ing.index, ing.count));
                        }
                    }
                }
            } else if value < 0 {
                for &id in catalog.producers_of(key) {
                    if index.is_active(id) && self.candidate_marks.mark(id.index()) {
                        self.candidates.push(id);
                    }
                }
            }
        }

        let mut bridged = 0;
        for &(item, _) in self.missing.iter().take(config.max_bridge_items_per_chain) {
            let producers = catalog
                .producers_of(item)
                .iter()
                .filter(|&&id| index.is_active(id))
                .take(config.max_producers_per_bridge);
            for &id in producers {
                if self.candidate_marks.mark(id.index()) {
                    self.candidates.push(id);
                    bridged += 1;
                }
            }
        }
        bridged
    }

    /// Trade targets for the profiled chain: deficits of exactly one, then
    /// bridge items needed once. Each index appears once.
    fn trade_targets(&self) -> Vec<ResourceId> {
        let deficits = self
            .profile()
            .filter(|&(_, value)| value == -1)
            .map(|(key, _)| key);
        let bridges = self
            .missing
            .iter()
            .filter(|&&(_, need)| need == 1)
            .map(|&(key, _)| key);
        let mut targets: Vec<ResourceId> = Vec::new();
        for key in deficits.chain(bridges) {
            if !targets.contains(&key) {
                targets.push(key);
            }
        }
        targets
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CraftPlanner {
    catalog: RecipeCatalog,
    config: PlannerConfig,
    index: RecipeIndex,
    arena: ChainArena,
    dominance: DominanceIndex,
    resolver: CostResolver,
    scratch: Scratch,
    /// Live accepted chains per result, in acceptance order.
    discovered: BTreeMap<ResourceId, Vec<ChainId>>,
    pruned: HashSet<ChainId>,
    queue: VecDeque<ChainId>,
    have_mask: ResourceMask,
    cache: Option<PassCache>,
    stats: PlanStats,
    entry_order: Option<EntryOrder>,
}

impl CraftPlanner {
    pub fn new(catalog: RecipeCatalog, config: PlannerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            index: RecipeIndex::for_catalog(&catalog),
            resolver: CostResolver::new(config.max_depth),
            scratch: Scratch::new(&catalog, config.max_depth),
            have_mask: ResourceMask::with_capacity(catalog.space().total()),
            arena: ChainArena::new(),
            dominance: DominanceIndex::new(),
            discovered: BTreeMap::new(),
            pruned: HashSet::new(),
            queue: VecDeque::new(),
            cache: None,
            stats: PlanStats::default(),
            entry_order: None,
            catalog,
            config,
        })
    }

    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Counters for the most recent pass that actually ran.
    pub fn last_stats(&self) -> PlanStats {
        self.stats
    }

    /// Replace the default entry order (result index, then depth).
    pub fn set_entry_order(&mut self, order: Option<EntryOrder>) {
        self.entry_order = order;
    }

    /// Swap in a rebuilt catalog. Drops all per-pass state; the next
    /// compute always runs.
    pub fn set_catalog(&mut self, catalog: RecipeCatalog) {
        self.index = RecipeIndex::for_catalog(&catalog);
        self.scratch = Scratch::new(&catalog, self.config.max_depth);
        self.have_mask = ResourceMask::with_capacity(catalog.space().total());
        self.catalog = catalog;
        self.reset_pass();
        self.cache = None;
    }

    /// Change the depth ceiling, resizing depth-derived scratch buffers.
    pub fn set_max_depth(&mut self, max_depth: u32) -> Result<(), ConfigError> {
        let config = PlannerConfig {
            max_depth,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        self.resolver.set_max_depth(max_depth);
        self.scratch.resize_profile(max_depth);
        self.cache = None;
        Ok(())
    }

    /// Accepted chains for `result` from the last pass, before the
    /// materializer's filtering.
    pub fn chains_for(&self, result: ResourceId) -> Vec<PlannedChain> {
        self.discovered
            .get(&result)
            .map(|ids| {
                ids.iter()
                    .filter_map(|&id| PlannedChain::from_arena(&self.arena, id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn accepted_count(&self, result: ResourceId) -> usize {
        self.discovered.get(&result).map_or(0, Vec::len)
    }

    /// Run a pass unless the gate decides nothing relevant changed.
    pub fn compute(&mut self, snapshot: &InventorySnapshot, changes: &ChangeSet) -> ComputeOutcome {
        if snapshot.recipes().is_empty() {
            return ComputeOutcome::Skipped(SkipReason::NoRecipes);
        }
        if snapshot.physical_stacks().is_empty() {
            return ComputeOutcome::Skipped(SkipReason::NoInventory);
        }
        if !self.should_recompute(snapshot, changes) {
            return ComputeOutcome::Skipped(SkipReason::Irrelevant);
        }
        if snapshot.space() != self.catalog.space() {
            warn!(
                snapshot = ?snapshot.space(),
                catalog = ?self.catalog.space(),
                "snapshot and catalog disagree on resource space"
            );
        }

        self.run_pass(snapshot);
        let entries = materialize(&self.arena, &self.discovered, snapshot, self.entry_order);
        self.store_cache(snapshot);
        debug!(
            seeded = self.stats.seeded,
            accepted = self.stats.accepted,
            pruned = self.stats.pruned,
            layers = self.stats.layers,
            peak_demand = self.index.peak_demand(),
            entries = entries.len(),
            "planner pass complete"
        );
        ComputeOutcome::Updated(entries)
    }

    /// [`compute`](Self::compute), also pushing the entries to `sink` when
    /// the pass runs.
    pub fn compute_into<S: CraftableSink + ?Sized>(
        &mut self,
        snapshot: &InventorySnapshot,
        changes: &ChangeSet,
        sink: &mut S,
    ) -> ComputeOutcome {
        let outcome = self.compute(snapshot, changes);
        if let ComputeOutcome::Updated(entries) = &outcome {
            sink.craftables_updated(entries);
        }
        outcome
    }

    fn should_recompute(&self, snapshot: &InventorySnapshot, changes: &ChangeSet) -> bool {
        if changes.force {
            return true;
        }
        let Some(cache) = &self.cache else {
            return true;
        };
        if cache.recipes.as_slice() != snapshot.recipes()
            || cache.scrap != self.scrap_enabled(snapshot)
            || cache.pooling != self.pooling_enabled(snapshot)
        {
            return true;
        }
        if changes.indices.is_empty() {
            if changes.reported_count > 0 {
                warn!(
                    reported = changes.reported_count,
                    "change count reported without indices, recomputing"
                );
                return true;
            }
            return false;
        }

        let overrides = snapshot.display_overrides();
        changes.indices.iter().any(|&i| {
            self.index.ingredient_mask().contains(i)
                || cache.result_mask.contains(i)
                || overrides.iter().any(|(&from, &to)| from == i || to == i)
        })
    }

    fn store_cache(&mut self, snapshot: &InventorySnapshot) {
        let mut result_mask = ResourceMask::with_capacity(self.catalog.space().total());
        for &result in self.discovered.keys() {
            result_mask.set(result);
            result_mask.set(snapshot.display_index(result));
        }
        self.cache = Some(PassCache {
            recipes: snapshot.recipes().to_vec(),
            result_mask,
            scrap: self.scrap_enabled(snapshot),
            pooling: self.pooling_enabled(snapshot),
        });
    }

    fn scrap_enabled(&self, snapshot: &InventorySnapshot) -> bool {
        self.config.scrap_drones && snapshot.can_scrap_drones()
    }

    fn pooling_enabled(&self, snapshot: &InventorySnapshot) -> bool {
        self.config.ally_pooling && snapshot.pooling_enabled()
    }

    fn reset_pass(&mut self) {
        self.arena.clear();
        self.dominance.clear();
        self.discovered.clear();
        self.pruned.clear();
        self.queue.clear();
        self.stats = PlanStats::default();
    }

    fn run_pass(&mut self, snapshot: &InventorySnapshot) {
        self.reset_pass();
        self.index.rebuild(&self.catalog, snapshot.recipes());

        let scrap = self.scrap_enabled(snapshot);
        let pooling = self.pooling_enabled(snapshot);
        self.have_mask.clear();
        self.have_mask.union_with(snapshot.owned_mask());
        if scrap {
            self.have_mask.union_with(snapshot.potential_mask());
        }

        for i in 0..self.index.active().len() {
            let id = self.index.active()[i];
            self.seed(id, snapshot, scrap);
        }
        if !self.queue.is_empty() {
            self.stats.layers = 1;
        }

        for depth in 2..=self.config.max_depth {
            if self.queue.is_empty() {
                break;
            }
            let layer: Vec<ChainId> = self.queue.drain(..).collect();
            for parent in layer {
                if !self.pruned.contains(&parent) {
                    self.expand(parent, snapshot, scrap, pooling);
                }
            }
            if self.queue.is_empty() {
                break;
            }
            self.stats.layers = depth;
        }
        self.queue.clear();
    }

    fn seed(&mut self, id: RecipeId, snapshot: &InventorySnapshot, scrap: bool) {
        let Some(recipe) = self.catalog.get_recipe(id) else {
            debug!(?id, "active recipe missing from catalog");
            return;
        };
        if !self.have_mask.covers(self.index.req_mask(id))
            || !is_recipe_affordable(recipe, snapshot, scrap)
        {
            return;
        }
        let step = ChainStep::Craft(id);
        let Some(cost) = self
            .resolver
            .resolve(&self.arena, None, step, &self.catalog, snapshot, scrap)
        else {
            return;
        };
        self.stats.seeded += 1;
        self.stats.chains_created += 1;
        self.add_chain_to_results(cost.into_chain(None, step));
    }

    fn expand(
        &mut self,
        parent: ChainId,
        snapshot: &InventorySnapshot,
        scrap: bool,
        pooling: bool,
    ) {
        let Some(depth) = self.arena.get(parent).map(|n| n.depth) else {
            return;
        };
        self.stats.expanded += 1;
        self.scratch.build_profile(&self.arena, parent);
        self.stats.bridge_candidates +=
            self.scratch
                .build_candidates(&self.catalog, &self.index, &self.have_mask, &self.config);
        self.stats.candidates_generated += self.scratch.candidates.len();

        for i in 0..self.scratch.candidates.len() {
            let id = self.scratch.candidates[i];
            if !self
                .have_mask
                .covers_with(&self.scratch.surplus_mask, self.index.req_mask(id))
            {
                continue;
            }
            if self.index.needs_count_check(id) && !self.has_counts_for(id, parent, snapshot, scrap)
            {
                continue;
            }
            let step = ChainStep::Craft(id);
            let Some(cost) =
                self.resolver
                    .resolve(&self.arena, Some(parent), step, &self.catalog, snapshot, scrap)
            else {
                continue;
            };
            self.stats.chains_created += 1;
            self.add_chain_to_results(cost.into_chain(Some((parent, depth)), step));
        }

        if pooling {
            self.expand_trades(parent, depth, snapshot, scrap);
        }
    }

    /// A+A recipes: bit presence is not enough, the count has to be there.
    fn has_counts_for(
        &self,
        id: RecipeId,
        parent: ChainId,
        snapshot: &InventorySnapshot,
        scrap: bool,
    ) -> bool {
        let Some(recipe) = self.catalog.get_recipe(id) else {
            return false;
        };
        recipe
            .ingredients
            .iter()
            .filter(|ing| ing.count >= 2)
            .all(|ing| available_for(&self.arena, Some(parent), ing.index, snapshot, scrap) >= ing.count)
    }

    /// Bridge one-unit gaps with ally trades: profile deficits of exactly one
    /// and missing bridge items needed once, when nothing local can cover
    /// them. First donor that can trade wins.
    fn expand_trades(
        &mut self,
        parent: ChainId,
        depth: u32,
        snapshot: &InventorySnapshot,
        scrap: bool,
    ) {
        let targets = self.scratch.trade_targets();
        let mut added = 0;
        for target in targets {
            if added >= self.config.max_trade_children_per_chain {
                break;
            }
            if available_for(&self.arena, Some(parent), target, snapshot, scrap) > 0 {
                continue;
            }
            for ally in snapshot.allies() {
                let step = ChainStep::Trade {
                    donor: ally.donor,
                    index: target,
                };
                let Some(cost) =
                    self.resolver
                        .resolve(&self.arena, Some(parent), step, &self.catalog, snapshot, scrap)
                else {
                    continue;
                };
                self.stats.chains_created += 1;
                self.stats.trade_children += 1;
                added += 1;
                self.add_chain_to_results(cost.into_chain(Some((parent, depth)), step));
                break;
            }
        }
    }

    /// Admit a chain: cap check, inefficiency gate, then dominance. Returns
    /// the new chain's id if it was kept.
    pub fn add_chain_to_results(&mut self, chain: RecipeChain) -> Option<ChainId> {
        let result = chain.result;
        if self.accepted_count(result) >= self.config.max_chains_per_result {
            self.stats.rejected_cap += 1;
            return None;
        }
        if self.is_chain_inefficient(&chain) {
            self.stats.rejected_inefficient += 1;
            return None;
        }

        let id = self.arena.insert(chain);
        let admission = match self.arena.get(id) {
            Some(node) => self.dominance.admit(id, node),
            None => return None,
        };
        match admission {
            Admission::Rejected => {
                self.arena.remove(id);
                self.stats.rejected_dominated += 1;
                None
            }
            Admission::Accepted { pruned } => {
                for old in pruned {
                    self.prune(old);
                }
                self.discovered.entry(result).or_default().push(id);
                self.queue.push_back(id);
                self.stats.accepted += 1;
                Some(id)
            }
        }
    }

    /// Retire a dominated chain. The node stays in the arena since accepted
    /// children may still point at it.
    fn prune(&mut self, id: ChainId) {
        let Some(result) = self.arena.get(id).map(|n| n.result) else {
            return;
        };
        if let Some(ids) = self.discovered.get_mut(&result) {
            ids.retain(|&kept| kept != id);
            if ids.is_empty() {
                self.discovered.remove(&result);
            }
        }
        if self.pruned.insert(id) {
            self.stats.pruned += 1;
        }
    }

    /// True when the chain owes nothing anywhere yet spends more than
    /// [`INEFFICIENCY_FACTOR`] times the tier-weighted value it nets.
    pub fn is_chain_inefficient(&self, chain: &RecipeChain) -> bool {
        let mut net: BTreeMap<ResourceId, i64> = BTreeMap::new();
        let ancestors = chain.parent.into_iter().flat_map(|p| self.arena.ancestors(p));
        for delta in chain
            .deltas
            .iter()
            .chain(ancestors.flat_map(|n| n.deltas.iter()))
            .filter(|d| d.amount != 0)
        {
            *net.entry(delta.index).or_default() += delta.amount as i64;
        }
        if net.values().any(|&v| v < 0) {
            return false;
        }

        let weight = |id: ResourceId| self.catalog.weight(id) as u64;
        let input: u64 = chain
            .physical_cost
            .iter()
            .map(|i| weight(i.index) * i.count as u64)
            .chain(
                chain
                    .drone_cost
                    .iter()
                    .map(|d| weight(d.scrap_index) * d.units as u64),
            )
            .chain(
                chain
                    .trade_cost
                    .iter()
                    .map(|t| weight(t.index) * t.trades_required as u64),
            )
            .sum();
        let output: u64 = net
            .iter()
            .filter(|&(_, &v)| v > 0)
            .map(|(&id, &v)| weight(id) * v as u64)
            .sum();
        input > INEFFICIENCY_FACTOR * output
    }
}
