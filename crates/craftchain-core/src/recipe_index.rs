//! Per-pass view of the active recipe subset.
//!
//! The catalog owns static adjacency. This index only tracks which master
//! recipes are active this pass and their requirement masks, so rebuilding it
//! costs O(active recipes) plus a fill of the demand array.

use crate::catalog::RecipeCatalog;
use crate::id::{RecipeId, ResourceId};
use crate::mask::ResourceMask;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RecipeIndex {
    active: Vec<bool>,
    active_list: Vec<RecipeId>,
    req_masks: Vec<ResourceMask>,
    needs_count_check: Vec<bool>,
    max_demand: Vec<u32>,
    ingredient_mask: ResourceMask,
}

impl RecipeIndex {
    /// Size the index for a catalog. Must be called after every catalog change.
    pub fn for_catalog(catalog: &RecipeCatalog) -> Self {
        let masters = catalog.recipe_count();
        let total = catalog.space().total();
        Self {
            active: vec![false; masters],
            active_list: Vec::new(),
            req_masks: vec![ResourceMask::with_capacity(total); masters],
            needs_count_check: vec![false; masters],
            max_demand: vec![0; total],
            ingredient_mask: ResourceMask::with_capacity(total),
        }
    }

    /// Activate exactly the recipes in `filtered`. Unknown or repeated master
    /// indices are skipped.
    pub fn rebuild(&mut self, catalog: &RecipeCatalog, filtered: &[RecipeId]) {
        for id in self.active_list.drain(..) {
            self.active[id.index()] = false;
        }
        self.max_demand.fill(0);
        self.ingredient_mask.clear();

        for &id in filtered {
            let Some(recipe) = catalog.get_recipe(id) else {
                debug!(?id, "skipping unknown recipe in filtered list");
                continue;
            };
            if id.index() >= self.active.len() || self.active[id.index()] {
                continue;
            }
            self.active[id.index()] = true;
            self.active_list.push(id);

            let mask = &mut self.req_masks[id.index()];
            mask.clear();
            for ing in &recipe.ingredients {
                mask.set(ing.index);
                self.ingredient_mask.set(ing.index);
                if let Some(slot) = self.max_demand.get_mut(ing.index.index()) {
                    *slot = (*slot).max(ing.count);
                }
            }
            self.needs_count_check[id.index()] = recipe.needs_multiple_of_one();
        }
        self.active_list.sort_unstable();
    }

    pub fn is_active(&self, id: RecipeId) -> bool {
        self.active.get(id.index()).copied().unwrap_or(false)
    }

    /// Active recipes in master-index order.
    pub fn active(&self) -> &[RecipeId] {
        &self.active_list
    }

    pub fn req_mask(&self, id: RecipeId) -> &ResourceMask {
        &self.req_masks[id.index()]
    }

    /// Recipe needs two or more of a single ingredient (A+A).
    pub fn needs_count_check(&self, id: RecipeId) -> bool {
        self.needs_count_check
            .get(id.index())
            .copied()
            .unwrap_or(false)
    }

    /// Largest count any active recipe needs of `index`. Diagnostics only;
    /// nothing is sized from it.
    pub fn max_demand(&self, index: ResourceId) -> u32 {
        self.max_demand.get(index.index()).copied().unwrap_or(0)
    }

    /// Largest single-ingredient count across all active recipes.
    pub fn peak_demand(&self) -> u32 {
        self.max_demand.iter().copied().max().unwrap_or(0)
    }

    /// Union of every active recipe's ingredients.
    pub fn ingredient_mask(&self) -> &ResourceMask {
        &self.ingredient_mask
    }
}
