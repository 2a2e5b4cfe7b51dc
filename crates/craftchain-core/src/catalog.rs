use crate::id::{RecipeId, ResourceId};
use crate::resource::{ResourceSpace, ResourceTier};
use serde::{Deserialize, Serialize};

/// A `(resource, count)` pair. Arrays of these are kept sorted by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ingredient {
    pub index: ResourceId,
    pub count: u32,
}

impl Ingredient {
    pub fn new(index: ResourceId, count: u32) -> Self {
        Self { index, count }
    }
}

/// A production rule: one or two ingredients in, `result_count` of `result` out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChefRecipe {
    pub result: ResourceId,
    pub result_count: u32,
    /// Sorted by index, coalesced, one or two entries.
    pub ingredients: Vec<Ingredient>,
}

impl ChefRecipe {
    /// Needed count of `index`, or 0.
    pub fn needs(&self, index: ResourceId) -> u32 {
        self.ingredients
            .iter()
            .find(|i| i.index == index)
            .map(|i| i.count)
            .unwrap_or(0)
    }

    /// True if any single ingredient is needed more than once (A+A recipes).
    pub fn needs_multiple_of_one(&self) -> bool {
        self.ingredients.iter().any(|i| i.count >= 2)
    }
}

/// Builder for constructing an immutable [`RecipeCatalog`].
#[derive(Debug)]
pub struct CatalogBuilder {
    space: ResourceSpace,
    tiers: Vec<ResourceTier>,
    recipes: Vec<ChefRecipe>,
    bad_tier: Option<ResourceId>,
}

impl CatalogBuilder {
    pub fn new(space: ResourceSpace) -> Self {
        let mut tiers = vec![ResourceTier::NoTier; space.total()];
        for slot in tiers.iter_mut().skip(space.item_count as usize) {
            *slot = ResourceTier::Equipment;
        }
        Self {
            space,
            tiers,
            recipes: Vec::new(),
            bad_tier: None,
        }
    }

    pub fn space(&self) -> ResourceSpace {
        self.space
    }

    /// Set the tier of a resource. Out-of-range indices are caught by `build`.
    pub fn set_tier(&mut self, id: ResourceId, tier: ResourceTier) -> &mut Self {
        match self.tiers.get_mut(id.index()) {
            Some(slot) => *slot = tier,
            None => self.bad_tier = self.bad_tier.or(Some(id)),
        }
        self
    }

    /// Register a recipe. Ingredients with the same index are merged, so
    /// `[(A,1), (A,1)]` becomes `[(A,2)]`. Returns its master index.
    pub fn add_recipe(
        &mut self,
        result: ResourceId,
        result_count: u32,
        ingredients: &[Ingredient],
    ) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        let mut merged: Vec<Ingredient> = Vec::with_capacity(ingredients.len());
        for ing in ingredients {
            match merged.iter_mut().find(|m| m.index == ing.index) {
                Some(m) => m.count += ing.count,
                None => merged.push(*ing),
            }
        }
        merged.sort_by_key(|i| i.index);
        self.recipes.push(ChefRecipe {
            result,
            result_count,
            ingredients: merged,
        });
        id
    }

    /// Finalize and build the immutable catalog.
    pub fn build(self) -> Result<RecipeCatalog, CatalogError> {
        let total = self.space.total();
        if let Some(id) = self.bad_tier {
            return Err(CatalogError::TierOutOfRange(id));
        }

        let mut producers_by_result: Vec<Vec<RecipeId>> = vec![Vec::new(); total];
        let mut consumers_by_ingredient: Vec<Vec<RecipeId>> = vec![Vec::new(); total];

        for (i, recipe) in self.recipes.iter().enumerate() {
            let id = RecipeId(i as u32);
            if recipe.ingredients.is_empty() || recipe.ingredients.len() > 2 {
                return Err(CatalogError::IngredientArity {
                    recipe: id,
                    count: recipe.ingredients.len(),
                });
            }
            if recipe.result_count == 0 {
                return Err(CatalogError::ZeroCount(id));
            }
            if !self.space.contains(recipe.result) {
                return Err(CatalogError::InvalidResourceRef {
                    recipe: id,
                    index: recipe.result,
                });
            }
            for ing in &recipe.ingredients {
                if !self.space.contains(ing.index) {
                    return Err(CatalogError::InvalidResourceRef {
                        recipe: id,
                        index: ing.index,
                    });
                }
                if ing.count == 0 {
                    return Err(CatalogError::ZeroCount(id));
                }
                consumers_by_ingredient[ing.index.index()].push(id);
            }
            producers_by_result[recipe.result.index()].push(id);
        }

        Ok(RecipeCatalog {
            space: self.space,
            tiers: self.tiers,
            recipes: self.recipes,
            producers_by_result,
            consumers_by_ingredient,
        })
    }
}

/// Immutable recipe catalog with static producer/consumer adjacency.
/// Rebuilt wholesale when the external recipe source changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCatalog {
    space: ResourceSpace,
    tiers: Vec<ResourceTier>,
    recipes: Vec<ChefRecipe>,
    producers_by_result: Vec<Vec<RecipeId>>,
    consumers_by_ingredient: Vec<Vec<RecipeId>>,
}

impl RecipeCatalog {
    pub fn space(&self) -> ResourceSpace {
        self.space
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn get_recipe(&self, id: RecipeId) -> Option<&ChefRecipe> {
        self.recipes.get(id.index())
    }

    pub fn recipes(&self) -> impl Iterator<Item = (RecipeId, &ChefRecipe)> {
        self.recipes
            .iter()
            .enumerate()
            .map(|(i, r)| (RecipeId(i as u32), r))
    }

    pub fn tier(&self, id: ResourceId) -> ResourceTier {
        self.tiers.get(id.index()).copied().unwrap_or_default()
    }

    pub fn weight(&self, id: ResourceId) -> u32 {
        self.tier(id).weight()
    }

    /// Recipes whose result is `id`.
    pub fn producers_of(&self, id: ResourceId) -> &[RecipeId] {
        self.producers_by_result
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Recipes that take `id` as an ingredient.
    pub fn consumers_of(&self, id: ResourceId) -> &[RecipeId] {
        self.consumers_by_ingredient
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("recipe {recipe:?} references invalid resource {index:?}")]
    InvalidResourceRef { recipe: RecipeId, index: ResourceId },
    #[error("recipe {recipe:?} has {count} ingredients, expected 1 or 2")]
    IngredientArity { recipe: RecipeId, count: usize },
    #[error("recipe {0:?} has a zero count")]
    ZeroCount(RecipeId),
    #[error("tier assigned to out-of-range resource {0:?}")]
    TierOutOfRange(ResourceId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ing(i: u32, c: u32) -> Ingredient {
        Ingredient::new(ResourceId(i), c)
    }

    fn setup_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new(ResourceSpace::new(4, 1));
        b.set_tier(ResourceId(0), ResourceTier::Tier1)
            .set_tier(ResourceId(1), ResourceTier::Tier1)
            .set_tier(ResourceId(2), ResourceTier::Tier2);
        b.add_recipe(ResourceId(2), 1, &[ing(1, 1), ing(0, 1)]);
        b.add_recipe(ResourceId(4), 1, &[ing(2, 2)]);
        b
    }

    #[test]
    fn register_and_build() {
        let cat = setup_builder().build().unwrap();
        assert_eq!(cat.recipe_count(), 2);
        assert_eq!(cat.space().total(), 5);
    }

    #[test]
    fn ingredients_are_sorted() {
        let cat = setup_builder().build().unwrap();
        let r = cat.get_recipe(RecipeId(0)).unwrap();
        assert_eq!(r.ingredients, vec![ing(0, 1), ing(1, 1)]);
    }

    #[test]
    fn duplicate_ingredients_merge() {
        let mut b = CatalogBuilder::new(ResourceSpace::new(3, 0));
        let id = b.add_recipe(ResourceId(2), 1, &[ing(0, 1), ing(0, 1)]);
        let cat = b.build().unwrap();
        let r = cat.get_recipe(id).unwrap();
        assert_eq!(r.ingredients, vec![ing(0, 2)]);
        assert!(r.needs_multiple_of_one());
    }

    #[test]
    fn adjacency_lists() {
        let cat = setup_builder().build().unwrap();
        assert_eq!(cat.producers_of(ResourceId(2)), &[RecipeId(0)]);
        assert_eq!(cat.consumers_of(ResourceId(0)), &[RecipeId(0)]);
        assert_eq!(cat.consumers_of(ResourceId(2)), &[RecipeId(1)]);
        assert!(cat.producers_of(ResourceId(99)).is_empty());
    }

    #[test]
    fn tiers_default_by_range() {
        let cat = setup_builder().build().unwrap();
        assert_eq!(cat.tier(ResourceId(2)), ResourceTier::Tier2);
        assert_eq!(cat.tier(ResourceId(3)), ResourceTier::NoTier);
        assert_eq!(cat.tier(ResourceId(4)), ResourceTier::Equipment);
        assert_eq!(cat.weight(ResourceId(4)), 3);
    }

    #[test]
    fn invalid_resource_ref_fails() {
        let mut b = CatalogBuilder::new(ResourceSpace::new(2, 0));
        b.add_recipe(ResourceId(1), 1, &[ing(99, 1)]);
        match b.build() {
            Err(CatalogError::InvalidResourceRef { index, .. }) => {
                assert_eq!(index, ResourceId(99));
            }
            other => panic!("expected InvalidResourceRef, got: {other:?}"),
        }
    }

    #[test]
    fn arity_is_checked() {
        let mut b = CatalogBuilder::new(ResourceSpace::new(4, 0));
        b.add_recipe(ResourceId(3), 1, &[ing(0, 1), ing(1, 1), ing(2, 1)]);
        assert!(matches!(
            b.build(),
            Err(CatalogError::IngredientArity { count: 3, .. })
        ));

        let mut b = CatalogBuilder::new(ResourceSpace::new(4, 0));
        b.add_recipe(ResourceId(3), 1, &[]);
        assert!(matches!(
            b.build(),
            Err(CatalogError::IngredientArity { count: 0, .. })
        ));
    }

    #[test]
    fn zero_count_fails() {
        let mut b = CatalogBuilder::new(ResourceSpace::new(2, 0));
        b.add_recipe(ResourceId(1), 0, &[ing(0, 1)]);
        assert!(matches!(b.build(), Err(CatalogError::ZeroCount(_))));
    }

    #[test]
    fn tier_out_of_range_fails() {
        let mut b = CatalogBuilder::new(ResourceSpace::new(2, 0));
        b.set_tier(ResourceId(7), ResourceTier::Boss);
        let err = b.build().unwrap_err();
        assert!(format!("{err}").contains("out-of-range"));
    }

    #[test]
    fn empty_catalog_builds() {
        let cat = CatalogBuilder::new(ResourceSpace::new(0, 0)).build().unwrap();
        assert_eq!(cat.recipe_count(), 0);
    }
}
