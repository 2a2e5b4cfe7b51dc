//! Serde data file structs for catalogs and inventory snapshots.
//!
//! These structs define the on-disk format. They are deserialized from RON,
//! JSON, or TOML data files and then resolved into core types by the loader,
//! which maps every name to its unified index.

use craftchain_core::resource::ResourceTier;
use serde::Deserialize;

fn default_one() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

// ===========================================================================
// Catalog: items and equipment
// ===========================================================================

/// An item or equipment definition. Files are read in order, so an entry's
/// position fixes its unified index.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub name: String,
    /// Defaults to `no_tier` for items and `equipment` for equipment.
    #[serde(default)]
    pub tier: Option<ResourceTier>,
}

// ===========================================================================
// Catalog: recipes
// ===========================================================================

/// A recipe ingredient, in short tuple form or full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientData {
    /// `("name", count)`
    Short(String, u32),
    /// `{ item: "name", count: 2 }`
    Full {
        item: String,
        #[serde(default = "default_one")]
        count: u32,
    },
}

impl IngredientData {
    pub fn item(&self) -> &str {
        match self {
            IngredientData::Short(item, _) | IngredientData::Full { item, .. } => item,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            IngredientData::Short(_, count) | IngredientData::Full { count, .. } => *count,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    pub result: String,
    #[serde(default = "default_one")]
    pub count: u32,
    pub ingredients: Vec<IngredientData>,
}

// ===========================================================================
// Snapshot
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DroneData {
    pub name: String,
    pub owner: u32,
    pub minion: u32,
    #[serde(default)]
    pub upgrade_count: u32,
    #[serde(default = "default_true")]
    pub local: bool,
    /// Resource this drone scraps into.
    pub scrap_into: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllyData {
    pub donor: u32,
    pub remaining_trades: u32,
    #[serde(default)]
    pub stacks: Vec<(String, u32)>,
}

/// An inventory snapshot file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SnapshotData {
    pub stacks: Vec<(String, u32)>,
    pub drones: Vec<DroneData>,
    pub allies: Vec<AllyData>,
    pub can_scrap_drones: bool,
    pub pooling_enabled: bool,
    /// Recipe names to plan against. `None` activates the whole catalog.
    pub recipes: Option<Vec<String>>,
    /// `(produced, displayed)` name pairs.
    pub display_overrides: Vec<(String, String)>,
}
