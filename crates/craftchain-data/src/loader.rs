//! Resolution pipeline: reads data files, resolves names, builds core types.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and the
//! deserialization helpers used by [`load_catalog`], [`load_snapshot`] and
//! [`load_planner_config`].

use crate::schema::{RecipeData, ResourceData, SnapshotData};
use craftchain_core::catalog::{CatalogBuilder, CatalogError, Ingredient, RecipeCatalog};
use craftchain_core::config::{ConfigError, PlannerConfig};
use craftchain_core::id::{DonorId, DroneKey, RecipeId, ResourceId};
use craftchain_core::resource::{ResourceSpace, ResourceTier};
use craftchain_core::snapshot::{AllyInventory, DroneCandidate, InventorySnapshot};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved recipes did not form a valid catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The planner config failed validation.
    #[error("invalid planner config in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML cannot hold a top-level array, so
/// there the list is read from `toml_key`; RON and JSON hold `Vec<T>` directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    match detect_format(path)? {
        Format::Ron | Format::Json => deserialize_file(path),
        Format::Toml => {
            let content = std::fs::read_to_string(path)?;
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<V: Copy>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<V, DataLoadError> {
    map.get(name)
        .copied()
        .ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: name.to_string(),
            expected_kind,
        })
}

/// Return a `DuplicateName` error if `name` is already in the map.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Catalog
// ===========================================================================

/// A built catalog plus the name tables needed to resolve snapshot files.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: RecipeCatalog,
    pub resources: HashMap<String, ResourceId>,
    pub recipes: HashMap<String, RecipeId>,
}

impl LoadedCatalog {
    pub fn resource(&self, name: &str) -> Option<ResourceId> {
        self.resources.get(name).copied()
    }

    pub fn recipe(&self, name: &str) -> Option<RecipeId> {
        self.recipes.get(name).copied()
    }
}

/// Load `items`, optional `equipment`, and `recipes` from `dir`.
///
/// Items take indices `[0, items)`, equipment follows. Names must be unique
/// across both lists.
pub fn load_catalog(dir: &Path) -> Result<LoadedCatalog, DataLoadError> {
    let items_path = require_data_file(dir, "items")?;
    let items: Vec<ResourceData> = deserialize_list(&items_path, "items")?;
    let equipment_path = find_data_file(dir, "equipment")?;
    let equipment: Vec<ResourceData> = match &equipment_path {
        Some(path) => deserialize_list(path, "equipment")?,
        None => Vec::new(),
    };
    let recipes_path = require_data_file(dir, "recipes")?;
    let recipe_data: Vec<RecipeData> = deserialize_list(&recipes_path, "recipes")?;

    let space = ResourceSpace::new(items.len() as u32, equipment.len() as u32);
    let mut builder = CatalogBuilder::new(space);
    let mut resources: HashMap<String, ResourceId> = HashMap::new();

    let lists = [
        (&items, items_path.as_path(), ResourceTier::NoTier),
        (
            &equipment,
            equipment_path.as_deref().unwrap_or(dir),
            ResourceTier::Equipment,
        ),
    ];
    for (list, file, default_tier) in lists {
        for entry in list.iter() {
            check_duplicate(&resources, &entry.name, file)?;
            let id = ResourceId(resources.len() as u32);
            builder.set_tier(id, entry.tier.unwrap_or(default_tier));
            resources.insert(entry.name.clone(), id);
        }
    }

    let mut recipes: HashMap<String, RecipeId> = HashMap::new();
    for recipe in &recipe_data {
        check_duplicate(&recipes, &recipe.name, &recipes_path)?;
        let result = resolve_name(&resources, &recipe.result, &recipes_path, "resource")?;
        let ingredients = recipe
            .ingredients
            .iter()
            .map(|ing| {
                resolve_name(&resources, ing.item(), &recipes_path, "resource")
                    .map(|id| Ingredient::new(id, ing.count()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let id = builder.add_recipe(result, recipe.count, &ingredients);
        recipes.insert(recipe.name.clone(), id);
    }

    let catalog = builder.build()?;
    debug!(
        items = items.len(),
        equipment = equipment.len(),
        recipes = catalog.recipe_count(),
        dir = %dir.display(),
        "loaded recipe catalog"
    );
    Ok(LoadedCatalog {
        catalog,
        resources,
        recipes,
    })
}

// ===========================================================================
// Snapshot
// ===========================================================================

/// Load an inventory snapshot file, resolving names against `loaded`.
pub fn load_snapshot(path: &Path, loaded: &LoadedCatalog) -> Result<InventorySnapshot, DataLoadError> {
    let data: SnapshotData = deserialize_file(path)?;
    let resource = |name: &str| resolve_name(&loaded.resources, name, path, "resource");

    let mut builder = InventorySnapshot::builder(loaded.catalog.space())
        .can_scrap_drones(data.can_scrap_drones)
        .pooling_enabled(data.pooling_enabled);

    for (name, count) in &data.stacks {
        builder = builder.physical(resource(name)?, *count);
    }
    for drone in &data.drones {
        builder = builder.drone(DroneCandidate {
            key: DroneKey::new(drone.owner, drone.minion),
            name: drone.name.clone(),
            upgrade_count: drone.upgrade_count,
            locally_owned: drone.local,
            scrap_index: resource(&drone.scrap_into)?,
        });
    }
    for ally in &data.allies {
        let mut inventory = AllyInventory::new(DonorId(ally.donor), ally.remaining_trades);
        for (name, count) in &ally.stacks {
            inventory = inventory.with_stack(resource(name)?, *count);
        }
        builder = builder.ally(inventory);
    }
    for (from, to) in &data.display_overrides {
        builder = builder.display_override(resource(from)?, resource(to)?);
    }

    let recipes: Vec<RecipeId> = match &data.recipes {
        Some(names) => names
            .iter()
            .map(|name| resolve_name(&loaded.recipes, name, path, "recipe"))
            .collect::<Result<_, _>>()?,
        None => loaded.catalog.recipes().map(|(id, _)| id).collect(),
    };

    Ok(builder.recipes(recipes).build())
}

// ===========================================================================
// Planner config
// ===========================================================================

/// Load and validate a planner config file. Missing fields take defaults.
pub fn load_planner_config(path: &Path) -> Result<PlannerConfig, DataLoadError> {
    let config: PlannerConfig = deserialize_file(path)?;
    config.validate().map_err(|source| DataLoadError::Config {
        file: path.to_path_buf(),
        source,
    })?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
