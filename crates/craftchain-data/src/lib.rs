pub mod loader;
pub mod schema;

pub use loader::{load_catalog, load_planner_config, load_snapshot, DataLoadError, LoadedCatalog};
