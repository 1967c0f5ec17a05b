//! Production chain resolver for crafting graphs.
//!
//! Answers three questions over a catalogue of items, machines and recipes:
//! what is reachable from a set of starting items with the unlocked
//! machines, what is the fewest-step plan for a quantity of an item, and
//! roughly how many machine and generator slots that plan takes.

pub mod area;
pub mod calculator;
pub mod catalogue;
pub mod cycles;
pub mod db;
pub mod depth;
pub mod error;
pub mod extract;
pub mod models;
pub mod path;
pub mod reach;

pub use area::{AreaEstimate, estimate_area};
pub use calculator::{Resolver, compute_requirements_from_path};
pub use catalogue::Catalogue;
pub use depth::compute_depths;
pub use error::{CatalogueError, ResolveError};
pub use models::{ItemId, MachineId, RecipeId};
pub use path::{RecipePath, Step};
pub use reach::{find_reachable, items_from, reach_levels};
