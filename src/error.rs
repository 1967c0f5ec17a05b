//! Error types for catalogue assembly and path resolution

use thiserror::Error;

/// The catalogue cannot be assembled from its records.
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("recipe '{recipe}' references unknown item '{item}'")]
    UnknownItem { recipe: String, item: String },

    #[error("duplicate item id '{0}'")]
    DuplicateItem(String),

    #[error("duplicate machine name '{0}'")]
    DuplicateMachine(String),

    #[error("duplicate recipe id '{0}'")]
    DuplicateRecipe(String),
}

/// Best-path resolution failed for a reason other than "no path".
#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("recipe chain for '{item}' is deeper than {depth} levels")]
    TooDeep { item: String, depth: usize },

    #[error("requested amount {0} must be finite and non-negative")]
    InvalidAmount(f64),
}
