//! Error types shared across crates.

use thiserror::Error;

/// Errors surfaced by the user/visit store behind the repository port.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}
