//! Core shared errors (renderer-agnostic).

use asset::ImportError;
use thiserror::Error;

use crate::entity::EntityId;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to import '{path}': {source}")]
    Import {
        path: String,
        #[source]
        source: ImportError,
    },

    #[error("entity class '{0}' is already registered")]
    DuplicateName(String),

    #[error("no entity class named '{0}'")]
    ClassNotFound(String),

    #[error("no live entity at {0}")]
    EntityNotFound(EntityId),

    #[error("entity pool exhausted ({capacity} live entities)")]
    Capacity { capacity: usize },
}

impl CoreError {
    pub fn import(path: impl Into<String>, source: ImportError) -> Self {
        Self::Import {
            path: path.into(),
            source,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
