use depforge_resolver::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("invalid global variable {key:?}")]
    InvalidGlobal {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Two distinct entries map to one CMake variable once names are
    /// upper-cased and punctuation becomes `_`.
    #[error("cmake variable {identifier} would be set by both {first} and {second}")]
    IdentifierCollision {
        identifier: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}
