use thiserror::Error;

/// Errors raised by the registry, the records and the exclusion marker.
///
/// Absence of a cached value is never an error: resetting or filtering a
/// name that is not present is a no-op.
#[derive(Error, Debug)]
pub enum PropCacheError {
    /// A strict lookup was made for a type that was never registered.
    #[error("type `{type_name}` is not registered with the property cache")]
    NotRegistered { type_name: &'static str },

    /// The exclusion marker was constructed as a value.
    #[error("{marker} cannot be instantiated")]
    MarkerInstantiation { marker: &'static str },

    #[error("state extraction failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("state of `{type_name}` is not a mapping")]
    StateNotMapping { type_name: &'static str },
}

pub type Result<T> = std::result::Result<T, PropCacheError>;
