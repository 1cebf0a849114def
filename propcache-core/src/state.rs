use serde::Serialize;
use serde_json::{Map, Value};

use crate::{PropCacheError, Result};

/// Serialized state of an instance: attribute name to value.
pub type StateMap = Map<String, Value>;

/// Base state extraction for an instance.
///
/// Records filter whatever this returns; they never replace it. Types with
/// a `Serialize` representation can use [`default_state`], either directly
/// or through `#[derive(PropCache)]` with `#[propcache(serde)]`.
pub trait GetState {
    fn get_state(&self) -> Result<StateMap>;
}

/// Shallow snapshot of `instance` through its `Serialize` implementation.
///
/// Fails with [`PropCacheError::StateNotMapping`] when the instance does not
/// serialize to a JSON object (tuple structs, enums, scalars).
///
/// # Examples
///
/// ```
/// use propcache_core::default_state;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let state = default_state(&Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(state["x"], 1);
/// assert_eq!(state.len(), 2);
/// ```
pub fn default_state<T>(instance: &T) -> Result<StateMap>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_value(instance)? {
        Value::Object(map) => Ok(map),
        _ => Err(PropCacheError::StateNotMapping {
            type_name: std::any::type_name::<T>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Named {
        label: String,
        weight: u32,
    }

    #[derive(Serialize)]
    struct Wrapped(u32);

    #[test]
    fn test_default_state_object() {
        let state = default_state(&Named {
            label: "box".into(),
            weight: 3,
        })
        .unwrap();

        assert_eq!(state.get("label"), Some(&Value::from("box")));
        assert_eq!(state.get("weight"), Some(&Value::from(3)));
    }

    #[test]
    fn test_default_state_rejects_non_mapping() {
        let err = default_state(&Wrapped(3)).unwrap_err();
        assert!(matches!(err, PropCacheError::StateNotMapping { .. }));
    }
}
