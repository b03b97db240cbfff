//! Machine-wide key-value store.
//!
//! Used for hand-offs between states, e.g. a pose computed in one state and
//! consumed by a sibling. Access is confined to the dispatcher, so the store
//! needs no locking.

use std::any::Any;
use std::collections::HashMap;

/// String-keyed store of typed values.
///
/// # Example
///
/// ```rust
/// use orthostate::GlobalData;
///
/// let mut data = GlobalData::new();
/// data.set("radial_start", (3.0_f64, 0.0_f64));
///
/// assert_eq!(data.get::<(f64, f64)>("radial_start"), Some(&(3.0, 0.0)));
/// assert_eq!(data.get::<String>("radial_start"), None);
/// ```
#[derive(Default)]
pub struct GlobalData {
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl GlobalData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value of any type.
    pub fn set<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Typed read. `None` if the key is absent or holds another type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.downcast_mut::<T>()
    }

    /// Remove and return the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn take<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key)?.is::<T>() {
            return None;
        }
        let value = self.values.remove(key)?;
        value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for GlobalData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalData")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_previous_value() {
        let mut data = GlobalData::new();
        data.set("iteration", 1_u32);
        data.set("iteration", 2_u32);

        assert_eq!(data.get::<u32>("iteration"), Some(&2));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn typed_access_rejects_other_types() {
        let mut data = GlobalData::new();
        data.set("label", "dock".to_string());

        assert_eq!(data.get::<u32>("label"), None);
        assert_eq!(data.take::<u32>("label"), None);
        assert!(data.contains("label"));
        assert_eq!(data.take::<String>("label"), Some("dock".to_string()));
        assert!(!data.contains("label"));
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut data = GlobalData::new();
        data.set("count", 0_usize);
        if let Some(count) = data.get_mut::<usize>("count") {
            *count += 3;
        }
        assert_eq!(data.get::<usize>("count"), Some(&3));
    }

    #[test]
    fn keys_are_sorted() {
        let mut data = GlobalData::new();
        data.set("b", 1);
        data.set("a", 2);
        assert_eq!(data.keys(), vec!["a".to_string(), "b".to_string()]);
        assert!(data.remove("a"));
        assert!(!data.remove("a"));
    }
}
