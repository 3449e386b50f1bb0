//! The key-value storage abstraction.

use std::sync::Arc;

use crate::StoreError;

/// Synchronous string storage.
///
/// This is the "durable local key-value storage" the session layer
/// persists into. Implementations must be cheap enough to call on every
/// outbound request, which is why the trait is synchronous.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Stores several entries at once.
    ///
    /// The default writes them one by one. Backends that can persist a
    /// batch in one step should override this so a crash can't leave only
    /// half of the entries on disk.
    fn set_many(&self, entries: Vec<(&str, String)>) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Removes several keys at once. Same batching contract as
    /// [`set_many`](Self::set_many).
    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

impl<T: KeyValueStore> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn set_many(&self, entries: Vec<(&str, String)>) -> Result<(), StoreError> {
        (**self).set_many(entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        (**self).remove_many(keys)
    }
}
