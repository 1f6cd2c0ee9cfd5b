use std::sync::{Arc, RwLock};

/// Shared, single-writer state cell.
///
/// `StateCell<T>` wraps `Arc<RwLock<T>>` so it is cheap to clone and safe to
/// move into async tasks. Guards are never exposed: all access goes through
/// closures, so no lock can be held across an `.await`.
#[derive(Debug)]
pub struct StateCell<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> StateCell<T> {
    /// Create a new cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Read the current value through a closure.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Mutate the value through a closure.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        match self.inner.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
