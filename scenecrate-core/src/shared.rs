//! Lock-guarded transform for sharing between threads
//!
//! `Transform3D` caches derived state in a `Cell`, so it is `Send` but not
//! `Sync`. `SharedTransform` serializes access behind a mutex and hands out
//! copies.

use std::sync::{Mutex, PoisonError};

use crate::transform::Transform3D;

/// A transform that several threads read and replace as a whole
#[derive(Debug, Default)]
pub struct SharedTransform {
    inner: Mutex<Transform3D>,
}

impl SharedTransform {
    pub fn new(transform: Transform3D) -> Self {
        Self {
            inner: Mutex::new(transform),
        }
    }

    /// Replace the guarded transform with a copy of `transform`
    pub fn set_with_lock(&self, transform: &Transform3D) {
        // Writers replace the value whole, so a poisoned lock still guards a valid transform
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.set(transform);
    }

    /// A copy of the guarded transform
    pub fn get_with_lock(&self) -> Transform3D {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_inner(self) -> Transform3D {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Transform3D> for SharedTransform {
    fn from(transform: Transform3D) -> Self {
        Self::new(transform)
    }
}
