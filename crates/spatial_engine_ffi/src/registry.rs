//! Handle tables shared by every exported call.
//!
//! Each table maps an `i32` handle to owned engine state. Handles start at 1
//! and are never reused, so a stale handle reports `NOT_FOUND` instead of
//! reaching someone else's state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use crate::{LOCK_POISONED, NOT_FOUND};

pub(crate) struct Registry<T> {
    kind: &'static str,
    slots: Mutex<Option<HashMap<i32, T>>>,
    next_id: AtomicI32,
}

impl<T> Registry<T> {
    pub(crate) const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: Mutex::new(None),
            next_id: AtomicI32::new(1),
        }
    }

    /// Store `value` and return its new handle.
    pub(crate) fn insert(&self, value: T) -> Result<i32, i32> {
        let Ok(mut guard) = self.slots.lock() else {
            return Err(LOCK_POISONED);
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        guard.get_or_insert_with(HashMap::new).insert(id, value);
        tracing::debug!(kind = self.kind, handle = id, "created handle");
        Ok(id)
    }

    /// Drop the state behind `id`. Returns a status code.
    pub(crate) fn remove(&self, id: i32) -> i32 {
        let Ok(mut guard) = self.slots.lock() else {
            return LOCK_POISONED;
        };
        let Some(ref mut slots) = *guard else {
            return NOT_FOUND;
        };
        match slots.remove(&id) {
            Some(_) => {
                tracing::debug!(kind = self.kind, handle = id, "destroyed handle");
                crate::OK
            }
            None => NOT_FOUND,
        }
    }

    /// Run `f` on the state behind `id` while holding the table lock.
    ///
    /// Only for short mutations. Never call into another registry from
    /// inside `f`.
    pub(crate) fn with<R>(&self, id: i32, f: impl FnOnce(&mut T) -> R) -> Result<R, i32> {
        let Ok(mut guard) = self.slots.lock() else {
            return Err(LOCK_POISONED);
        };
        let Some(ref mut slots) = *guard else {
            return Err(NOT_FOUND);
        };
        let Some(state) = slots.get_mut(&id) else {
            return Err(NOT_FOUND);
        };
        Ok(f(state))
    }
}

impl<T: Clone> Registry<T> {
    /// Clone the state behind `id`. The table lock is released before this
    /// returns, so long reads on `Arc` state never block other handles.
    pub(crate) fn get(&self, id: i32) -> Result<T, i32> {
        self.with(id, |state| state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    static NUMBERS: Registry<u32> = Registry::new("number");

    #[test]
    fn test_handles_are_unique_and_not_reused() {
        let a = NUMBERS.insert(7).unwrap();
        let b = NUMBERS.insert(8).unwrap();
        assert_ne!(a, b);
        assert!(a > 0 && b > 0);

        assert_eq!(NUMBERS.with(a, |n| *n), Ok(7));
        assert_eq!(NUMBERS.remove(a), crate::OK);
        assert_eq!(NUMBERS.remove(a), NOT_FOUND);
        assert_eq!(NUMBERS.with(a, |n| *n), Err(NOT_FOUND));

        let c = NUMBERS.insert(9).unwrap();
        assert!(c > b);
        NUMBERS.remove(b);
        NUMBERS.remove(c);
    }

    #[test]
    fn test_get_outlives_the_handle() {
        static SHARED: Registry<Arc<Vec<u32>>> = Registry::new("shared");
        let id = SHARED.insert(Arc::new(vec![1, 2, 3])).unwrap();
        let held = SHARED.get(id).unwrap();

        let other = std::thread::spawn(move || (SHARED.get(id).map(|v| v.len()), SHARED.remove(id)));
        assert_eq!(other.join().unwrap(), (Ok(3), crate::OK));
        assert_eq!(held.iter().sum::<u32>(), 6);
        assert_eq!(SHARED.get(id), Err(NOT_FOUND));
    }

    #[test]
    fn test_with_mutates_in_place() {
        let id = NUMBERS.insert(1).unwrap();
        NUMBERS.with(id, |n| *n += 41).unwrap();
        assert_eq!(NUMBERS.with(id, |n| *n), Ok(42));
        NUMBERS.remove(id);
    }
}
