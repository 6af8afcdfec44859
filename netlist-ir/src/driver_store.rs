//! Free-list-backed arena holding driver lists outside the interval map, so
//! that the interval map's stored values (handles) remain trivially
//! copyable. Grounded on the original's `ExternalManager<T>`
//! (`ExternalManager.hpp`), a `vector<unique_ptr<T>>` plus a free-list of
//! reusable slots; translated here to `Vec<Option<T>>` since Rust has no
//! null-pointer-as-empty-slot idiom.

use netlist_utils::{Error, Result};

/// A handle into a [`DriverStore`]. `Copy`, so it satisfies the interval
/// map's "trivially copyable value" constraint (spec §4.3 / Design Notes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Handle(u32);

#[derive(Clone, Debug, Default)]
pub struct DriverStore<T> {
    slots: Vec<Option<T>>,
    free: Vec<u32>,
}

impl<T> DriverStore<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn allocate(&mut self, initial: T) -> Handle {
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(initial);
            Handle(idx)
        } else {
            self.slots.push(Some(initial));
            Handle((self.slots.len() - 1) as u32)
        }
    }

    pub fn get(&self, handle: Handle) -> Result<&T> {
        self.slots
            .get(handle.0 as usize)
            .and_then(|s| s.as_ref())
            .ok_or_else(|| Error::stale_handle(handle.0))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        self.slots
            .get_mut(handle.0 as usize)
            .and_then(|s| s.as_mut())
            .ok_or_else(|| Error::stale_handle(handle.0))
    }

    /// Free the slot and return its contents; the handle may be reused for
    /// a future `allocate`.
    pub fn erase(&mut self, handle: Handle) -> Result<T> {
        let slot = self
            .slots
            .get_mut(handle.0 as usize)
            .ok_or_else(|| Error::stale_handle(handle.0))?;
        let value = slot.take().ok_or_else(|| Error::stale_handle(handle.0))?;
        self.free.push(handle.0);
        Ok(value)
    }
}

impl<T: Clone> DriverStore<T> {
    /// Deep-copy every live slot, preserving handle values.
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_reused_after_erase() {
        let mut store: DriverStore<i32> = DriverStore::new();
        let h1 = store.allocate(1);
        store.erase(h1).unwrap();
        let h2 = store.allocate(2);
        assert_eq!(h1, h2);
        assert_eq!(*store.get(h2).unwrap(), 2);
    }

    #[test]
    fn erased_handle_is_stale() {
        let mut store: DriverStore<i32> = DriverStore::new();
        let h = store.allocate(1);
        store.erase(h).unwrap();
        assert!(store.get(h).is_err());
    }
}
