//! Specialized collection types

pub use slotmap::{new_key_type, SlotMap};

/// Registration list that tolerates mutation while it is being iterated.
///
/// Iteration always walks [`RegistrationList::registered_snapshot`]. Register
/// and unregister calls are buffered until [`RegistrationList::flush`], so the
/// snapshot never changes underneath a running loop. Use
/// [`RegistrationList::is_still_registered`] inside the loop to skip items
/// that were unregistered after the snapshot was taken.
#[derive(Debug, Clone)]
pub struct RegistrationList<T> {
    registered_snapshot: Vec<T>,
    buffered_add: Vec<T>,
    buffered_remove: Vec<T>,
}

impl<T: Copy + PartialEq> RegistrationList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            registered_snapshot: Vec::new(),
            buffered_add: Vec::new(),
            buffered_remove: Vec::new(),
        }
    }

    /// Register an item. Returns `false` when it was already registered.
    pub fn register(&mut self, item: T) -> bool {
        if self.buffered_add.contains(&item) {
            return false;
        }

        if self.registered_snapshot.contains(&item) {
            // Cancels a pending removal, otherwise a no-op
            if let Some(index) = self.buffered_remove.iter().position(|&r| r == item) {
                self.buffered_remove.remove(index);
                return true;
            }
            return false;
        }

        self.buffered_add.push(item);
        true
    }

    /// Unregister an item. Returns `false` when it was not registered.
    pub fn unregister(&mut self, item: T) -> bool {
        if self.buffered_remove.contains(&item) {
            return false;
        }

        if self.registered_snapshot.contains(&item) {
            self.buffered_remove.push(item);
            return true;
        }

        if let Some(index) = self.buffered_add.iter().position(|&a| a == item) {
            self.buffered_add.remove(index);
            return true;
        }

        false
    }

    /// Apply buffered registration changes to the snapshot.
    pub fn flush(&mut self) {
        for item in self.buffered_remove.drain(..) {
            self.registered_snapshot.retain(|&r| r != item);
        }
        for item in self.buffered_add.drain(..) {
            if !self.registered_snapshot.contains(&item) {
                self.registered_snapshot.push(item);
            }
        }
    }

    /// Whether the item is registered once pending changes are taken into account.
    pub fn is_still_registered(&self, item: T) -> bool {
        (self.registered_snapshot.contains(&item) && !self.buffered_remove.contains(&item))
            || self.buffered_add.contains(&item)
    }

    /// Items as of the last flush, in registration order
    pub fn registered_snapshot(&self) -> &[T] {
        &self.registered_snapshot
    }

    /// Number of registered items including pending changes
    pub fn flushed_count(&self) -> usize {
        self.registered_snapshot.len() - self.buffered_remove.len() + self.buffered_add.len()
    }

    /// Whether there are unflushed changes
    pub fn has_pending(&self) -> bool {
        !self.buffered_add.is_empty() || !self.buffered_remove.is_empty()
    }

    /// Registered items including pending changes, in the order a flush would produce
    pub fn registered_items(&self) -> Vec<T> {
        let mut items: Vec<T> = self
            .registered_snapshot
            .iter()
            .copied()
            .filter(|item| !self.buffered_remove.contains(item))
            .collect();
        items.extend(self.buffered_add.iter().copied());
        items
    }

    /// Move an item to `index`, bypassing the buffers. Adds it when absent.
    ///
    /// Must not be called while the snapshot is being iterated. Returns `true`
    /// when the item was not registered before the call.
    pub fn move_item_immediately(&mut self, item: T, index: usize) -> bool {
        let was_registered = self.is_still_registered(item);
        self.buffered_add.retain(|&a| a != item);
        self.buffered_remove.retain(|&r| r != item);
        self.flush();

        self.registered_snapshot.retain(|&r| r != item);
        let index = index.min(self.registered_snapshot.len());
        self.registered_snapshot.insert(index, item);
        !was_registered
    }
}

impl<T: Copy + PartialEq> Default for RegistrationList<T> {
    fn default() -> Self {
        Self::new()
    }
}
