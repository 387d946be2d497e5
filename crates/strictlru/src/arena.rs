//! Slot arena backing the recency list
//!
//! Entries are addressed by [`Handle`], a plain slot index. Links between
//! entries and the key index both store handles, so nothing owns an entry
//! except the arena itself.

/// Stable address of an occupied arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Handle(usize);

impl Handle {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Dense slot storage with a free list for slot reuse
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Store `value` in a free slot, growing only when none is free
    pub(crate) fn insert(&mut self, value: T) -> Handle {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(value);
            idx
        } else {
            self.slots.push(Some(value));
            self.slots.len() - 1
        };
        self.len += 1;
        Handle(idx)
    }

    /// Release the slot at `handle`. Returns `None` if it was already free,
    /// so a slot can never be released twice.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<T> {
        let value = self.slots.get_mut(handle.0)?.take()?;
        self.free_list.push(handle.0);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(handle.0).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots.get_mut(handle.0).and_then(|slot| slot.as_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Drop every stored value. Slot storage is kept for reuse.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.len = 0;
    }
}
