use crate::{Error, Result, Slot};

/// A stack of vacant slot indexes that is stored inside the vacant slots themselves.
///
/// Only the top of the stack and its length live here. Every other link is carried by the
/// `next_free_index` of a vacant [`Slot`], so tracking holes costs no memory beyond what the
/// freed slots already occupy. Also known as an intrusive free list.
///
/// Entries may go stale when the high-water mark drops below them. The pool discards stale
/// entries when it pops them; they are never linked into any other structure.
#[derive(Debug, Default)]
pub(crate) struct FreeList {
    /// Most recently freed slot index. Only meaningful when `len` is non-zero.
    top: usize,

    len: usize,
}

impl FreeList {
    #[must_use]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Turns the slot at `index` into a vacant slot that links to the previous top of the stack,
    /// dropping any value it held, and makes it the new top.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds of `slots`.
    pub(crate) fn push<T>(&mut self, slots: &mut [Slot<T>], index: usize) {
        let next_free_index = (!self.is_empty()).then_some(self.top);

        *slots
            .get_mut(index)
            .expect("only indexes of existing slots are pushed onto the free list") =
            Slot::Vacant { next_free_index };

        self.top = index;
        self.len = self
            .len
            .checked_add(1)
            .expect("there cannot be more free list entries than slots in memory");
    }

    /// Removes the most recently freed index from the stack and returns it.
    ///
    /// The slot itself is left untouched; the caller is expected to overwrite it.
    pub(crate) fn pop<T>(&mut self, slots: &[Slot<T>]) -> Result<usize> {
        if self.is_empty() {
            return Err(Error::EmptyFreeList);
        }

        let index = self.top;

        if self.len == 1 {
            self.len = 0;
            return Ok(index);
        }

        let next = match slots.get(index) {
            Some(Slot::Vacant {
                next_free_index: Some(next),
            }) => *next,
            _ => panic!("free list entry {index} is not a linked vacant slot"),
        };

        self.top = next;
        self.len = self
            .len
            .checked_sub(1)
            .expect("guarded by emptiness check above");

        Ok(index)
    }

    /// Forgets all entries without touching the slots. Only valid when the slots are being
    /// discarded as well.
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    /// Walks the chain from the top, for verifying pool bookkeeping in tests.
    #[cfg(test)]
    pub(crate) fn entries<T>(&self, slots: &[Slot<T>]) -> Vec<usize> {
        let mut entries = Vec::with_capacity(self.len);
        let mut next = (!self.is_empty()).then_some(self.top);

        while let Some(index) = next {
            if entries.len() == self.len {
                break;
            }

            entries.push(index);

            next = match slots.get(index) {
                Some(Slot::Vacant { next_free_index }) => *next_free_index,
                _ => panic!("free list entry {index} is not a vacant slot"),
            };
        }

        entries
    }
}
