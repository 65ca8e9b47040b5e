use std::iter::FusedIterator;
use std::slice;

use crate::{ElementId, Slot};

/// Iterator over the items of a [`CompactPool`][crate::CompactPool], created by
/// [`CompactPool::iter()`][crate::CompactPool::iter].
#[derive(Debug)]
pub struct Iter<'a, T> {
    slots: slice::Iter<'a, Slot<T>>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(slots: &'a [Slot<T>]) -> Self {
        Self {
            slots: slots.iter(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (ElementId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.find_map(|slot| match slot {
            Slot::Occupied { value, id } => Some((*id, value)),
            Slot::Vacant { .. } => None,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len()))
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over exclusive references to the items of a [`CompactPool`][crate::CompactPool],
/// created by [`CompactPool::iter_mut()`][crate::CompactPool::iter_mut].
#[derive(Debug)]
pub struct IterMut<'a, T> {
    slots: slice::IterMut<'a, Slot<T>>,
}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new(slots: &'a mut [Slot<T>]) -> Self {
        Self {
            slots: slots.iter_mut(),
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (ElementId, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.find_map(|slot| match slot {
            Slot::Occupied { value, id } => Some((*id, value)),
            Slot::Vacant { .. } => None,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len()))
    }
}

impl<T> FusedIterator for IterMut<'_, T> {}
