//! Sparse/dense slot index with O(1) swap-erase.
//!
//! Maps externally owned slot numbers onto a packed range of rows
//! `[0, len)`. Rows stay contiguous after every removal: the last row is
//! moved into the hole. Callers keep their per-row data in their own
//! parallel arrays and apply the same move, which is why [`remove`]
//! reports it.
//!
//! ```text
//! sparse (by slot):  [ -, 2, -, 0, 1, - ]
//! dense  (by row):   [ 3, 4, 1 ]            len = 3
//! ```
//!
//! [`remove`]: SparseDenseIndex::remove

use crate::error::TrailError;

const EMPTY: u32 = u32::MAX;

/// Row movement caused by a removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapRemove {
    /// Row the removed slot occupied.
    pub row: usize,
    /// Row whose data now has to be copied into `row`, if any.
    /// `None` when the removed slot was already the last row.
    pub moved_from: Option<usize>,
}

/// Fixed-capacity two-way index between slots and packed rows.
#[derive(Clone, Debug)]
pub struct SparseDenseIndex {
    sparse: Box<[u32]>,
    dense: Box<[u32]>,
    len: usize,
}

impl SparseDenseIndex {
    /// Index for slots `[0, capacity)`.
    pub fn new(capacity: usize) -> Self {
        Self {
            sparse: vec![EMPTY; capacity].into_boxed_slice(),
            dense: vec![EMPTY; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.sparse.len()
    }

    /// Number of packed rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Row of `slot`, if it is present.
    #[inline]
    pub fn row(&self, slot: usize) -> Option<usize> {
        match self.sparse.get(slot) {
            Some(&row) if row != EMPTY => Some(row as usize),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, slot: usize) -> bool {
        self.row(slot).is_some()
    }

    /// Slot stored at `row`, for rows in `[0, len)`.
    #[inline]
    pub fn slot_at(&self, row: usize) -> Option<usize> {
        (row < self.len).then(|| self.dense[row] as usize)
    }

    /// Slots in row order.
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.dense[..self.len].iter().map(|&s| s as usize)
    }

    /// Append `slot` as the new last row and return that row.
    pub fn insert(&mut self, slot: usize) -> Result<usize, TrailError> {
        self.check_range(slot)?;
        if self.sparse[slot] != EMPTY {
            return Err(TrailError::SlotAlreadyActive(slot));
        }

        // Slots are distinct and bounded by capacity, so a free row exists.
        let row = self.len;
        self.sparse[slot] = row as u32;
        self.dense[row] = slot as u32;
        self.len += 1;
        Ok(row)
    }

    /// Remove `slot`, moving the last row into its place.
    pub fn remove(&mut self, slot: usize) -> Result<SwapRemove, TrailError> {
        self.check_range(slot)?;
        let row = self.sparse[slot];
        if row == EMPTY {
            return Err(TrailError::SlotNotActive(slot));
        }

        let row = row as usize;
        let last = self.len - 1;
        let moved_from = if row != last {
            let moved_slot = self.dense[last];
            self.dense[row] = moved_slot;
            self.sparse[moved_slot as usize] = row as u32;
            Some(last)
        } else {
            None
        };

        self.dense[last] = EMPTY;
        self.sparse[slot] = EMPTY;
        self.len = last;
        Ok(SwapRemove { row, moved_from })
    }

    /// Forget every slot.
    pub fn clear(&mut self) {
        for slot in &self.dense[..self.len] {
            self.sparse[*slot as usize] = EMPTY;
        }
        self.dense[..self.len].fill(EMPTY);
        self.len = 0;
    }

    fn check_range(&self, slot: usize) -> Result<(), TrailError> {
        if slot >= self.capacity() {
            return Err(TrailError::SlotOutOfRange {
                slot,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every present slot points at a row that points back at it.
    fn assert_consistent(index: &SparseDenseIndex) {
        for row in 0..index.len() {
            let slot = index.slot_at(row).unwrap();
            assert_eq!(index.row(slot), Some(row));
        }
        let present = (0..index.capacity()).filter(|&s| index.contains(s)).count();
        assert_eq!(present, index.len());
    }

    #[test]
    fn test_insert_appends() {
        let mut index = SparseDenseIndex::new(6);
        assert_eq!(index.insert(3).unwrap(), 0);
        assert_eq!(index.insert(4).unwrap(), 1);
        assert_eq!(index.insert(1).unwrap(), 2);
        assert_eq!(index.slots().collect::<Vec<_>>(), vec![3, 4, 1]);
        assert_consistent(&index);
    }

    #[test]
    fn test_remove_middle_moves_last() {
        let mut index = SparseDenseIndex::new(6);
        for slot in [3, 4, 1] {
            index.insert(slot).unwrap();
        }

        let swap = index.remove(3).unwrap();
        assert_eq!(swap, SwapRemove { row: 0, moved_from: Some(2) });
        assert_eq!(index.len(), 2);
        assert_eq!(index.row(1), Some(0));
        assert_eq!(index.row(4), Some(1));
        assert!(!index.contains(3));
        assert_consistent(&index);
    }

    #[test]
    fn test_remove_last_moves_nothing() {
        let mut index = SparseDenseIndex::new(4);
        index.insert(0).unwrap();
        index.insert(2).unwrap();
        assert_eq!(index.remove(2).unwrap(), SwapRemove { row: 1, moved_from: None });
        assert_eq!(index.slots().collect::<Vec<_>>(), vec![0]);
        assert_consistent(&index);
    }

    #[test]
    fn test_violations_leave_index_untouched() {
        let mut index = SparseDenseIndex::new(2);
        index.insert(1).unwrap();

        assert_eq!(index.insert(1), Err(TrailError::SlotAlreadyActive(1)));
        assert_eq!(index.remove(0), Err(TrailError::SlotNotActive(0)));
        assert!(matches!(index.insert(2), Err(TrailError::SlotOutOfRange { .. })));
        assert_eq!(index.len(), 1);
        assert_consistent(&index);
    }

    #[test]
    fn test_fill_to_capacity_and_clear() {
        let mut index = SparseDenseIndex::new(5);
        for slot in (0..5).rev() {
            index.insert(slot).unwrap();
        }
        assert_eq!(index.len(), 5);
        index.clear();
        assert!(index.is_empty());
        assert!(!index.contains(4));
        assert_eq!(index.insert(4).unwrap(), 0);
    }
}
