//! Dense square tables indexed by portal or leaf.

use crate::{BspError, Result};

/// A dense `size x size` table stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisTable<T> {
    size: usize,
    cells: Vec<T>,
}

impl<T: Clone> VisTable<T> {
    /// A table with every cell set to `value`.
    ///
    /// Fails with [`BspError::Format`] if `size * size` cells cannot be
    /// allocated.
    pub fn new(size: usize, value: T) -> Result<Self> {
        let too_large = || BspError::Format(format!("a {size}x{size} vis table is too large"));
        let len = size.checked_mul(size).ok_or_else(too_large)?;
        let mut cells = Vec::new();
        cells.try_reserve_exact(len).map_err(|_| too_large())?;
        cells.resize(len, value);
        Ok(Self { size, cells })
    }
}

impl<T> VisTable<T> {
    /// Builds a table from complete rows.
    ///
    /// # Panics
    ///
    /// Panics if a row does not have exactly `rows.len()` cells.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for row in rows {
            assert_eq!(row.len(), size, "vis table rows must be square");
            cells.extend(row);
        }
        Self { size, cells }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, row: usize, column: usize) -> &T {
        &self.cells[row * self.size + column]
    }

    #[inline]
    pub fn set(&mut self, row: usize, column: usize, value: T) {
        self.cells[row * self.size + column] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.cells[row * self.size..(row + 1) * self.size]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        &mut self.cells[row * self.size..(row + 1) * self.size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks() rejects a zero chunk size.
        self.cells.chunks(self.size.max(1)).take(self.size)
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }
}

/// Portal-to-portal visibility during the calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortalVis {
    No,
    Maybe,
    Yes,
}

/// Final leaf-by-leaf visibility: `get(a, b)` is true when leaf `b` may be
/// visible from anywhere in leaf `a`.
pub type LeafVisTable = VisTable<bool>;

impl LeafVisTable {
    #[inline]
    pub fn is_visible(&self, from: usize, to: usize) -> bool {
        *self.get(from, to)
    }

    /// Number of leaves `from` can see, itself included.
    pub fn visible_count(&self, from: usize) -> usize {
        self.row(from).iter().filter(|&&visible| visible).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_contiguous() {
        let mut table = VisTable::new(3, PortalVis::Maybe).unwrap();
        table.set(1, 2, PortalVis::Yes);
        table.row_mut(2).fill(PortalVis::No);

        assert_eq!(table.row(1), &[PortalVis::Maybe, PortalVis::Maybe, PortalVis::Yes]);
        assert_eq!(*table.get(2, 0), PortalVis::No);
        assert_eq!(table.rows().count(), 3);
    }

    #[test]
    fn empty_table_has_no_rows() {
        let table: LeafVisTable = VisTable::new(0, false).unwrap();
        assert_eq!(table.size(), 0);
        assert_eq!(table.rows().count(), 0);
    }

    #[test]
    fn from_rows_round_trips() {
        let table = LeafVisTable::from_rows(vec![vec![true, false], vec![true, true]]);
        assert!(table.is_visible(1, 0));
        assert!(!table.is_visible(0, 1));
        assert_eq!(table.visible_count(1), 2);
    }
}
