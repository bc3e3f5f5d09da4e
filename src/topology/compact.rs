//! Packed offset-table storage for one-to-many mesh adjacency.
//!
//! A [`CompactList`] stores a jagged table (cell→faces, face→points, …) as a
//! single data vector plus an offset table of length `rows + 1`:
//! `offsets[i]` is the index of the first element of row `i`, and
//! `offsets[i + 1] - offsets[i]` its size. The offset table is the exclusive
//! prefix sum of the row sizes and is the only addressing scheme used — no
//! row is ever reached through a separately maintained index.
//!
//! Adjacency tables are rebuilt wholesale on topology change; they are never
//! mutated in place across partitions.

use crate::mesh_error::MeshPlicError;

/// Packed table of rows of `T` addressed through an offset table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactList<T> {
    /// Offset table; length `rows + 1`, non-decreasing, `offsets[0] == 0`.
    offsets: Vec<u32>,
    /// Packed row data; length `offsets[rows]`.
    data: Vec<T>,
}

impl<T> CompactList<T> {
    /// Empty table with zero rows.
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            data: Vec::new(),
        }
    }

    /// Build from explicit row sizes, filling every element with `fill`.
    ///
    /// The offsets become the exclusive prefix sum of `row_sizes`.
    pub fn from_row_sizes(row_sizes: &[u32], fill: T) -> Self
    where
        T: Clone,
    {
        let mut offsets = Vec::with_capacity(row_sizes.len() + 1);
        offsets.push(0u32);
        let mut total = 0u32;
        for &sz in row_sizes {
            total += sz;
            offsets.push(total);
        }
        Self {
            offsets,
            data: vec![fill; total as usize],
        }
    }

    /// Build from a list of rows, copying each row's elements.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Self
    where
        T: Clone,
    {
        let sizes: Vec<u32> = rows.iter().map(|r| r.as_ref().len() as u32).collect();
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0u32);
        let mut total = 0u32;
        for &sz in &sizes {
            total += sz;
            offsets.push(total);
        }
        let mut data = Vec::with_capacity(total as usize);
        for row in rows {
            data.extend_from_slice(row.as_ref());
        }
        Self { offsets, data }
    }

    /// Number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of stored elements.
    #[inline]
    pub fn total_size(&self) -> usize {
        *self.offsets.last().unwrap() as usize
    }

    /// True when the table holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Size of row `i`.
    #[inline]
    pub fn row_size(&self, i: usize) -> usize {
        (self.offsets[i + 1] - self.offsets[i]) as usize
    }

    /// Row `i` as a slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[self.offsets[i] as usize..self.offsets[i + 1] as usize]
    }

    /// Mutable row `i`.
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.data[self.offsets[i] as usize..self.offsets[i + 1] as usize]
    }

    /// Row `i`, or an error naming the offending index.
    pub fn try_row(&self, i: usize) -> Result<&[T], MeshPlicError> {
        if i >= self.row_count() {
            return Err(MeshPlicError::bad_mesh(format!(
                "row {i} out of range ({} rows)",
                self.row_count()
            )));
        }
        Ok(self.row(i))
    }

    /// The offset table.
    #[inline]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// The packed data.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Iterate over all rows in order.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.row_count()).map(move |i| self.row(i))
    }

    /// Contract to `m_rows` rows, truncating the data to match.
    ///
    /// Growth is refused: appending rows needs their sizes, which this form
    /// does not carry. Use [`CompactList::resize`] or
    /// [`CompactList::resize_row_sizes`] to grow.
    pub fn resize_rows(&mut self, m_rows: usize) -> Result<(), MeshPlicError> {
        if m_rows > self.row_count() {
            return Err(MeshPlicError::Size {
                requested: m_rows,
                have: self.row_count(),
            });
        }
        self.offsets.truncate(m_rows + 1);
        self.data.truncate(*self.offsets.last().unwrap() as usize);
        Ok(())
    }

    /// Resize to `m_rows` rows and `n_data` elements, filling new elements
    /// with `fill`. Appended rows are empty except the last, which absorbs
    /// any element growth; contracted data truncates.
    pub fn resize(&mut self, m_rows: usize, n_data: usize, fill: T)
    where
        T: Clone,
    {
        // A table with no rows holds no data; offsets[0] stays 0.
        let n_data = if m_rows == 0 { 0 } else { n_data };
        let old_rows = self.row_count();
        if m_rows <= old_rows {
            self.offsets.truncate(m_rows + 1);
        } else {
            let last = *self.offsets.last().unwrap();
            self.offsets.resize(m_rows + 1, last);
        }
        if let Some(last) = self.offsets.last_mut() {
            *last = n_data as u32;
        }
        // Clamp interior offsets in case of data contraction.
        for off in self.offsets.iter_mut() {
            if *off > n_data as u32 {
                *off = n_data as u32;
            }
        }
        self.data.resize(n_data, fill);
    }

    /// Rebuild the offset table from new row sizes, filling new elements.
    ///
    /// Existing leading data is kept where it still fits, like a plain
    /// `Vec` resize; elements beyond the old data take the fill value.
    pub fn resize_row_sizes(&mut self, row_sizes: &[u32], fill: T)
    where
        T: Clone,
    {
        let mut offsets = Vec::with_capacity(row_sizes.len() + 1);
        offsets.push(0u32);
        let mut total = 0u32;
        for &sz in row_sizes {
            total += sz;
            offsets.push(total);
        }
        self.offsets = offsets;
        self.data.resize(total as usize, fill);
    }

    /// Take ownership of `other`'s contents, leaving it empty.
    pub fn transfer(&mut self, other: &mut CompactList<T>) {
        self.offsets = std::mem::replace(&mut other.offsets, vec![0]);
        self.data = std::mem::take(&mut other.data);
    }

    /// Reset to zero rows and no data.
    pub fn clear(&mut self) {
        self.offsets.clear();
        self.offsets.push(0);
        self.data.clear();
    }
}
