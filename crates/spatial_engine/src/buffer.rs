//! Fixed-size row-major 2-D buffer.
//!
//! Used for every tabular result: per-node ray grids, distance and
//! predecessor matrices.

/// Row-major buffer of `rows * cols` elements.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer2D<T> {
  data: Vec<T>,
  rows: usize,
  cols: usize,
}

impl<T: Clone> Buffer2D<T> {
  /// Buffer filled with `value`.
  pub fn filled(rows: usize, cols: usize, value: T) -> Self {
    Self {
      data: vec![value; rows * cols],
      rows,
      cols,
    }
  }
}

impl<T> Buffer2D<T> {
  /// Wrap existing row-major data. Returns `None` if the length does not
  /// match `rows * cols`.
  pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Option<Self> {
    (data.len() == rows * cols).then_some(Self { data, rows, cols })
  }

  /// Build from equally sized rows. Returns `None` on ragged input.
  pub fn from_rows(rows: Vec<Vec<T>>, cols: usize) -> Option<Self> {
    let row_count = rows.len();
    if rows.iter().any(|r| r.len() != cols) {
      return None;
    }
    let data = rows.into_iter().flatten().collect();
    Some(Self {
      data,
      rows: row_count,
      cols,
    })
  }

  #[inline]
  pub fn rows(&self) -> usize {
    self.rows
  }

  #[inline]
  pub fn cols(&self) -> usize {
    self.cols
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// Element at (row, col), `None` when out of bounds.
  pub fn get(&self, row: usize, col: usize) -> Option<&T> {
    if row < self.rows && col < self.cols {
      self.data.get(row * self.cols + col)
    } else {
      None
    }
  }

  /// One row as a slice.
  ///
  /// # Panics
  /// Panics if `row >= rows()`.
  pub fn row(&self, row: usize) -> &[T] {
    let start = row * self.cols;
    &self.data[start..start + self.cols]
  }

  /// Mutable access to one row.
  pub fn row_mut(&mut self, row: usize) -> &mut [T] {
    let start = row * self.cols;
    &mut self.data[start..start + self.cols]
  }

  /// Iterate over rows in order.
  pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
    // chunks_exact(0) panics, zero-width buffers have no visible rows
    let cols = self.cols.max(1);
    self.data.chunks_exact(cols).take(if self.cols == 0 { 0 } else { self.rows })
  }

  pub fn as_slice(&self) -> &[T] {
    &self.data
  }

  pub fn into_vec(self) -> Vec<T> {
    self.data
  }
}
