use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Raw integer grid observation, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<u8>,
}

impl Grid {
    pub fn new(height: usize, width: usize, cells: Vec<u8>) -> Result<Self, GridError> {
        if height == 0 || width == 0 {
            return Err(GridError::Empty);
        }
        if cells.len() != height * width {
            return Err(GridError::CellCount {
                expected: height * width,
                actual: cells.len(),
            });
        }
        Ok(Self {
            height,
            width,
            cells,
        })
    }

    /// Builds a grid from nested rows; every row must share the first row's width.
    pub fn from_rows<R>(rows: &[R]) -> Result<Self, GridError>
    where
        R: AsRef<[u8]>,
    {
        let height = rows.len();
        let width = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        let mut cells = Vec::with_capacity(height * width);
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(GridError::RaggedRow {
                    row: index,
                    expected: width,
                    actual: row.len(),
                });
            }
            cells.extend_from_slice(row);
        }
        Self::new(height, width, cells)
    }

    pub fn filled(height: usize, width: usize, value: u8) -> Result<Self, GridError> {
        Self::new(height, width, vec![value; height * width])
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.height && col < self.width {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        debug_assert!(row < self.height && col < self.width);
        self.cells[row * self.width + col] = value;
    }

    pub fn rows(&self) -> std::slice::Chunks<'_, u8> {
        self.cells.chunks(self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows: Vec<Vec<u8>> = vec![vec![0, 1, 2], vec![0, 1]];
        let err = Grid::from_rows(&rows).unwrap_err();
        assert_eq!(
            err,
            GridError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn get_is_row_major() {
        let grid = Grid::from_rows(&[[1u8, 2], [3, 4]]).expect("grid");
        assert_eq!(grid.get(0, 1), Some(2));
        assert_eq!(grid.get(1, 0), Some(3));
        assert_eq!(grid.get(2, 0), None);
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert_eq!(Grid::new(0, 3, Vec::new()).unwrap_err(), GridError::Empty);
    }
}
