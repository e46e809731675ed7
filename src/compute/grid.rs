//! Owned lattice of cell symbols.

/// `height x width` symbols, row-major in one contiguous buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// All-zero grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize) -> u8 {
        self.cells[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        &mut self.cells[y * self.width..(y + 1) * self.width]
    }

    /// Previous row and the row being written, borrowed together.
    pub(crate) fn row_pair_mut(&mut self, y: usize) -> (&[u8], &mut [u8]) {
        let (before, after) = self.cells.split_at_mut(y * self.width);
        (&before[(y - 1) * self.width..], &mut after[..self.width])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks_exact(self.width.max(1)).take(self.height)
    }

    pub fn last_row(&self) -> &[u8] {
        self.row(self.height.saturating_sub(1))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}
