#![forbid(unsafe_code)]

//! Row-major grid of palette indices.

/// A `width × height` drawing surface of palette indices.
///
/// Origin is the top-left corner. Writes outside the grid are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelCanvas {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl PixelCanvas {
    /// A canvas filled with index 0.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, index: u8) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![index; len],
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Index at `(x, y)`, or `None` outside the grid.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        self.offset(x, y).map(|i| self.cells[i])
    }

    /// Set `(x, y)` to `index`. Returns `false` when the point was clipped.
    ///
    /// Signed coordinates let callers draw shapes that hang off any edge.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, index: u8) -> bool {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return false;
        };
        match self.offset(x, y) {
            Some(i) => {
                self.cells[i] = index;
                true
            }
            None => false,
        }
    }

    /// Overwrite every cell with `index`, keeping the allocation.
    pub fn fill(&mut self, index: u8) {
        self.cells.fill(index);
    }

    /// Row `y` as a slice.
    #[must_use]
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.width as usize;
        Some(&self.cells[start..start + self.width as usize])
    }

    /// Rows top to bottom. Yields `height` empty slices for a zero-width canvas.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        let width = self.width as usize;
        (0..self.height as usize).map(move |y| &self.cells[y * width..(y + 1) * width])
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    /// Change dimensions, clearing every cell to `index`.
    pub fn resize(&mut self, width: u32, height: u32, index: u8) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width as usize * height as usize, index);
    }

    /// Highest index present, or `None` for an empty canvas.
    #[must_use]
    pub fn max_index(&self) -> Option<u8> {
        self.cells.iter().copied().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_background() {
        let canvas = PixelCanvas::new(4, 3);
        assert_eq!(canvas.width(), 4);
        assert_eq!(canvas.height(), 3);
        assert!(canvas.as_slice().iter().all(|&c| c == 0));
    }

    #[test]
    fn set_and_get() {
        let mut canvas = PixelCanvas::new(4, 3);
        assert!(canvas.set(3, 2, 7));
        assert_eq!(canvas.get(3, 2), Some(7));
        assert_eq!(canvas.row(2), Some(&[0, 0, 0, 7][..]));
    }

    #[test]
    fn out_of_bounds_writes_are_clipped() {
        let mut canvas = PixelCanvas::new(4, 3);
        assert!(!canvas.set(-1, 0, 5));
        assert!(!canvas.set(0, -1, 5));
        assert!(!canvas.set(4, 0, 5));
        assert!(!canvas.set(0, 3, 5));
        assert!(canvas.as_slice().iter().all(|&c| c == 0));
        assert_eq!(canvas.get(4, 0), None);
    }

    #[test]
    fn fill_and_resize() {
        let mut canvas = PixelCanvas::filled(2, 2, 3);
        canvas.fill(1);
        assert!(canvas.as_slice().iter().all(|&c| c == 1));
        canvas.resize(3, 1, 2);
        assert_eq!(canvas.as_slice(), &[2, 2, 2]);
        assert_eq!(canvas.max_index(), Some(2));
    }

    #[test]
    fn rows_iterate_top_to_bottom() {
        let mut canvas = PixelCanvas::new(2, 2);
        canvas.set(0, 1, 9);
        let rows: Vec<_> = canvas.rows().collect();
        assert_eq!(rows, vec![&[0, 0][..], &[9, 0][..]]);
    }

    #[test]
    fn zero_width_rows() {
        let canvas = PixelCanvas::new(0, 3);
        assert_eq!(canvas.rows().count(), 3);
        assert!(canvas.rows().all(<[u8]>::is_empty));
        assert_eq!(canvas.max_index(), None);
    }
}
