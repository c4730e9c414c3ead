/// One map layer drawn in braille dots.
///
/// A terminal cell holds a 2x4 dot grid, so a `cols` x `rows` canvas has
/// `cols * 2` x `rows * 4` addressable pixels. Blank cells render as U+2800.
pub struct BrailleCanvas {
    cols: usize,
    rows: usize,
    cells: Vec<u8>,
}

// Bit for dot (x % 2, y % 4):
//   0x01 0x08
//   0x02 0x10
//   0x04 0x20
//   0x40 0x80
const DOT_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

const BLANK: u32 = 0x2800;

impl BrailleCanvas {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![0; cols * rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Light a dot; anything outside the canvas, negative included, is dropped
    pub fn set_pixel(&mut self, x: i32, y: i32) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        let (col, row) = (x / 2, y / 4);
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] |= DOT_BITS[x % 2][y % 4];
        }
    }

    pub fn is_lit(&self, col: usize, row: usize) -> bool {
        col < self.cols && row < self.rows && self.cells[row * self.cols + col] != 0
    }

    /// Number of cells with at least one dot
    pub fn lit_cells(&self) -> usize {
        self.cells.iter().filter(|&&bits| bits != 0).count()
    }

    pub fn row_chars(&self, row: usize) -> impl Iterator<Item = char> + '_ {
        let start = row.min(self.rows) * self.cols;
        let end = if row < self.rows { start + self.cols } else { start };
        self.cells[start..end]
            .iter()
            .map(|&bits| char::from_u32(BLANK + u32::from(bits)).unwrap_or(' '))
    }

    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.rows)
            .map(|row| self.row_chars(row).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
