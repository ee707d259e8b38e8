//! Character-cell canvas.

use super::{Canvas, Color};

/// One canvas cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

/// Row-major cell buffer implementing [`Canvas`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Screen {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); usize::from(width) * usize::from(height)],
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(i32::from(x), i32::from(y)).map(|i| &self.cells[i])
    }

    /// Characters of row `y`, trailing spaces trimmed.
    pub fn row_text(&self, y: u16) -> String {
        if y >= self.height {
            return String::new();
        }
        let start = usize::from(y) * usize::from(self.width);
        let row: String = self.cells[start..start + usize::from(self.width)]
            .iter()
            .map(|c| c.ch)
            .collect();
        row.trim_end().to_string()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= i32::from(self.width) || y >= i32::from(self.height) {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        Some(y as usize * usize::from(self.width) + x as usize)
    }
}

impl Canvas for Screen {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn cls(&mut self, color: Color) {
        self.cells.fill(Cell {
            ch: ' ',
            fg: Color::White,
            bg: color,
        });
    }

    fn pset(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = Cell {
                ch: ' ',
                fg: color,
                bg: color,
            };
        }
    }

    fn text(&mut self, x: i32, y: i32, s: &str, fg: Color, bg: Option<Color>) {
        for (offset, ch) in (0i32..).zip(s.chars()) {
            if let Some(i) = self.index(x + offset, y) {
                let cell = &mut self.cells[i];
                cell.ch = ch;
                cell.fg = fg;
                if let Some(bg) = bg {
                    cell.bg = bg;
                }
            }
        }
    }
}
