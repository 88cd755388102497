use std::fmt;

/// Character matrix produced by a conversion pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharGrid {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<char>,
}

impl CharGrid {
    pub fn new(width: usize, height: usize, cells: Vec<char>) -> Self {
        assert_eq!(width * height, cells.len());
        Self { width, height, cells }
    }

    pub fn get(&self, row: usize, column: usize) -> Option<char> {
        if row >= self.height || column >= self.width {
            return None;
        }
        self.cells.get(row * self.width + column).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        let width = self.width.max(1);
        self.cells.chunks(width).map(|row| row.iter().collect::<String>())
    }
}

impl fmt::Display for CharGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}
