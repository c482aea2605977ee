use crate::spreadsheet::cell::Cell;

/// Cells of one worksheet together with the bounds of the used area.
pub(crate) struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells, in document order
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_upper_bound: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell and widens the used area to include it.
    pub(super) fn push(&mut self, cell: Cell) {
        let (row, col) = (cell.row, cell.col);
        if self.row_lower_bound.map(|lower| row < lower).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|upper| upper < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_upper_bound.map(|upper| upper < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
        self.cells.push(cell);
    }

    /// Lays the cells out as a grid spanning the first to the last used row and column A
    /// to the right-most used column. Positions without a cell are `None`.
    pub(crate) fn grid(&self) -> Vec<Vec<Option<&Cell>>> {
        let (Some(row_lower), Some(row_upper), Some(col_upper)) =
            (self.row_lower_bound, self.row_upper_bound, self.col_upper_bound)
        else {
            return Vec::new();
        };
        let mut grid: Vec<Vec<Option<&Cell>>> = vec![vec![None; col_upper + 1]; row_upper - row_lower + 1];
        for cell in &self.cells {
            grid[cell.row - row_lower][cell.col] = Some(cell);
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use crate::spreadsheet::cell::*;
    use crate::spreadsheet::sheet::*;

    fn push(sheet: &mut Sheet, row: usize, col: usize) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: format!("{row}:{col}"),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("Sheet1");

        assert!(sheet.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert_eq!(sheet.row_upper_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
        assert!(sheet.grid().is_empty());
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("Sheet1");
        push(&mut sheet, 1, 1);
        push(&mut sheet, 1, 3);
        push(&mut sheet, 3, 1);

        assert_eq!(sheet.cells.len(), 3);
        assert_eq!(sheet.row_lower_bound, Some(1));
        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_upper_bound, Some(3));
    }

    #[test]
    fn sheet_grid() {
        let mut sheet = Sheet::new("Sheet1");
        push(&mut sheet, 2, 1);
        push(&mut sheet, 4, 0);

        let grid = sheet.grid();
        assert_eq!(grid.len(), 3);
        assert!(grid.iter().all(|row| row.len() == 2));
        assert_eq!(grid[0][1].map(|cell| cell.value.as_str()), Some("2:1"));
        assert!(grid[0][0].is_none());
        assert!(grid[1].iter().all(Option::is_none));
        assert_eq!(grid[2][0].map(|cell| cell.value.as_str()), Some("4:0"));
    }
}
