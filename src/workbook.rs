use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};

use crate::error::{MigrationError, Stage};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Self::Text(s) => s.trim().to_owned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(_) => false,
            Self::Text(s) => s.trim().is_empty(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

static EMPTY: Cell = Cell::Empty;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn set(&mut self, row: usize, col: usize, value: Cell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = value;
    }
}

pub trait Workbook {
    fn sheet_names(&self) -> Vec<String>;

    fn sheet_grid(&mut self, name: &str) -> Result<Grid, MigrationError>;
}

pub struct XlsxWorkbook {
    sheets: Sheets<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open(path: &Path) -> Result<Self, MigrationError> {
        let sheets = open_workbook_auto(path).map_err(|e| {
            MigrationError::input(
                Stage::OpenWorkbook,
                format!("failed to open {}: {e}", path.display()),
            )
        })?;
        Ok(Self { sheets })
    }
}

impl Workbook for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn sheet_grid(&mut self, name: &str) -> Result<Grid, MigrationError> {
        let range = self.sheets.worksheet_range(name).map_err(|e| {
            MigrationError::input(Stage::ReadSheet, format!("failed to read sheet {name:?}: {e}"))
        })?;
        Ok(grid_from_range(&range))
    }
}

/// Converts a calamine range into an absolutely-addressed grid.
///
/// calamine trims leading empty rows/columns, so its relative positions are
/// shifted back by the range's start.
fn grid_from_range(range: &Range<Data>) -> Grid {
    let mut grid = Grid::default();
    let Some((start_row, start_col)) = range.start() else {
        return grid;
    };
    for (row, col, data) in range.cells() {
        let cell = convert_cell(data);
        if cell.is_empty() {
            continue;
        }
        grid.set(row + start_row as usize, col + start_col as usize, cell);
    }
    grid
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        // Date-formatted cells keep their serial so decode_date sees a number.
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, Option<Grid>)>,
}

#[cfg(test)]
impl MemoryWorkbook {
    pub fn with_sheet(mut self, name: &str, grid: Grid) -> Self {
        self.sheets.push((name.to_owned(), Some(grid)));
        self
    }

    pub fn with_unreadable_sheet(mut self, name: &str) -> Self {
        self.sheets.push((name.to_owned(), None));
        self
    }
}

#[cfg(test)]
impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn sheet_grid(&mut self, name: &str) -> Result<Grid, MigrationError> {
        self.sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .and_then(|(_, grid)| grid.clone())
            .ok_or_else(|| {
                MigrationError::input(Stage::ReadSheet, format!("sheet {name:?} has no grid"))
            })
    }
}
