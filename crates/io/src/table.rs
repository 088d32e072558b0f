// In-memory workbook model: named tables of 1-based rows and columns.
//
// Row 1 of every table is the header row. The model carries no styling
// except the header style and column widths, which the xlsx writer applies.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::headers::HeaderStyle;

/// Scalar content of one cell
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
}

impl CellValue {
    /// Empty cells and empty strings are both "absent" for key scans.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for string fields and column sizing.
    /// Integral floats render without a fractional part ("12", not "12.0").
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Int(n) => n.to_string(),
            CellValue::Float(f) => format_float(*f),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

static EMPTY: CellValue = CellValue::Empty;

/// One sheet of a workbook
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
    /// Style applied to the non-empty cells of row 1 on save
    pub header_style: Option<HeaderStyle>,
    /// Column index (1-based) -> width in Excel character units
    pub col_widths: BTreeMap<usize, f64>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Number of rows holding any cell (including trailing blank rows that were written)
    pub fn max_row(&self) -> usize {
        self.rows.len()
    }

    /// Widest row, in columns
    pub fn max_col(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Cell at 1-based (row, col); out-of-range cells read as empty
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        if row == 0 || col == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .unwrap_or(&EMPTY)
    }

    /// Write a cell at 1-based (row, col), growing the grid as needed
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        debug_assert!(row > 0 && col > 0, "table coordinates are 1-based");
        if row == 0 || col == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize(col, CellValue::Empty);
        }
        cells[col - 1] = value;
    }

    /// Remove a row, shifting every row below it up by one.
    /// Returns false when the row does not exist.
    pub fn delete_row(&mut self, row: usize) -> bool {
        if row == 0 || row > self.rows.len() {
            return false;
        }
        self.rows.remove(row - 1);
        true
    }

    /// First row at or after `start` whose cell in `key_col` is empty
    pub fn first_empty_row(&self, key_col: usize, start: usize) -> usize {
        let mut row = start.max(1);
        while row <= self.rows.len() {
            if self.cell(row, key_col).is_empty() {
                return row;
            }
            row += 1;
        }
        self.rows.len() + 1
    }

    /// Data rows (from row 2) up to, but excluding, the first empty key cell
    pub fn data_rows(&self, key_col: usize) -> std::ops::Range<usize> {
        2..self.first_empty_row(key_col, 2)
    }

    /// Iterate non-empty cells as (row, col, value), 1-based, row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &CellValue)> {
        self.rows.iter().enumerate().flat_map(|(r, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, v)| !matches!(v, CellValue::Empty))
                .map(move |(c, v)| (r + 1, c + 1, v))
        })
    }

    /// Size every used column to its longest rendered value plus padding,
    /// capped at `max_width` characters.
    pub fn autosize_columns(&mut self, max_width: f64) {
        let mut longest: BTreeMap<usize, usize> = BTreeMap::new();
        for (_, col, value) in self.cells() {
            let len = value.as_text().chars().count();
            let entry = longest.entry(col).or_insert(0);
            *entry = (*entry).max(len);
        }
        self.col_widths = longest
            .into_iter()
            .map(|(col, len)| (col, (len as f64 + 2.0).min(max_width)))
            .collect();
    }
}

/// An ordered set of named tables backed by one file
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    tables: Vec<Table>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Existing table by name, or a new empty one appended to the workbook
    pub fn table_or_insert(&mut self, name: &str) -> &mut Table {
        let idx = match self.tables.iter().position(|t| t.name == name) {
            Some(idx) => idx,
            None => {
                self.tables.push(Table::new(name));
                self.tables.len() - 1
            }
        };
        &mut self.tables[idx]
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
