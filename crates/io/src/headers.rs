// Header row resolution.
//
// Row 1 names the columns. Required headers that are missing get appended
// after the last used column; existing columns never move or get renamed,
// so rows written under an older layout stay readable.

use std::collections::HashMap;

use crate::table::{CellValue, Table};

/// Cosmetic style for header cells (applied by the xlsx writer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderStyle {
    pub bold: bool,
    /// 0xRRGGBB
    pub font_color: u32,
    /// 0xRRGGBB, solid fill
    pub fill_color: u32,
    pub centered: bool,
}

impl Default for HeaderStyle {
    fn default() -> Self {
        Self {
            bold: true,
            font_color: 0xFFFFFF,
            fill_color: 0x27AE60,
            centered: true,
        }
    }
}

/// Header name -> 1-based column index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    columns: HashMap<String, usize>,
}

impl HeaderMap {
    /// Build the map from row 1 without modifying the table.
    /// The first occurrence of a duplicated name wins.
    pub fn scan(table: &Table) -> Self {
        let mut columns = HashMap::new();
        for col in 1..=effective_width(table) {
            let name = table.cell(1, col).as_text();
            let name = name.trim();
            if !name.is_empty() {
                columns.entry(name.to_string()).or_insert(col);
            }
        }
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// First of `names` that has a column
    pub fn first_of(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.get(n))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Highest assigned column, 0 when empty
    pub fn max_col(&self) -> usize {
        self.columns.values().copied().max().unwrap_or(0)
    }

    /// (name, column) pairs ordered by column
    pub fn iter_by_col(&self) -> Vec<(&str, usize)> {
        let mut pairs: Vec<(&str, usize)> = self
            .columns
            .iter()
            .map(|(name, col)| (name.as_str(), *col))
            .collect();
        pairs.sort_by_key(|(_, col)| *col);
        pairs
    }
}

/// Column count of the header row. A one-column table whose A1 is blank is
/// an untouched new sheet and counts as having no columns.
fn effective_width(table: &Table) -> usize {
    let width = table.max_col();
    if width == 1 && table.cell(1, 1).is_empty() {
        0
    } else {
        width
    }
}

/// Resolve row 1 into a [`HeaderMap`], writing every missing name from
/// `required` into the next free column. When `style` is given it becomes
/// the table's header style.
pub fn ensure_headers(table: &mut Table, required: &[&str], style: Option<HeaderStyle>) -> HeaderMap {
    let mut map = HeaderMap::scan(table);
    let mut next_col = effective_width(table).max(map.max_col()) + 1;

    for name in required {
        let name = name.trim();
        if name.is_empty() || map.contains(name) {
            continue;
        }
        table.set_cell(1, next_col, CellValue::Text(name.to_string()));
        map.columns.insert(name.to_string(), next_col);
        log::debug!("Appended header '{}' to '{}' at column {}", name, table.name, next_col);
        next_col += 1;
    }

    if style.is_some() {
        table.header_style = style;
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_table() -> Table {
        let mut table = Table::new("BDD_HOTEL");
        for (i, h) in ["Ville", "HTL", "CATÉGORIE"].iter().enumerate() {
            table.set_cell(1, i + 1, (*h).into());
        }
        table.set_cell(2, 1, "Antsirabe".into());
        table
    }

    #[test]
    fn test_scan_existing_headers() {
        let map = HeaderMap::scan(&legacy_table());
        assert_eq!(map.get("Ville"), Some(1));
        assert_eq!(map.get("CATÉGORIE"), Some(3));
        assert_eq!(map.get("Nope"), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_missing_headers_appended_in_order() {
        let mut table = legacy_table();
        let map = ensure_headers(&mut table, &["HTL", "Contact", "Email"], None);
        assert_eq!(map.get("HTL"), Some(2));
        assert_eq!(map.get("Contact"), Some(4));
        assert_eq!(map.get("Email"), Some(5));
        assert_eq!(table.cell(1, 5).as_text(), "Email");
        // data untouched
        assert_eq!(table.cell(2, 1).as_text(), "Antsirabe");
    }

    #[test]
    fn test_ensure_headers_is_idempotent() {
        let mut table = legacy_table();
        let first = ensure_headers(&mut table, &["Contact", "Email"], None);
        let second = ensure_headers(&mut table, &["Contact", "Email"], None);
        assert_eq!(first, second);
        assert_eq!(table.max_col(), 5);

        // a superset only appends
        let third = ensure_headers(&mut table, &["Email", "Contact", "Vignette"], None);
        assert_eq!(third.get("Contact"), Some(4));
        assert_eq!(third.get("Email"), Some(5));
        assert_eq!(third.get("Vignette"), Some(6));
    }

    #[test]
    fn test_blank_single_column_sheet_starts_at_a() {
        let mut table = Table::new("New");
        table.set_cell(1, 1, CellValue::Empty);
        assert_eq!(table.max_col(), 1);
        let map = ensure_headers(&mut table, &["Ref"], None);
        assert_eq!(map.get("Ref"), Some(1));
    }

    #[test]
    fn test_gap_in_header_row_does_not_get_reused() {
        let mut table = Table::new("T");
        table.set_cell(1, 1, "A".into());
        table.set_cell(1, 3, "C".into());
        let map = ensure_headers(&mut table, &["D"], None);
        assert_eq!(map.get("D"), Some(4));
    }

    #[test]
    fn test_duplicate_header_first_wins() {
        let mut table = Table::new("T");
        table.set_cell(1, 1, "Nom".into());
        table.set_cell(1, 2, "Nom".into());
        assert_eq!(HeaderMap::scan(&table).get("Nom"), Some(1));
    }

    #[test]
    fn test_style_recorded_on_table() {
        let mut table = Table::new("T");
        ensure_headers(&mut table, &["A"], Some(HeaderStyle::default()));
        assert_eq!(table.header_style, Some(HeaderStyle::default()));
        ensure_headers(&mut table, &["A"], None);
        assert!(table.header_style.is_some());
    }

    #[test]
    fn test_first_of_and_iter_by_col() {
        let map = HeaderMap::scan(&legacy_table());
        assert_eq!(map.first_of(&["Lieu", "Ville"]), Some(1));
        let names: Vec<&str> = map.iter_by_col().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Ville", "HTL", "CATÉGORIE"]);
    }
}
