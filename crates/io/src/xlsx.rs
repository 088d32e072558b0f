// Excel workbook load (xlsx, xls, xlsb, ods via calamine) and save (xlsx only)
//
// Load keeps values only; styles are not read back. Save rewrites the whole
// file: the workbook is serialized in memory, written to a sibling temp
// file, then renamed over the target so a failed save leaves the previous
// file intact.

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatPattern, Workbook as XlsxWorkbook, Worksheet, XlsxError};

use crate::error::IoError;
use crate::headers::HeaderStyle;
use crate::table::{CellValue, Table, Workbook};

/// Load every sheet of a workbook file
pub fn load(path: &Path) -> Result<Workbook, IoError> {
    let mut sheets: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::open(path, e))?;
    let sheet_names: Vec<String> = sheets.sheet_names().to_vec();

    let mut tables = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = sheets.worksheet_range(sheet_name).map_err(|e| IoError::Read {
            sheet: sheet_name.clone(),
            message: e.to_string(),
        })?;

        let mut table = Table::new(sheet_name);

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        for (r, row) in range.rows().enumerate() {
            for (c, data) in row.iter().enumerate() {
                let value = cell_from_data(data);
                if value != CellValue::Empty {
                    table.set_cell(start_row as usize + r + 1, start_col as usize + c + 1, value);
                }
            }
        }
        tables.push(table);
    }

    log::debug!("Loaded {} sheet(s) from {}", tables.len(), path.display());
    Ok(Workbook::from_tables(tables))
}

/// Load a workbook, or None when the file does not exist
pub fn load_if_exists(path: &Path) -> Result<Option<Workbook>, IoError> {
    if !path.exists() {
        return Ok(None);
    }
    load(path).map(Some)
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(n) => CellValue::Int(*n),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // Serial date number; callers that need dates format their own text
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// Save the workbook as xlsx, replacing `path` atomically
pub fn save(workbook: &Workbook, path: &Path) -> Result<(), IoError> {
    let mut xlsx_workbook = XlsxWorkbook::new();

    for table in workbook.tables() {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(&table.name)
            .map_err(|e| IoError::write(path, format!("sheet '{}': {}", table.name, e)))?;
        write_table(worksheet, table).map_err(|e| IoError::write(path, format!("sheet '{}': {}", table.name, e)))?;
    }

    // xlsx requires at least one sheet
    if workbook.is_empty() {
        xlsx_workbook.add_worksheet();
    }

    let buffer = xlsx_workbook
        .save_to_buffer()
        .map_err(|e| IoError::write(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::write(path, e))?;
    }

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, &buffer).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(IoError::write(path, e));
    }

    log::debug!("Saved {} sheet(s) to {}", workbook.tables().len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "workbook.xlsx".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_table(worksheet: &mut Worksheet, table: &Table) -> Result<(), XlsxError> {
    let header_format = table.header_style.map(build_header_format);

    for (row, col, value) in table.cells() {
        let row32 = (row - 1) as u32;
        let col16 = (col - 1) as u16;
        let format = if row == 1 { header_format.as_ref() } else { None };

        match (value, format) {
            (CellValue::Empty, _) => {}
            (CellValue::Text(s), Some(format)) => {
                worksheet.write_string_with_format(row32, col16, s, format)?;
            }
            (CellValue::Text(s), None) => {
                worksheet.write_string(row32, col16, s)?;
            }
            (CellValue::Int(n), Some(format)) => {
                worksheet.write_number_with_format(row32, col16, *n as f64, format)?;
            }
            (CellValue::Int(n), None) => {
                worksheet.write_number(row32, col16, *n as f64)?;
            }
            (CellValue::Float(f), Some(format)) => {
                worksheet.write_number_with_format(row32, col16, *f, format)?;
            }
            (CellValue::Float(f), None) => {
                worksheet.write_number(row32, col16, *f)?;
            }
        }
    }

    for (col, width) in &table.col_widths {
        if *col > 0 {
            worksheet.set_column_width((*col - 1) as u16, *width)?;
        }
    }

    Ok(())
}

fn build_header_format(style: HeaderStyle) -> Format {
    let mut format = Format::new()
        .set_font_color(Color::RGB(style.font_color))
        .set_background_color(Color::RGB(style.fill_color))
        .set_pattern(FormatPattern::Solid);

    if style.bold {
        format = format.set_bold();
    }
    if style.centered {
        format = format.set_align(FormatAlign::Center);
    }
    format
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::ensure_headers;

    fn sample_workbook() -> Workbook {
        let mut workbook = Workbook::new();
        let clients = workbook.table_or_insert("DEMANDE_CLIENT");
        ensure_headers(clients, &["Réf. Client", "Nom", "Nuits"], Some(HeaderStyle::default()));
        clients.set_cell(2, 1, "C1".into());
        clients.set_cell(2, 2, "Dupont".into());
        clients.set_cell(2, 3, CellValue::Int(3));
        clients.set_cell(3, 1, "C2".into());
        clients.set_cell(3, 3, CellValue::Float(2.5));
        clients.autosize_columns(25.0);

        workbook.table_or_insert("INFOS_CLIENT").set_cell(1, 1, "Ref_Client".into());
        workbook
    }

    #[test]
    fn test_save_and_load_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        save(&sample_workbook(), &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.table_names(), vec!["DEMANDE_CLIENT", "INFOS_CLIENT"]);
        let clients = loaded.table("DEMANDE_CLIENT").unwrap();
        assert_eq!(clients.cell(1, 1).as_text(), "Réf. Client");
        assert_eq!(clients.cell(2, 2).as_text(), "Dupont");
        // xlsx stores every number as a float
        assert_eq!(clients.cell(2, 3), &CellValue::Float(3.0));
        assert_eq!(clients.cell(3, 3), &CellValue::Float(2.5));
        assert!(clients.cell(3, 2).is_empty());
        assert_eq!(loaded.table("INFOS_CLIENT").unwrap().cell(1, 1).as_text(), "Ref_Client");
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        save(&sample_workbook(), &path).unwrap();
        save(&sample_workbook(), &path).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["data.xlsx".to_string()]);
    }

    #[test]
    fn test_save_empty_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        save(&Workbook::new(), &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.tables().len(), 1);
        assert_eq!(loaded.tables()[0].max_row(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        assert!(matches!(load(&path), Err(IoError::Open { .. })));
        assert!(load_if_exists(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_rejects_non_spreadsheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.xlsx");
        fs::write(&path, b"not a zip archive").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_invalid_sheet_name_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        let mut workbook = Workbook::new();
        workbook.table_or_insert("bad[name]");
        assert!(matches!(save(&workbook, &path), Err(IoError::Write { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let tmp = temp_path(Path::new("/data/clients/data.xlsx"));
        assert_eq!(tmp, PathBuf::from("/data/clients/data.xlsx.tmp"));
    }
}
