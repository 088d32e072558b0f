// Generic record store over one sheet of a workbook file
//
// Reads go through a per-store TTL cache keyed by the filter. Every
// successful mutation rewrites the whole file and clears the cache.
// Mutations take the writer lock of their file, shared by every store
// pointing at it; readers never take it.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use lahimena_io::{backup, ensure_headers, xlsx, CellValue, FieldMap, HeaderMap, HeaderStyle, Table, Workbook};
use parking_lot::Mutex;

use crate::cache::{get_or_load, CacheKey, CacheStats, Clock, SystemClock, TtlCache};
use crate::entity::Entity;
use crate::error::StoreError;
use crate::schema::{Extension, FieldSpec};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MAX_COLUMN_WIDTH: f64 = 25.0;

pub struct SheetStore<E: Entity> {
    path: PathBuf,
    sheet: String,
    extension_sheet: Option<String>,
    ttl: Duration,
    max_column_width: f64,
    header_style: HeaderStyle,
    cache: Mutex<TtlCache<CacheKey, Vec<E>>>,
    write_lock: Arc<Mutex<()>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SheetStore<E> {
    pub fn new(path: impl Into<PathBuf>, sheet: &str) -> Self {
        let path = path.into();
        Self {
            write_lock: file_lock(&path),
            path,
            sheet: sheet.to_string(),
            extension_sheet: None,
            ttl: DEFAULT_TTL,
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
            header_style: HeaderStyle::default(),
            cache: Mutex::new(TtlCache::with_clock(E::KIND, Arc::new(SystemClock))),
            _entity: PhantomData,
        }
    }

    /// Name of the secondary sheet; ignored for kinds without an extension
    pub fn with_extension_sheet(mut self, sheet: &str) -> Self {
        if E::extension().is_some() {
            self.extension_sheet = Some(sheet.to_string());
        }
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self { cache: Mutex::new(TtlCache::with_clock(E::KIND, clock)), ..self }
    }

    pub fn with_max_column_width(mut self, width: f64) -> Self {
        self.max_column_width = width;
        self
    }

    pub fn with_header_style(mut self, style: HeaderStyle) -> Self {
        self.header_style = style;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    /// All records in row order, optionally filtered.
    ///
    /// A missing file or sheet yields an empty list and creates nothing.
    pub fn load_all(&self, filter: Option<&E::Filter>) -> Result<Vec<E>, StoreError> {
        let key = match filter {
            Some(f) => CacheKey::new(E::KIND).with_arg(f),
            None => CacheKey::new(E::KIND),
        };

        get_or_load(&self.cache, key, self.ttl, || {
            let records = self.read_records(filter)?;
            log::debug!("Loaded {} {} from '{}'", records.len(), E::KIND, self.path.display());
            Ok(records)
        })
    }

    /// Record currently stored at `row`
    pub fn get_by_row(&self, row: usize) -> Result<Option<E>, StoreError> {
        Ok(self.load_all(None)?.into_iter().find(|r| r.row_number() == row))
    }

    /// First record whose key matches, ignoring surrounding whitespace
    pub fn find_by_key(&self, key: &str) -> Result<Option<E>, StoreError> {
        let key = key.trim();
        Ok(self.load_all(None)?.into_iter().find(|r| r.key() == key))
    }

    /// Write `record` into the first row whose key cell is empty and return
    /// that row. Creates the file, sheet and headers as needed.
    pub fn append(&self, record: &E) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock();

        let mut workbook = xlsx::load_if_exists(&self.path)?.unwrap_or_default();
        let fields = record.to_fields();

        let row = {
            let table = workbook.table_or_insert(&self.sheet);
            let headers = self.prepare_headers(table, E::fields(), &fields, true);
            let key_col = column_of(&headers, E::key_field()).unwrap_or(1);
            let row = table.first_empty_row(key_col, 2);
            write_row(table, &headers, row, E::fields(), &fields, true);
            table.autosize_columns(self.max_column_width);
            row
        };

        let key = record.key();
        self.write_extension(&mut workbook, &fields, &[key.as_str()])?;

        xlsx::save(&workbook, &self.path)?;
        log::info!("Appended {} '{}' at row {} of '{}'", E::KIND, key, row, self.sheet);
        self.invalidate();
        Ok(row)
    }

    /// Overwrite the record at `row` (2 or greater). Returns false when the
    /// file, sheet or row does not exist.
    pub fn update_by_row(&self, row: usize, record: &E) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();

        backup::create_backup(&self.path);
        let Some(mut workbook) = xlsx::load_if_exists(&self.path)? else {
            log::warn!("Update of row {}: '{}' does not exist", row, self.path.display());
            return Ok(false);
        };
        let fields = record.to_fields();

        let previous_key = {
            let Some(table) = workbook.table_mut(&self.sheet) else {
                log::warn!("Update of row {}: no sheet '{}'", row, self.sheet);
                return Ok(false);
            };
            if row < 2 || row > table.max_row() {
                log::warn!("Update of row {}: out of range for '{}'", row, self.sheet);
                return Ok(false);
            }
            let previous_key = key_at(table, E::key_field(), row);
            let headers = self.prepare_headers(table, E::fields(), &fields, true);
            write_row(table, &headers, row, E::fields(), &fields, true);
            table.autosize_columns(self.max_column_width);
            previous_key
        };

        let key = record.key();
        self.write_extension(&mut workbook, &fields, &[previous_key.as_str(), key.as_str()])?;

        xlsx::save(&workbook, &self.path)?;
        log::info!("Updated {} row {} of '{}'", E::KIND, row, self.sheet);
        self.invalidate();
        Ok(true)
    }

    /// Remove `row` (2 or greater), shifting later rows up. The matching
    /// secondary row, if any, goes with it.
    pub fn delete_by_row(&self, row: usize) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();

        backup::create_backup(&self.path);
        let Some(mut workbook) = xlsx::load_if_exists(&self.path)? else {
            log::warn!("Delete of row {}: '{}' does not exist", row, self.path.display());
            return Ok(false);
        };

        let key = {
            let Some(table) = workbook.table_mut(&self.sheet) else {
                log::warn!("Delete of row {}: no sheet '{}'", row, self.sheet);
                return Ok(false);
            };
            if row < 2 || row > table.max_row() {
                log::warn!("Delete of row {}: out of range for '{}'", row, self.sheet);
                return Ok(false);
            }
            let key = key_at(table, E::key_field(), row);
            table.delete_row(row);
            key
        };

        if let (Some(extension), Some(sheet)) = (E::extension(), &self.extension_sheet) {
            if let Some(table) = workbook.table_mut(sheet) {
                if let Some(ext_row) = find_extension_row(table, extension, &key) {
                    table.delete_row(ext_row);
                    log::debug!("Deleted '{}' row {} for key '{}'", sheet, ext_row, key);
                }
            }
        }

        xlsx::save(&workbook, &self.path)?;
        log::info!("Deleted {} row {} of '{}'", E::KIND, row, self.sheet);
        self.invalidate();
        Ok(true)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn invalidate(&self) {
        self.cache.lock().clear();
    }

    fn read_records(&self, filter: Option<&E::Filter>) -> Result<Vec<E>, StoreError> {
        let Some(workbook) = xlsx::load_if_exists(&self.path)? else {
            return Ok(Vec::new());
        };
        let Some(table) = workbook.table(&self.sheet) else {
            return Ok(Vec::new());
        };

        let headers = HeaderMap::scan(table);
        let Some(key_col) = read_column(table, &headers, E::key_field()) else {
            log::warn!("Sheet '{}' has no {} column", self.sheet, E::key_field().header);
            return Ok(Vec::new());
        };

        let extended = self.extension_index(&workbook);

        let mut records = Vec::new();
        for row in table.data_rows(key_col) {
            let mut fields = decode_row(table, &headers, row, E::fields());
            let key = table.cell(row, key_col).as_text().trim().to_string();
            if let Some(ext_fields) = extended.get(&key) {
                for (name, value) in ext_fields {
                    fields.entry(name.clone()).or_insert_with(|| value.clone());
                }
            }

            let mut record = E::from_fields(&fields);
            record.set_row_number(row);
            if filter.map_or(true, |f| record.matches(f)) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Secondary rows by key, holding only schema columns. The first row
    /// for a key wins.
    fn extension_index(&self, workbook: &Workbook) -> HashMap<String, FieldMap> {
        let mut index = HashMap::new();
        let (Some(extension), Some(sheet)) = (E::extension(), &self.extension_sheet) else {
            return index;
        };
        let Some(table) = workbook.table(sheet) else {
            return index;
        };

        let headers = HeaderMap::scan(table);
        let Some(key_col) = column_of(&headers, &extension.key) else {
            return index;
        };
        for row in table.data_rows(key_col) {
            let key = table.cell(row, key_col).as_text().trim().to_string();
            let mut fields = FieldMap::new();
            for spec in extension.fields {
                if let Some(col) = column_of(&headers, spec) {
                    let value = table.cell(row, col);
                    if !value.is_empty() {
                        fields.insert(spec.header.to_string(), value.clone());
                    }
                }
            }
            index.entry(key).or_insert(fields);
        }
        index
    }

    /// Write the secondary row for a record, located by the first matching
    /// key in `keys`. A new row is only added when there is something to
    /// store.
    fn write_extension(&self, workbook: &mut Workbook, fields: &FieldMap, keys: &[&str]) -> Result<(), StoreError> {
        let (Some(extension), Some(sheet)) = (E::extension(), &self.extension_sheet) else {
            return Ok(());
        };

        let has_data = extension
            .fields
            .iter()
            .any(|spec| fields.get(spec.name).is_some_and(|v| !v.is_empty()));
        let existing = workbook
            .table(sheet)
            .and_then(|table| keys.iter().filter(|k| !k.is_empty()).find_map(|k| find_extension_row(table, extension, k)));
        if existing.is_none() && !has_data {
            return Ok(());
        }

        let table = workbook.table_or_insert(sheet);
        let mut specs: Vec<&FieldSpec> = vec![&extension.key];
        specs.extend(extension.fields.iter());
        let missing: Vec<&str> = {
            let headers = HeaderMap::scan(table);
            specs.iter().filter(|s| column_of(&headers, s).is_none()).map(|s| s.header).collect()
        };
        let headers = ensure_headers(table, &missing, Some(self.header_style));
        let key_col = column_of(&headers, &extension.key).unwrap_or(1);

        let row = existing.unwrap_or_else(|| table.first_empty_row(key_col, 2));
        for spec in specs {
            if let Some(col) = column_of(&headers, spec) {
                let value = fields.get(spec.name).cloned().unwrap_or_default();
                table.set_cell(row, col, value);
            }
        }
        table.autosize_columns(self.max_column_width);
        log::debug!("Wrote '{}' row {}", sheet, row);
        Ok(())
    }

    /// Make sure every schema field, and every extra key when `extras` is
    /// set, has a header column
    fn prepare_headers(&self, table: &mut Table, specs: &[FieldSpec], fields: &FieldMap, extras: bool) -> HeaderMap {
        claim_legacy_columns(table, specs);
        let current = HeaderMap::scan(table);
        let mut missing: Vec<&str> = specs
            .iter()
            .filter(|s| column_of(&current, s).is_none())
            .map(|s| s.header)
            .collect();
        if extras {
            let mut extra_keys: Vec<&str> = fields
                .keys()
                .map(String::as_str)
                .filter(|k| !specs.iter().any(|s| s.name == *k) && !current.contains(k))
                .collect();
            extra_keys.sort_unstable();
            missing.extend(extra_keys);
        }
        ensure_headers(table, &missing, Some(self.header_style))
    }
}

/// Writer lock for `path`, shared by every store on the same file
fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    LOCKS.get_or_init(Default::default).lock().entry(key).or_default().clone()
}

/// Name the blank header cells that reads already treat as fixed legacy
/// columns, so rows stored there keep their meaning once headers exist.
/// A sheet without data rows keeps the schema's column order.
fn claim_legacy_columns(table: &mut Table, specs: &[FieldSpec]) {
    if table.max_row() < 2 {
        return;
    }
    let headers = HeaderMap::scan(table);
    let claimed: Vec<(usize, &str)> = specs
        .iter()
        .filter(|spec| column_of(&headers, spec).is_none())
        .filter_map(|spec| read_column(table, &headers, spec).map(|col| (col, spec.header)))
        .collect();
    for (col, header) in claimed {
        table.set_cell(1, col, CellValue::Text(header.to_string()));
        log::debug!("Named legacy column {} of '{}' as '{}'", col, table.name, header);
    }
}

/// Column holding `spec`: the first of its headers present in row 1
fn column_of(headers: &HeaderMap, spec: &FieldSpec) -> Option<usize> {
    headers.first_of(&spec.headers())
}

/// Column to read `spec` from. Falls back to the fixed legacy position when
/// no header matches and that column has no header of its own.
fn read_column(table: &Table, headers: &HeaderMap, spec: &FieldSpec) -> Option<usize> {
    if let Some(col) = column_of(headers, spec) {
        return Some(col);
    }
    let col = spec.legacy_column?;
    table.cell(1, col).is_empty().then_some(col)
}

/// Row as header -> value, plus legacy-position values under semantic names
fn decode_row(table: &Table, headers: &HeaderMap, row: usize, specs: &[FieldSpec]) -> FieldMap {
    let mut fields = FieldMap::new();
    for (name, col) in headers.iter_by_col() {
        let value = table.cell(row, col);
        if !value.is_empty() {
            fields.insert(name.to_string(), value.clone());
        }
    }
    for spec in specs {
        if column_of(headers, spec).is_some() {
            continue;
        }
        if let Some(col) = read_column(table, headers, spec) {
            let value = table.cell(row, col);
            if !value.is_empty() {
                fields.insert(spec.name.to_string(), value.clone());
            }
        }
    }
    fields
}

/// Overwrite `row` with `fields`. Schema fields are keyed by semantic name;
/// other keys are extra columns named by their header.
fn write_row(table: &mut Table, headers: &HeaderMap, row: usize, specs: &[FieldSpec], fields: &FieldMap, extras: bool) {
    for spec in specs {
        if let Some(col) = column_of(headers, spec) {
            let value = fields.get(spec.name).cloned().unwrap_or_default();
            table.set_cell(row, col, value);
        }
    }
    if extras {
        for (name, value) in fields {
            if specs.iter().any(|s| s.name == name.as_str()) {
                continue;
            }
            if let Some(col) = headers.get(name) {
                table.set_cell(row, col, value.clone());
            }
        }
    }
}

fn key_at(table: &Table, key: &FieldSpec, row: usize) -> String {
    let headers = HeaderMap::scan(table);
    read_column(table, &headers, key)
        .map(|col| table.cell(row, col).as_text().trim().to_string())
        .unwrap_or_default()
}

fn find_extension_row(table: &Table, extension: &Extension, key: &str) -> Option<usize> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let headers = HeaderMap::scan(table);
    let key_col = column_of(&headers, &extension.key)?;
    table
        .data_rows(key_col)
        .find(|row| table.cell(*row, key_col).as_text().trim() == key)
}

impl<E: Entity> std::fmt::Debug for SheetStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetStore")
            .field("kind", &E::KIND)
            .field("path", &self.path)
            .field("sheet", &self.sheet)
            .field("extension_sheet", &self.extension_sheet)
            .field("ttl", &self.ttl)
            .finish()
    }
}
