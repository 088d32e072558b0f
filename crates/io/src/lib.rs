// Spreadsheet persistence primitives
//
// A workbook file is an ordered set of tables; row 1 of each table names the
// columns. Everything above this crate (record stores, caches) sees only the
// `Table` model, never the file codec.

pub mod backup;
pub mod error;
pub mod fields;
pub mod headers;
pub mod numeric;
pub mod table;
pub mod xlsx;

pub use backup::{create_backup, list_backups};
pub use error::IoError;
pub use fields::{first_available, first_text, FieldMap};
pub use headers::{ensure_headers, HeaderMap, HeaderStyle};
pub use numeric::{parse_number, parse_number_str, Number};
pub use table::{CellValue, Table, Workbook};
