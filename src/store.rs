/// Row store access
///
/// This module handles:
/// - The positional row-store interface the reconciler writes through
/// - An in-memory store (tests, dry runs)
/// - A JSON workbook file with locking and atomic rewrites
///
/// Rows and columns are addressed 1-based, row 1 being each sheet's header.

use fs2::FileExt;
use log::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Sheet name for tickets
pub const TICKET_SHEET: &str = "tickets";
/// Sheet name for store profiles
pub const PROFILE_SHEET: &str = "profiles";

/// Error talking to the row store
#[derive(Debug)]
pub enum StoreError {
    /// The store could not be reached or opened
    Unreachable(String),
    /// The store answered with data we cannot interpret
    Malformed(String),
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unreachable(e) => write!(f, "row store unreachable: {}", e),
            StoreError::Malformed(e) => write!(f, "row store data malformed: {}", e),
            StoreError::Io(e) => write!(f, "row store I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// A single cell write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    /// 1-based row (row 1 is the header)
    pub row: usize,
    /// 1-based column
    pub column: usize,
    pub value: String,
}

/// Appends and cell updates committed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePlan {
    pub updates: Vec<CellUpdate>,
    pub appends: Vec<Vec<String>>,
}

impl WritePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.appends.is_empty()
    }
}

/// Positional row store (spreadsheet-like)
pub trait RowStore {
    /// All rows of a sheet, header row first
    fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Append a row after the last one
    fn append_row(&mut self, sheet: &str, row: Vec<String>) -> Result<(), StoreError>;

    /// Overwrite one cell
    fn update_cell(&mut self, sheet: &str, update: CellUpdate) -> Result<(), StoreError>;

    /// Overwrite several cells. The default writes them one at a time.
    fn batch_update(&mut self, sheet: &str, updates: &[CellUpdate]) -> Result<(), StoreError> {
        for update in updates {
            self.update_cell(sheet, update.clone())?;
        }
        Ok(())
    }

    /// Commit a write plan: cell updates first, then appends.
    ///
    /// The default runs the plan as separate calls. Stores that can commit
    /// all of it at once should override this.
    fn apply(&mut self, sheet: &str, plan: &WritePlan) -> Result<(), StoreError> {
        if !plan.updates.is_empty() {
            self.batch_update(sheet, &plan.updates)?;
        }
        for row in &plan.appends {
            self.append_row(sheet, row.clone())?;
        }
        Ok(())
    }
}

//
// Sheet Storage
//

/// Named sheets of string rows
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Workbook {
    pub sheets: BTreeMap<String, Vec<Vec<String>>>,
}

impl Workbook {
    /// Workbook with the ticket and profile sheets holding only their headers
    pub fn with_named_headers(ticket_sheet: &str, profile_sheet: &str) -> Self {
        let mut sheets = BTreeMap::new();
        sheets.insert(ticket_sheet.to_string(), vec![crate::types::ticket_sheet_header()]);
        sheets.insert(profile_sheet.to_string(), vec![crate::types::profile_sheet_header()]);
        Workbook { sheets }
    }

    fn sheet(&self, name: &str) -> Result<&Vec<Vec<String>>, StoreError> {
        self.sheets.get(name).ok_or_else(|| StoreError::Malformed(format!("missing sheet '{}'", name)))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Vec<Vec<String>>, StoreError> {
        self.sheets.get_mut(name).ok_or_else(|| StoreError::Malformed(format!("missing sheet '{}'", name)))
    }

    /// Number of rows in `sheet` that differ from `other`, counting added or removed rows
    pub fn changed_rows(&self, other: &Workbook, sheet: &str) -> usize {
        let empty = Vec::new();
        let ours = self.sheets.get(sheet).unwrap_or(&empty);
        let theirs = other.sheets.get(sheet).unwrap_or(&empty);
        let edited = ours.iter().zip(theirs.iter()).filter(|(a, b)| a != b).count();
        edited + ours.len().abs_diff(theirs.len())
    }

    /// Apply a plan to this in-memory copy
    pub fn apply_plan(&mut self, sheet: &str, plan: &WritePlan) -> Result<(), StoreError> {
        let rows = self.sheet_mut(sheet)?;
        for update in &plan.updates {
            set_cell(rows, update)?;
        }
        for row in &plan.appends {
            rows.push(row.clone());
        }
        Ok(())
    }
}

fn set_cell(rows: &mut [Vec<String>], update: &CellUpdate) -> Result<(), StoreError> {
    if update.row == 0 || update.column == 0 {
        return Err(StoreError::Malformed(format!("cell address {}:{} is not 1-based", update.row, update.column)));
    }
    let row_count = rows.len();
    let row = rows.get_mut(update.row - 1).ok_or_else(|| {
        StoreError::Malformed(format!("row {} out of range (sheet has {} rows)", update.row, row_count))
    })?;
    if row.len() < update.column {
        row.resize(update.column, String::new());
    }
    row[update.column - 1] = update.value.clone();
    Ok(())
}

//
// In-memory Store
//

/// Row store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    workbook: Workbook,
}

impl MemoryStore {
    pub fn new(workbook: Workbook) -> Self {
        MemoryStore { workbook }
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }
}

impl RowStore for MemoryStore {
    fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.workbook.sheet(sheet).cloned()
    }

    fn append_row(&mut self, sheet: &str, row: Vec<String>) -> Result<(), StoreError> {
        self.workbook.sheet_mut(sheet)?.push(row);
        Ok(())
    }

    fn update_cell(&mut self, sheet: &str, update: CellUpdate) -> Result<(), StoreError> {
        set_cell(self.workbook.sheet_mut(sheet)?, &update)
    }

    fn batch_update(&mut self, sheet: &str, updates: &[CellUpdate]) -> Result<(), StoreError> {
        let plan = WritePlan { updates: updates.to_vec(), appends: Vec::new() };
        self.apply(sheet, &plan)
    }

    fn apply(&mut self, sheet: &str, plan: &WritePlan) -> Result<(), StoreError> {
        // Work on a copy so a bad address leaves the store untouched
        let mut next = self.workbook.clone();
        next.apply_plan(sheet, plan)?;
        self.workbook = next;
        Ok(())
    }
}

//
// JSON Workbook File
//

/// Row store backed by a JSON workbook file.
///
/// Every write takes an exclusive lock on a sidecar `.lock` file, re-reads
/// the workbook, applies the change and replaces the file atomically.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open an existing workbook file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::Unreachable(format!("workbook {} does not exist", path.display())));
        }
        Ok(JsonFileStore { path: path.to_path_buf() })
    }

    /// Create a workbook file holding `initial` unless the file already exists
    pub fn create_with(path: &Path, initial: &Workbook) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let store = JsonFileStore { path: path.to_path_buf() };
        if !path.exists() {
            debug!("creating workbook at {:?}", path);
            store.write_workbook(initial)?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents of the workbook file
    pub fn snapshot(&self) -> Result<Workbook, StoreError> {
        self.read_workbook()
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn read_workbook(&self) -> Result<Workbook, StoreError> {
        let file = File::open(&self.path)
            .map_err(|e| StoreError::Unreachable(format!("cannot open {}: {}", self.path.display(), e)))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::Malformed(format!("{}: {}", self.path.display(), e)))
    }

    fn write_workbook(&self, workbook: &Workbook) -> Result<(), StoreError> {
        // Write atomically: write to temp file in the same directory, then rename
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, workbook)
            .map_err(|e| StoreError::Malformed(format!("cannot serialize workbook: {}", e)))?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Run a read-modify-write cycle under the workbook lock
    fn modify<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Workbook) -> Result<(), StoreError>,
    {
        let lock_file = OpenOptions::new().create(true).truncate(false).write(true).open(self.lock_path())?;
        lock_file.lock_exclusive()?;

        let mut workbook = self.read_workbook()?;
        change(&mut workbook)?;
        self.write_workbook(&workbook)?;

        // Unlock is automatic when the lock file goes out of scope
        Ok(())
    }
}

impl RowStore for JsonFileStore {
    fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.read_workbook()?.sheet(sheet).cloned()
    }

    fn append_row(&mut self, sheet: &str, row: Vec<String>) -> Result<(), StoreError> {
        self.modify(|wb| {
            wb.sheet_mut(sheet)?.push(row);
            Ok(())
        })
    }

    fn update_cell(&mut self, sheet: &str, update: CellUpdate) -> Result<(), StoreError> {
        self.modify(|wb| set_cell(wb.sheet_mut(sheet)?, &update))
    }

    fn batch_update(&mut self, sheet: &str, updates: &[CellUpdate]) -> Result<(), StoreError> {
        let plan = WritePlan { updates: updates.to_vec(), appends: Vec::new() };
        self.apply(sheet, &plan)
    }

    fn apply(&mut self, sheet: &str, plan: &WritePlan) -> Result<(), StoreError> {
        debug!("applying {} updates and {} appends to {}:{}", plan.updates.len(), plan.appends.len(), self.path.display(), sheet);
        self.modify(|wb| wb.apply_plan(sheet, plan))
    }
}
