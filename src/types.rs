/// Core data structures for the repair worklist
///
/// This module defines the records the rest of ticket-board passes around:
/// tickets as stored in the ticket sheet, store profiles from the profile
/// sheet, and the fixed column order shared by the sheet and the rendered table.

/// Number of columns shown in the rendered table
pub const DISPLAY_COLUMNS: usize = 7;

/// Number of columns in a ticket sheet row (display columns + completion fields)
pub const TICKET_COLUMNS: usize = 9;

/// Ordinal given to a freshly appended ticket until resequencing runs.
/// Larger than any real ordinal so the new row sorts last.
pub const PENDING_ORDINAL: u32 = 9999;

/// Header labels, in display column order
pub const HEADER_LABELS: [&str; DISPLAY_COLUMNS] = ["排序", "日期", "店別", "型號", "電話", "地址", "問題與故障描述"];

/// Issue text used when a report carries no description
pub const DEFAULT_ISSUE_TEXT: &str = "未提供問題描述";

/// Column positions in the ticket sheet (1-based, fixed contract with the store)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketColumn {
    Ordinal = 1,
    ReportedDate = 2,
    Store = 3,
    Model = 4,
    Phone = 5,
    Address = 6,
    IssueText = 7,
    CompletedDate = 8,
    CompletionNote = 9,
}

impl TicketColumn {
    /// 1-based column number in the sheet
    pub fn number(self) -> usize {
        self as usize
    }

    /// 0-based index into a row vector
    pub fn index(self) -> usize {
        self as usize - 1
    }
}

/// One repair record
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Ticket {
    /// Present while the ticket is open
    pub ordinal: Option<u32>,
    pub reported_date: String,
    pub store: String,
    pub model: String,
    pub phone: String,
    pub address: String,
    pub issue_text: String,
    pub completed_date: Option<String>,
    pub completion_note: Option<String>,
}

impl Ticket {
    /// Build a new open ticket from a profile snapshot
    pub fn from_profile(profile: &StoreProfile, reported_date: &str, issue_text: &str) -> Self {
        let issue = issue_text.trim();
        Ticket {
            ordinal: Some(PENDING_ORDINAL),
            reported_date: reported_date.to_string(),
            store: profile.store.clone(),
            model: profile.model.clone(),
            phone: profile.phone.clone(),
            address: profile.address.clone(),
            issue_text: if issue.is_empty() { DEFAULT_ISSUE_TEXT.to_string() } else { issue.to_string() },
            completed_date: None,
            completion_note: None,
        }
    }

    /// Check if the ticket is open (has an ordinal)
    pub fn is_open(&self) -> bool {
        self.ordinal.is_some()
    }

    /// Parse a ticket from a sheet row. Short rows are padded, extra cells ignored.
    pub fn from_row(row: &[String]) -> Self {
        let cell = |col: TicketColumn| row.get(col.index()).map(|s| s.trim().to_string()).unwrap_or_default();
        let optional = |col: TicketColumn| {
            let value = cell(col);
            if is_blank_cell(&value) { None } else { Some(value) }
        };

        Ticket {
            ordinal: parse_ordinal(&cell(TicketColumn::Ordinal)),
            reported_date: cell(TicketColumn::ReportedDate),
            store: cell(TicketColumn::Store),
            model: cell(TicketColumn::Model),
            phone: cell(TicketColumn::Phone),
            address: cell(TicketColumn::Address),
            issue_text: cell(TicketColumn::IssueText),
            completed_date: optional(TicketColumn::CompletedDate),
            completion_note: optional(TicketColumn::CompletionNote),
        }
    }

    /// Serialize into a full sheet row in column order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.ordinal.map(|n| n.to_string()).unwrap_or_default(),
            self.reported_date.clone(),
            self.store.clone(),
            self.model.clone(),
            self.phone.clone(),
            self.address.clone(),
            self.issue_text.clone(),
            self.completed_date.clone().unwrap_or_default(),
            self.completion_note.clone().unwrap_or_default(),
        ]
    }

    /// The display cells, in table column order
    pub fn display_cells(&self) -> Vec<String> {
        let mut row = self.to_row();
        row.truncate(DISPLAY_COLUMNS);
        row
    }
}

/// A ticket together with its 1-based row number in the ticket sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTicket {
    pub row: usize,
    pub ticket: Ticket,
}

/// Static reference data for one store
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoreProfile {
    pub store: String,
    pub model: String,
    pub phone: String,
    pub address: String,
}

impl StoreProfile {
    /// Parse a profile sheet row: [store, model, phone, address]
    pub fn from_row(row: &[String]) -> Option<Self> {
        let cell = |i: usize| row.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
        let store = cell(0);
        if is_blank_cell(&store) {
            return None;
        }
        Some(StoreProfile { store, model: cell(1), phone: cell(2), address: cell(3) })
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![self.store.clone(), self.model.clone(), self.phone.clone(), self.address.clone()]
    }
}

/// Parse `store,model,phone,address` lines.
///
/// Blank lines and `#` comments are skipped. The address is everything after
/// the third comma, so it may itself contain commas.
pub fn parse_profile_lines(text: &str) -> Result<Vec<StoreProfile>, String> {
    let mut profiles = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<String> = line.splitn(4, ',').map(|f| f.trim().to_string()).collect();
        if fields.len() < 4 {
            return Err(format!("line {}: expected store,model,phone,address but got {:?}", i + 1, line));
        }
        match StoreProfile::from_row(&fields) {
            Some(profile) => profiles.push(profile),
            None => return Err(format!("line {}: store name is empty", i + 1)),
        }
    }

    Ok(profiles)
}

/// Header row of the ticket sheet
pub fn ticket_sheet_header() -> Vec<String> {
    let mut header = Vec::with_capacity(TICKET_COLUMNS);
    header.extend(HEADER_LABELS.iter().map(|s| s.to_string()));
    header.push("完修日期".to_string());
    header.push("完修說明".to_string());
    header
}

/// Header row of the profile sheet
pub fn profile_sheet_header() -> Vec<String> {
    ["店別", "型號", "電話", "地址"].iter().map(|s| s.to_string()).collect()
}

/// A cell counts as blank when empty after trimming or the literal "nan"
pub fn is_blank_cell(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Parse an ordinal cell.
///
/// Blank cells are closed tickets. Numeric values with spurious fractions
/// ("3.0") are accepted. Anything else non-blank still marks the ticket
/// open, with the pending ordinal, so the next resequencing repairs it.
pub fn parse_ordinal(value: &str) -> Option<u32> {
    if is_blank_cell(value) {
        return None;
    }
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 1.0 => Some(n.trunc() as u32),
        _ => {
            log::warn!("unparsable ordinal {:?}, treating as pending", value);
            Some(PENDING_ORDINAL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_ordinal_blank_and_nan() {
        assert_eq!(parse_ordinal(""), None);
        assert_eq!(parse_ordinal("   "), None);
        assert_eq!(parse_ordinal("nan"), None);
        assert_eq!(parse_ordinal("NaN"), None);
    }

    #[test]
    fn test_parse_ordinal_fractional() {
        assert_eq!(parse_ordinal("1.0"), Some(1));
        assert_eq!(parse_ordinal(" 12 "), Some(12));
    }

    #[test]
    fn test_parse_ordinal_garbage_stays_open() {
        assert_eq!(parse_ordinal("x"), Some(PENDING_ORDINAL));
        assert_eq!(parse_ordinal("0"), Some(PENDING_ORDINAL));
    }

    #[test]
    fn test_ticket_from_short_row_is_padded() {
        let ticket = Ticket::from_row(&row(&["2", "2024/01/01", "StoreA"]));
        assert_eq!(ticket.ordinal, Some(2));
        assert_eq!(ticket.store, "StoreA");
        assert_eq!(ticket.model, "");
        assert_eq!(ticket.completed_date, None);
        assert!(ticket.is_open());
    }

    #[test]
    fn test_ticket_row_layout_matches_columns() {
        let profile = StoreProfile {
            store: "StoreA".to_string(),
            model: "M1".to_string(),
            phone: "111".to_string(),
            address: "AddrA".to_string(),
        };
        let ticket = Ticket::from_profile(&profile, "2024/01/01", "Leak");
        let cells = ticket.to_row();
        assert_eq!(cells.len(), TICKET_COLUMNS);
        assert_eq!(cells[TicketColumn::Ordinal.index()], PENDING_ORDINAL.to_string());
        assert_eq!(cells[TicketColumn::Store.index()], "StoreA");
        assert_eq!(cells[TicketColumn::IssueText.index()], "Leak");
        assert_eq!(ticket.display_cells().len(), DISPLAY_COLUMNS);
    }

    #[test]
    fn test_missing_issue_gets_placeholder() {
        let profile = StoreProfile::from_row(&row(&["StoreB", "M2", "222", "AddrB"])).unwrap();
        let ticket = Ticket::from_profile(&profile, "2024/01/02", "  ");
        assert_eq!(ticket.issue_text, DEFAULT_ISSUE_TEXT);
    }

    #[test]
    fn test_profile_row_requires_store() {
        assert!(StoreProfile::from_row(&row(&["", "M", "1", "A"])).is_none());
        assert!(StoreProfile::from_row(&row(&[])).is_none());
    }

    #[test]
    fn test_parse_profile_lines() {
        let text = "# store,model,phone,address\n\nStoreA, M1, 02-1234, 台北市, 信義區\nStoreB,M2,222,AddrB\n";
        let profiles = parse_profile_lines(text).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].store, "StoreA");
        assert_eq!(profiles[0].phone, "02-1234");
        assert_eq!(profiles[0].address, "台北市, 信義區");
        assert_eq!(profiles[1].to_row(), row(&["StoreB", "M2", "222", "AddrB"]));
    }

    #[test]
    fn test_parse_profile_lines_rejects_short_lines() {
        let err = parse_profile_lines("StoreA,M1,111,AddrA\nStoreB,M2\n").unwrap_err();
        assert!(err.starts_with("line 2"), "unexpected error: {}", err);
        assert!(parse_profile_lines(" ,M1,111,AddrA").is_err());
    }

    #[test]
    fn test_sheet_header_width() {
        assert_eq!(ticket_sheet_header().len(), TICKET_COLUMNS);
        assert_eq!(TicketColumn::CompletionNote.number(), TICKET_COLUMNS);
    }
}
