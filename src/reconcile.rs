/// Ticket reconciliation
///
/// This module handles:
/// - Reading tickets and profiles out of the row store
/// - Creating tickets on report, with duplicate suppression
/// - Closing tickets on completion
/// - Resequencing open ordinals to 1..N
///
/// Each mutation is committed together with its resequencing as one write
/// plan, so the store never holds a half-applied change.

use crate::store::{CellUpdate, RowStore, StoreError, WritePlan};
use crate::types::{PENDING_ORDINAL, StoreProfile, StoredTicket, Ticket, TicketColumn};
use log::{debug, info};

/// Narrow view of the ticket and profile sheets
pub trait TicketRepository {
    /// Every ticket row, top to bottom
    fn list_tickets(&self) -> Result<Vec<StoredTicket>, StoreError>;

    /// Open tickets only, top to bottom
    fn list_open_tickets(&self) -> Result<Vec<StoredTicket>, StoreError> {
        Ok(self.list_tickets()?.into_iter().filter(|t| t.ticket.is_open()).collect())
    }

    /// Profile for a store, if one exists
    fn find_profile(&self, store: &str) -> Result<Option<StoreProfile>, StoreError>;

    /// Append a ticket and resequence. Returns the ordinal the new ticket ended up with.
    fn append_ticket(&mut self, ticket: Ticket) -> Result<u32, StoreError>;

    /// Close the ticket at `row` and resequence the remaining open tickets
    fn close_ticket(&mut self, row: usize, completed_date: &str, note: &str) -> Result<(), StoreError>;

    /// Compact open ordinals to 1..N. Returns how many tickets were renumbered.
    fn resequence(&mut self) -> Result<usize, StoreError>;
}

/// Assign 1..N to open tickets in row order, returning the cell writes needed
pub fn resequence_updates(tickets: &mut [StoredTicket]) -> Vec<CellUpdate> {
    let mut updates = Vec::new();
    let mut next = 1u32;

    for stored in tickets.iter_mut().filter(|t| t.ticket.is_open()) {
        if stored.ticket.ordinal != Some(next) {
            stored.ticket.ordinal = Some(next);
            updates.push(CellUpdate { row: stored.row, column: TicketColumn::Ordinal.number(), value: next.to_string() });
        }
        next += 1;
    }

    updates
}

/// `TicketRepository` over any `RowStore`
pub struct SheetRepository<S: RowStore> {
    store: S,
    ticket_sheet: String,
    profile_sheet: String,
}

impl<S: RowStore> SheetRepository<S> {
    pub fn with_sheets(store: S, ticket_sheet: &str, profile_sheet: &str) -> Self {
        SheetRepository { store, ticket_sheet: ticket_sheet.to_string(), profile_sheet: profile_sheet.to_string() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add new store profiles and overwrite existing ones, as one commit.
    /// Returns `(added, updated)`.
    pub fn upsert_profiles(&mut self, profiles: &[StoreProfile]) -> Result<(usize, usize), StoreError> {
        let rows = self.body_rows(&self.profile_sheet)?;
        let mut positions: Vec<(String, usize)> = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| StoreProfile::from_row(row).map(|p| (p.store, i + 2)))
            .collect();

        let mut plan = WritePlan::default();
        let mut next_row = rows.len() + 2;
        let mut updated = 0;

        for profile in profiles {
            let existing = positions.iter().find(|(store, _)| *store == profile.store).map(|(_, row)| *row);
            match existing {
                Some(row) if row < rows.len() + 2 => {
                    for (column, value) in profile.to_row().into_iter().enumerate().skip(1) {
                        plan.updates.push(CellUpdate { row, column: column + 1, value });
                    }
                    updated += 1;
                }
                Some(row) => {
                    // Repeated within this import; replace the pending append
                    plan.appends[row - rows.len() - 2] = profile.to_row();
                }
                None => {
                    plan.appends.push(profile.to_row());
                    positions.push((profile.store.clone(), next_row));
                    next_row += 1;
                }
            }
        }

        let added = plan.appends.len();
        if !plan.is_empty() {
            self.store.apply(&self.profile_sheet, &plan)?;
        }
        info!("imported profiles: {} added, {} updated", added, updated);
        Ok((added, updated))
    }

    /// Rows after the header; a sheet without a header row is malformed
    fn body_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let mut rows = self.store.read_rows(sheet)?;
        if rows.is_empty() {
            return Err(StoreError::Malformed(format!("sheet '{}' has no header row", sheet)));
        }
        rows.remove(0);
        Ok(rows)
    }
}

impl<S: RowStore> TicketRepository for SheetRepository<S> {
    fn list_tickets(&self) -> Result<Vec<StoredTicket>, StoreError> {
        let rows = self.body_rows(&self.ticket_sheet)?;
        // Row 1 is the header, so body row i lives at sheet row i + 2
        Ok(rows.iter().enumerate().map(|(i, row)| StoredTicket { row: i + 2, ticket: Ticket::from_row(row) }).collect())
    }

    fn find_profile(&self, store: &str) -> Result<Option<StoreProfile>, StoreError> {
        let store = store.trim();
        let rows = self.body_rows(&self.profile_sheet)?;
        Ok(rows.iter().filter_map(|row| StoreProfile::from_row(row)).find(|p| p.store == store))
    }

    fn append_ticket(&mut self, ticket: Ticket) -> Result<u32, StoreError> {
        let mut tickets = self.list_tickets()?;
        let new_row = tickets.len() + 2;
        tickets.push(StoredTicket { row: new_row, ticket: Ticket { ordinal: Some(PENDING_ORDINAL), ..ticket } });

        let updates = resequence_updates(&mut tickets);
        let appended = &tickets[tickets.len() - 1].ticket;
        let ordinal = appended.ordinal.unwrap_or(PENDING_ORDINAL);

        let plan = WritePlan {
            updates: updates.into_iter().filter(|u| u.row != new_row).collect(),
            appends: vec![appended.to_row()],
        };
        debug!("appending ticket for {} at row {} with ordinal {}", appended.store, new_row, ordinal);
        self.store.apply(&self.ticket_sheet, &plan)?;

        Ok(ordinal)
    }

    fn close_ticket(&mut self, row: usize, completed_date: &str, note: &str) -> Result<(), StoreError> {
        let mut tickets = self.list_tickets()?;
        let target = tickets
            .iter_mut()
            .find(|t| t.row == row)
            .ok_or_else(|| StoreError::Malformed(format!("ticket row {} no longer exists", row)))?;
        target.ticket.ordinal = None;

        let mut updates = vec![
            CellUpdate { row, column: TicketColumn::Ordinal.number(), value: String::new() },
            CellUpdate { row, column: TicketColumn::CompletedDate.number(), value: completed_date.to_string() },
            CellUpdate { row, column: TicketColumn::CompletionNote.number(), value: note.to_string() },
        ];
        updates.extend(resequence_updates(&mut tickets));

        debug!("closing ticket row {} ({} cell writes)", row, updates.len());
        self.store.apply(&self.ticket_sheet, &WritePlan { updates, appends: Vec::new() })
    }

    fn resequence(&mut self) -> Result<usize, StoreError> {
        let mut tickets = self.list_tickets()?;
        let updates = resequence_updates(&mut tickets);
        if !updates.is_empty() {
            self.store.batch_update(&self.ticket_sheet, &updates)?;
        }
        Ok(updates.len())
    }
}

//
// Lifecycle
//

/// Result of a report command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// A new ticket was opened
    Created { ordinal: u32 },
    /// The store already has an open ticket
    Duplicate { ordinal: u32 },
    /// No profile for the store; nothing was written
    UnknownStore,
}

/// Result of a complete command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The open ticket at this sheet row was closed
    Closed { row: usize },
    /// The store's ticket is already closed
    AlreadyClosed,
    /// The store has never had a ticket
    NotFound,
}

/// Ticket lifecycle over a repository.
///
/// Per store: absent -> open on report, open -> closed on complete.
pub struct Reconciler<R: TicketRepository> {
    repository: R,
    highlight: Option<String>,
}

impl<R: TicketRepository> Reconciler<R> {
    pub fn new(repository: R) -> Self {
        Reconciler { repository, highlight: None }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Open a ticket for `store` unless one is already open or the store is unknown
    pub fn report(&mut self, store: &str, issue: &str, today: &str) -> Result<ReportOutcome, StoreError> {
        let store = store.trim();

        let open = self.repository.list_open_tickets()?;
        if let Some(existing) = open.iter().find(|t| t.ticket.store == store) {
            info!("{} already has an open ticket at row {}, ignoring report", store, existing.row);
            return Ok(ReportOutcome::Duplicate { ordinal: existing.ticket.ordinal.unwrap_or(PENDING_ORDINAL) });
        }

        let Some(profile) = self.repository.find_profile(store)? else {
            info!("no profile for store {}, ignoring report", store);
            return Ok(ReportOutcome::UnknownStore);
        };

        let ticket = Ticket::from_profile(&profile, today, issue);
        let ordinal = self.repository.append_ticket(ticket)?;
        info!("opened ticket #{} for {}", ordinal, store);
        Ok(ReportOutcome::Created { ordinal })
    }

    /// Close the open ticket for `store`, recording the full command text as the note
    pub fn complete(&mut self, store: &str, note: &str, today: &str) -> Result<CompleteOutcome, StoreError> {
        let store = store.trim();
        let tickets = self.repository.list_tickets()?;

        if let Some(open) = tickets.iter().find(|t| t.ticket.store == store && t.ticket.is_open()) {
            self.repository.close_ticket(open.row, today, note)?;
            info!("closed ticket for {} at row {}", store, open.row);
            self.highlight = Some(store.to_string());
            return Ok(CompleteOutcome::Closed { row: open.row });
        }

        if tickets.iter().any(|t| t.ticket.store == store) {
            info!("ticket for {} is already closed", store);
            Ok(CompleteOutcome::AlreadyClosed)
        } else {
            info!("no ticket found for {}", store);
            Ok(CompleteOutcome::NotFound)
        }
    }

    /// Compact open ordinals without any other change
    pub fn resequence(&mut self) -> Result<usize, StoreError> {
        self.repository.resequence()
    }

    /// Current open tickets in display order, read fresh from the store
    pub fn open_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        Ok(self.repository.list_open_tickets()?.into_iter().map(|t| t.ticket).collect())
    }

    /// Store to highlight in the next render; cleared once taken
    pub fn take_highlight(&mut self) -> Option<String> {
        self.highlight.take()
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod reconcile_test;
