/// Tests for the reconciliation module
///
/// These run the ticket lifecycle against an in-memory row store and check
/// the open-ticket invariants after every step.

#[cfg(test)]
mod tests {
    use crate::reconcile::*;
    use crate::store::{MemoryStore, PROFILE_SHEET, RowStore, StoreError, TICKET_SHEET, Workbook};
    use crate::types::{DEFAULT_ISSUE_TEXT, StoreProfile};

    const TODAY: &str = "2024/01/05";

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn profile_rows(stores: &[&str]) -> Vec<Vec<String>> {
        stores
            .iter()
            .enumerate()
            .map(|(i, s)| StoreProfile {
                store: s.to_string(),
                model: format!("M{}", i + 1),
                phone: format!("0{}", 100 + i),
                address: format!("Addr{}", s),
            })
            .map(|p| p.to_row())
            .collect()
    }

    /// Workbook with profiles for the given stores and the given ticket rows
    fn workbook(stores: &[&str], tickets: &[Vec<String>]) -> Workbook {
        let mut wb = Workbook::with_named_headers(TICKET_SHEET, PROFILE_SHEET);
        wb.sheets.get_mut(PROFILE_SHEET).unwrap().extend(profile_rows(stores));
        wb.sheets.get_mut(TICKET_SHEET).unwrap().extend(tickets.iter().cloned());
        wb
    }

    fn reconciler(wb: Workbook) -> Reconciler<SheetRepository<MemoryStore>> {
        Reconciler::new(SheetRepository::with_sheets(MemoryStore::new(wb), TICKET_SHEET, PROFILE_SHEET))
    }

    fn open_ordinals(r: &Reconciler<SheetRepository<MemoryStore>>) -> Vec<u32> {
        r.open_tickets().unwrap().iter().map(|t| t.ordinal.unwrap()).collect()
    }

    fn open_stores(r: &Reconciler<SheetRepository<MemoryStore>>) -> Vec<String> {
        r.open_tickets().unwrap().into_iter().map(|t| t.store).collect()
    }

    fn ticket_rows(r: &Reconciler<SheetRepository<MemoryStore>>) -> Vec<Vec<String>> {
        r.repository().store().read_rows(TICKET_SHEET).unwrap()
    }

    fn assert_dense(r: &Reconciler<SheetRepository<MemoryStore>>) {
        let ordinals = open_ordinals(r);
        let expected: Vec<u32> = (1..=ordinals.len() as u32).collect();
        assert_eq!(ordinals, expected);
    }

    #[test]
    fn test_report_creates_ticket_from_profile() {
        let mut r = reconciler(workbook(&["StoreA"], &[]));

        let outcome = r.report("StoreA", "Leak", TODAY).unwrap();
        assert_eq!(outcome, ReportOutcome::Created { ordinal: 1 });

        let open = r.open_tickets().unwrap();
        assert_eq!(open.len(), 1);
        let ticket = &open[0];
        assert_eq!(ticket.reported_date, TODAY);
        assert_eq!(ticket.model, "M1");
        assert_eq!(ticket.phone, "0100");
        assert_eq!(ticket.address, "AddrStoreA");
        assert_eq!(ticket.issue_text, "Leak");
    }

    #[test]
    fn test_report_without_issue_uses_placeholder() {
        let mut r = reconciler(workbook(&["StoreA"], &[]));
        r.report("StoreA", "", TODAY).unwrap();
        assert_eq!(r.open_tickets().unwrap()[0].issue_text, DEFAULT_ISSUE_TEXT);
    }

    #[test]
    fn test_report_unknown_store_is_noop() {
        let mut r = reconciler(workbook(&["StoreA"], &[]));
        assert_eq!(r.report("StoreZ", "Leak", TODAY).unwrap(), ReportOutcome::UnknownStore);
        assert_eq!(ticket_rows(&r).len(), 1);
    }

    #[test]
    fn test_duplicate_report_is_suppressed() {
        let existing = cells(&["1", "2024/01/01", "StoreA", "M1", "111", "AddrA", "Leak"]);
        let mut r = reconciler(workbook(&["StoreA"], &[existing]));

        let outcome = r.report("StoreA", "Leak", TODAY).unwrap();
        assert_eq!(outcome, ReportOutcome::Duplicate { ordinal: 1 });
        assert_eq!(ticket_rows(&r).len(), 2);
        assert_eq!(open_stores(&r), vec!["StoreA"]);
    }

    #[test]
    fn test_report_twice_keeps_one_open_ticket() {
        let mut r = reconciler(workbook(&["StoreA"], &[]));
        r.report("StoreA", "Leak", TODAY).unwrap();
        r.report(" StoreA ", "Leak again", TODAY).unwrap();

        assert_eq!(open_stores(&r), vec!["StoreA"]);
    }

    #[test]
    fn test_complete_round_trip() {
        let mut r = reconciler(workbook(&["StoreA"], &[]));
        r.report("StoreA", "Leak", TODAY).unwrap();

        let note = "StoreA 完修 換了水管";
        let outcome = r.complete("StoreA", note, "2024/01/06").unwrap();
        assert_eq!(outcome, CompleteOutcome::Closed { row: 2 });
        assert!(r.open_tickets().unwrap().is_empty());

        let rows = ticket_rows(&r);
        assert_eq!(rows[1][0], "");
        assert_eq!(rows[1][7], "2024/01/06");
        assert_eq!(rows[1][8], note);

        // Closed ticket keeps its row; completing again changes nothing
        assert_eq!(r.complete("StoreA", "again", "2024/01/07").unwrap(), CompleteOutcome::AlreadyClosed);
        assert_eq!(ticket_rows(&r), rows);
    }

    #[test]
    fn test_complete_unknown_store_is_not_found() {
        let mut r = reconciler(workbook(&["StoreA"], &[]));
        assert_eq!(r.complete("StoreA", "x", TODAY).unwrap(), CompleteOutcome::NotFound);
        assert_eq!(r.take_highlight(), None);
    }

    #[test]
    fn test_complete_sets_highlight_once() {
        let mut r = reconciler(workbook(&["StoreA"], &[]));
        r.report("StoreA", "Leak", TODAY).unwrap();
        r.complete("StoreA", "done", TODAY).unwrap();

        assert_eq!(r.take_highlight().as_deref(), Some("StoreA"));
        assert_eq!(r.take_highlight(), None);
    }

    #[test]
    fn test_reopen_after_close_appends_new_row() {
        let mut r = reconciler(workbook(&["StoreA", "StoreB"], &[]));
        r.report("StoreA", "Leak", TODAY).unwrap();
        r.report("StoreB", "Noise", TODAY).unwrap();
        r.complete("StoreA", "done", TODAY).unwrap();

        assert_eq!(r.report("StoreA", "Leak again", TODAY).unwrap(), ReportOutcome::Created { ordinal: 2 });
        assert_eq!(open_stores(&r), vec!["StoreB", "StoreA"]);
        assert_eq!(ticket_rows(&r).len(), 4);
        assert_dense(&r);
    }

    #[test]
    fn test_resequence_compacts_gaps_in_row_order() {
        let rows = vec![
            cells(&["7", "d", "StoreA"]),
            cells(&["", "d", "StoreB"]),
            cells(&["3", "d", "StoreC"]),
            cells(&["3.0", "d", "StoreD"]),
        ];
        let mut r = reconciler(workbook(&[], &rows));

        // StoreD's "3.0" already reads as 3
        assert_eq!(r.resequence().unwrap(), 2);
        assert_eq!(open_stores(&r), vec!["StoreA", "StoreC", "StoreD"]);
        assert_dense(&r);
        // Already dense: nothing to write
        assert_eq!(r.resequence().unwrap(), 0);
    }

    #[test]
    fn test_ordinals_stay_dense_through_random_operations() {
        let stores = ["S1", "S2", "S3", "S4", "S5", "S6"];
        let mut r = reconciler(workbook(&stores, &[]));
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;

        for _ in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let store = stores[(seed >> 33) as usize % stores.len()];
            let before = open_stores(&r);

            if (seed >> 13) % 2 == 0 {
                r.report(store, "issue", TODAY).unwrap();
            } else {
                r.complete(store, "done", TODAY).unwrap();
            }

            assert_dense(&r);
            let after = open_stores(&r);
            // At most one open ticket per store
            let mut unique = after.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), after.len());
            // Survivors keep their relative order
            let survivors: Vec<&String> = before.iter().filter(|s| after.contains(s)).collect();
            let kept: Vec<&String> = after.iter().filter(|s| before.contains(s)).collect();
            assert_eq!(survivors, kept);
        }
    }

    #[test]
    fn test_upsert_profiles_adds_and_updates() {
        let mut repo = SheetRepository::with_sheets(MemoryStore::new(workbook(&["StoreA"], &[])), TICKET_SHEET, PROFILE_SHEET);
        let profiles = vec![
            StoreProfile { store: "StoreA".into(), model: "M9".into(), phone: "999".into(), address: "New".into() },
            StoreProfile { store: "StoreB".into(), model: "M2".into(), phone: "222".into(), address: "B".into() },
            StoreProfile { store: "StoreB".into(), model: "M3".into(), phone: "333".into(), address: "B2".into() },
        ];

        assert_eq!(repo.upsert_profiles(&profiles).unwrap(), (1, 1));

        let a = repo.find_profile("StoreA").unwrap().unwrap();
        assert_eq!((a.model.as_str(), a.address.as_str()), ("M9", "New"));
        let b = repo.find_profile("StoreB").unwrap().unwrap();
        assert_eq!(b.phone, "333");
        assert_eq!(repo.store().read_rows(PROFILE_SHEET).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_header_is_malformed() {
        let mut wb = workbook(&["StoreA"], &[]);
        wb.sheets.get_mut(TICKET_SHEET).unwrap().clear();
        let mut r = reconciler(wb);

        assert!(matches!(r.report("StoreA", "Leak", TODAY), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_missing_profile_sheet_is_malformed() {
        let mut wb = workbook(&[], &[]);
        wb.sheets.remove(PROFILE_SHEET);
        let mut r = reconciler(wb);

        assert!(matches!(r.report("StoreA", "Leak", TODAY), Err(StoreError::Malformed(_))));
        assert_eq!(ticket_rows(&r).len(), 1);
    }
}
