//! Reconciliation and classification against an on-disk database.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::tempdir;

use stocktally_config::SalesSchema;
use stocktally_core::{Dataset, Value};
use stocktally_io::{SalesQuery, SpreadsheetSource, SqliteStore};
use stocktally_recon::memory::MemorySource;
use stocktally_recon::{
    classify_from_source, import_batch, reconcile, FailureKind, TableLocks, TableOutcome, TableStore, Tier,
    TierThresholds,
};

fn products(rows: &[(i64, &str)]) -> Dataset {
    Dataset::from_rows(
        ["product_code", "product_name"],
        rows.iter().map(|(c, n)| vec![Value::Int(*c), Value::from(*n)]).collect(),
    )
    .unwrap()
}

fn seeded(path: &Path, rows: &[(i64, &str)]) -> SqliteStore {
    let mut store = SqliteStore::open(path).unwrap();
    store.create_table("Products", &products(rows)).unwrap();
    store.append_records("Products", &products(rows)).unwrap();
    store
}

#[test]
fn reconcile_converges_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("inventory.db");
    let mut store = seeded(&db, &[(1, "Bolt"), (2, "Nut"), (2, "Nut")]);

    let snapshot = products(&[(2, "Nut"), (3, "Screw")]);
    let first = reconcile(&mut store, "Products", &snapshot).unwrap();
    assert_eq!(first.duplicates_removed, 1);
    assert_eq!(first.records_added, 1);
    assert_eq!(first.records_deleted, 1);

    drop(store);
    let mut reopened = SqliteStore::open(&db).unwrap();
    assert_eq!(reopened.read_table("Products").unwrap(), snapshot);

    let second = reconcile(&mut reopened, "Products", &snapshot).unwrap();
    assert!(second.is_noop());
    assert_eq!(reopened.read_table("Products").unwrap(), snapshot);
}

#[test]
fn float_keys_from_spreadsheets_match_stored_integers() {
    let dir = tempdir().unwrap();
    let mut store = seeded(&dir.path().join("inventory.db"), &[(3, "Screw")]);

    let snapshot = Dataset::from_rows(
        ["product_code", "product_name"],
        vec![vec![Value::Float(3.0), "Screw".into()]],
    )
    .unwrap();
    let report = reconcile(&mut store, "Products", &snapshot).unwrap();
    assert!(report.is_noop());
}

fn write_products_xlsx(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "product_code").unwrap();
    sheet.write_string(0, 1, "product_name").unwrap();
    sheet.write_string(0, 2, "added").unwrap();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let added = ExcelDateTime::from_ymd(2024, 2, 1).unwrap();
    for (i, (code, name)) in [(2.0, "Nut"), (3.0, "Screw")].iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, *code).unwrap();
        sheet.write_string(row, 1, *name).unwrap();
        sheet.write_datetime_with_format(row, 2, &added, &date_format).unwrap();
    }
    workbook.save(path).unwrap();
}

#[test]
fn batch_from_export_files() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    write_products_xlsx(&data.join("products.xlsx"));
    fs::write(data.join("suppliers.csv"), "supplier_id;name\n10;Acme\n").unwrap();

    let mut store = SqliteStore::open(&dir.path().join("inventory.db")).unwrap();
    let seed = Dataset::from_rows(
        ["product_code", "product_name", "added"],
        vec![vec![Value::Int(1), "Bolt".into(), Value::Null]],
    )
    .unwrap();
    store.create_table("Products", &seed).unwrap();
    store.append_records("Products", &seed).unwrap();
    store
        .create_table("Suppliers", &Dataset::from_rows(["supplier_id", "name"], vec![]).unwrap())
        .unwrap();

    let source = SpreadsheetSource::new(&data)
        .with_table("Suppliers", "suppliers.csv")
        .with_table("Products", "products.xlsx")
        .with_table("Orders", "orders.xlsx");
    let report = import_batch(&mut store, &source, ["Suppliers", "Products", "Orders"], &TableLocks::new());

    assert_eq!(report.outcomes.len(), 3);
    let TableOutcome::Reconciled(suppliers) = &report.outcomes[0] else {
        panic!("suppliers failed: {:?}", report.outcomes[0]);
    };
    assert_eq!(suppliers.records_added, 1);
    let TableOutcome::Reconciled(products) = &report.outcomes[1] else {
        panic!("products failed: {:?}", report.outcomes[1]);
    };
    assert_eq!((products.records_added, products.records_deleted), (2, 1));
    match &report.outcomes[2] {
        TableOutcome::Failed(f) => assert_eq!(f.kind, FailureKind::MissingTable),
        other => panic!("expected failure, got {other:?}"),
    }

    let stored = store.read_table("Products").unwrap();
    assert_eq!(stored.rows()[0][2], Value::from("2024-02-01"));
}

#[test]
fn classify_over_polish_schema() {
    let dir = tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("db_zapasy.db"))
        .unwrap()
        .with_sales_query(SalesQuery::new(&SalesSchema::polish()));
    store
        .connection()
        .execute_batch(
            r#"
            CREATE TABLE Produkty (kod_produktu INTEGER, nazwa_produktu TEXT);
            CREATE TABLE Zamowienia (id_zamowienia INTEGER, data_zamowienia TEXT);
            CREATE TABLE ZamowieniaSzczegoly (id_zamowienia INTEGER, kod_produktu INTEGER, ilosc INTEGER);
            INSERT INTO Produkty VALUES (1, 'Śruba'), (2, 'Nakrętka'), (3, 'Podkładka');
            INSERT INTO Zamowienia VALUES (100, '2024-01-05 00:00:00'), (101, '2024-03-10 00:00:00');
            INSERT INTO ZamowieniaSzczegoly VALUES (100, 1, 60), (100, 2, 30), (100, 3, 10), (101, 1, 500);
            "#,
        )
        .unwrap();

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let out = classify_from_source(&store, start, end, &TierThresholds::default()).unwrap();

    let names: Vec<&str> = out.iter().map(|r| r.product_name.as_str()).collect();
    assert_eq!(names, ["Śruba", "Nakrętka", "Podkładka"]);
    let cumulative: Vec<f64> = out.iter().map(|r| r.cumulative).collect();
    assert_eq!(cumulative, [60.0, 90.0, 100.0]);
    assert!(out.iter().all(|r| r.tier == Tier::C));
}

// -------------------------------------------------------------------------
// Key identity through the store
// -------------------------------------------------------------------------

fn keyed(rows: Vec<Vec<Value>>) -> Dataset {
    Dataset::from_rows(["id", "name"], rows).unwrap()
}

/// Table `T` typed from every value it will ever hold, seeded with `persisted`.
fn sqlite_table(persisted: &Dataset, snapshot: &Dataset) -> SqliteStore {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let mut sample = persisted.rows().to_vec();
    sample.extend(snapshot.rows().iter().cloned());
    store.create_table("T", &keyed(sample)).unwrap();
    store.append_records("T", persisted).unwrap();
    store
}

#[test]
fn stale_null_key_is_deleted() {
    let dir = tempdir().unwrap();
    let mut store = seeded(&dir.path().join("inventory.db"), &[(1, "Bolt")]);
    let blank = Dataset::from_rows(
        ["product_code", "product_name"],
        vec![vec![Value::Null, "blank id".into()]],
    )
    .unwrap();
    store.append_records("Products", &blank).unwrap();

    let snapshot = products(&[(1, "Bolt")]);
    let first = reconcile(&mut store, "Products", &snapshot).unwrap();
    assert_eq!(first.records_deleted, 1);
    let second = reconcile(&mut store, "Products", &snapshot).unwrap();
    assert!(second.is_noop());
    assert_eq!(store.read_table("Products").unwrap(), snapshot);
}

#[test]
fn date_keyed_table_is_stable() {
    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let snapshot = Dataset::from_rows(["day", "qty"], vec![vec![Value::Date(day), Value::Int(5)]]).unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.create_table("Stock", &snapshot).unwrap();

    let first = reconcile(&mut store, "Stock", &snapshot).unwrap();
    assert_eq!((first.records_added, first.records_deleted), (1, 0));
    let second = reconcile(&mut store, "Stock", &snapshot).unwrap();
    assert_eq!((second.records_added, second.records_deleted), (0, 0));
    assert_eq!(store.row_count("Stock").unwrap(), 1);
}

#[test]
fn bool_keyed_table_is_stable() {
    let snapshot = keyed(vec![vec![Value::Bool(true), "yes".into()], vec![Value::Bool(false), "no".into()]]);
    let mut store = sqlite_table(&keyed(vec![]), &snapshot);

    reconcile(&mut store, "T", &snapshot).unwrap();
    let again = reconcile(&mut store, "T", &snapshot).unwrap();
    assert!(again.is_noop());
    assert_eq!(store.row_count("T").unwrap(), 2);
}

fn key_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        (0i64..6).prop_map(Value::Int),
        prop::sample::select(vec![0.5, 2.5, 3.0]).prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        (1u32..4).prop_map(|d| Value::Date(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())),
        prop::sample::select(vec!["3", "03", "2024-01-02", "P-1", "x"]).prop_map(Value::from),
    ]
}

fn keyed_rows(min: usize) -> impl Strategy<Value = Dataset> {
    prop::collection::vec((key_value(), "[a-z]{1,4}"), min..20)
        .prop_map(|rows| keyed(rows.into_iter().map(|(k, n)| vec![k, Value::from(n)]).collect()))
}

proptest! {
    #[test]
    fn sqlite_converges_to_snapshot_key_set(persisted in keyed_rows(0), snapshot in keyed_rows(1)) {
        let mut store = sqlite_table(&persisted, &snapshot);

        reconcile(&mut store, "T", &snapshot).unwrap();

        let table = store.read_table("T").unwrap();
        prop_assert_eq!(table.key_set(), snapshot.key_set());
        prop_assert_eq!(table.len(), table.key_set().len(), "table must be key-unique");
    }

    #[test]
    fn sqlite_second_pass_changes_nothing(persisted in keyed_rows(0), snapshot in keyed_rows(1)) {
        let mut store = sqlite_table(&persisted, &snapshot);

        reconcile(&mut store, "T", &snapshot).unwrap();
        let before = store.read_table("T").unwrap();
        let second = reconcile(&mut store, "T", &snapshot).unwrap();

        prop_assert!(second.is_noop(), "second pass: {:?}", second);
        prop_assert_eq!(store.read_table("T").unwrap(), before);
    }

    #[test]
    fn sqlite_counts_match_key_arithmetic(persisted in keyed_rows(0), snapshot in keyed_rows(1)) {
        let pk = persisted.key_set();
        let sk = snapshot.key_set();
        let mut store = sqlite_table(&persisted, &snapshot);

        let report = reconcile(&mut store, "T", &snapshot).unwrap();

        prop_assert_eq!(report.duplicates_removed, persisted.len() - pk.len());
        prop_assert_eq!(report.records_added, sk.difference(&pk).count());
        prop_assert_eq!(report.records_deleted, pk.difference(&sk).count());
    }
}

// -------------------------------------------------------------------------
// Table locks across connections
// -------------------------------------------------------------------------

#[test]
fn table_lock_holds_back_a_second_connection() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("inventory.db");
    drop(seeded(&db, &[(1, "Bolt")]));

    let locks = Arc::new(TableLocks::new());
    let guard = locks.lock("Products");

    let worker = {
        let locks = Arc::clone(&locks);
        let db = db.clone();
        std::thread::spawn(move || {
            let mut store = SqliteStore::open(&db).unwrap();
            let source = MemorySource::new().with_snapshot("Products", products(&[(2, "Nut")]));
            import_batch(&mut store, &source, ["Products"], &locks)
        })
    };

    std::thread::sleep(Duration::from_millis(100));
    let observer = SqliteStore::open(&db).unwrap();
    assert_eq!(observer.read_table("Products").unwrap(), products(&[(1, "Bolt")]));

    drop(guard);
    let report = worker.join().unwrap();
    assert!(report.is_clean());
    assert_eq!(observer.read_table("Products").unwrap(), products(&[(2, "Nut")]));
}
