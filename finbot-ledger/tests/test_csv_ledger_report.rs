use chrono::{Duration, NaiveDate, TimeZone, Utc};
use finbot_core::{
    CategoryTable, Direction, ReportPeriod, balance, build_report, classify_at, monthly_summary,
    search,
};
use finbot_ledger::{CsvLedger, Ledger};
use std::fs;

const JAKARTA: chrono_tz::Tz = chrono_tz::Asia::Jakarta;

/// Messages a user might send over a few days, classified and written to a
/// CSV ledger, then read back into the monthly report.
#[tokio::test]
async fn test_messages_to_monthly_report() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = CsvLedger::new(dir.path().join("ledger.csv"), JAKARTA);
    let table = CategoryTable::default();
    ledger.prepare(&table).await.unwrap();

    let start = Utc.with_ymd_and_hms(2026, 10, 1, 2, 0, 0).unwrap();
    let messages = [
        "Gaji november 8500000",
        "Beli groceries 150.000",
        "isi bensin 50rb",
        "bayar internet Rp 350.000",
        "nonton movie 75k",
    ];
    for (day, text) in messages.iter().enumerate() {
        let now = start + Duration::days(day as i64);
        let txn = classify_at(text, &table, now).unwrap();
        ledger.append(42, &txn).await.unwrap();
    }
    // someone else's row must not leak into user 42's report
    let other = classify_at("makan 999999", &table, start).unwrap();
    ledger.append(7, &other).await.unwrap();

    let entries = ledger.entries(42).await.unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0].direction, Direction::Income);

    let expected_balance = 8_500_000.0 - 150_000.0 - 50_000.0 - 350_000.0 - 75_000.0;
    assert_eq!(entries.last().unwrap().balance, Some(expected_balance));
    assert_eq!(balance(&entries), expected_balance);

    let today = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
    let report = build_report(&entries, ReportPeriod::Monthly.window(today));
    assert_eq!(report.total_income, 8_500_000.0);
    assert_eq!(report.total_expense, 625_000.0);
    let top: Vec<&str> = report.top_expenses.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(top, vec!["Tagihan", "Makanan", "Hiburan", "Transport"]);

    let summary = monthly_summary(&entries, 2026, 10);
    assert_eq!(summary.net, expected_balance);

    let hits = search(&entries, "bensin");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].category, "Transport");
}

/// Hand-edited ledgers: blank lines, short rows and junk rows are skipped
/// or tolerated instead of failing the whole read.
#[tokio::test]
async fn test_tolerates_hand_edited_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.csv");
    fs::write(
        &path,
        "Tanggal,Waktu,Kategori,Deskripsi,Pemasukan,Pengeluaran,Saldo,User ID\n\
         2026-10-01,,Gaji,gaji,1000000,,,42\n\
         ,,,,,,,\n\
         not a date,,x,x,1,,,42\n\
         2026-10-02,08:00:00,Makanan,makan siang,,25000,975000,42\n\
         2026-10-03,09:00:00,Makanan,kopi,,5000\n",
    )
    .unwrap();

    let ledger = CsvLedger::new(&path, JAKARTA);
    let entries = ledger.entries(42).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].balance, None);
    assert_eq!(balance(&entries), 975_000.0);

    // the next append continues from the last recorded balance
    let table = CategoryTable::default();
    let now = Utc.with_ymd_and_hms(2026, 10, 4, 1, 0, 0).unwrap();
    let txn = classify_at("makan malam 20000", &table, now).unwrap();
    let entry = ledger.append(42, &txn).await.unwrap();
    assert_eq!(entry.balance, Some(955_000.0));
}

/// A file re-saved by a spreadsheet app in Latin-1: the accented row is kept
/// with a replacement character, the row with garbage in the date column is
/// skipped, and appends keep working.
#[tokio::test]
async fn test_invalid_utf8_rows_do_not_break_the_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.csv");
    let mut bytes = b"Tanggal,Waktu,Kategori,Deskripsi,Pemasukan,Pengeluaran,Saldo,User ID\n".to_vec();
    bytes.extend_from_slice(b"2026-10-01,,Gaji,gaji,1000000,,,42\n");
    bytes.extend_from_slice(b"2026-10-02,08:00:00,Makanan,caf\xe9 latte,,15000,,42\n");
    bytes.extend_from_slice(b"\xff\xfe,,x,x,1,,,42\n");
    bytes.extend_from_slice(b"2026-10-03,09:00:00,Makanan,kopi,,5000,,42\n");
    fs::write(&path, bytes).unwrap();

    let ledger = CsvLedger::new(&path, JAKARTA);
    let entries = ledger.entries(42).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1].description, "caf\u{FFFD} latte");
    assert_eq!(balance(&entries), 980_000.0);

    let table = CategoryTable::default();
    let now = Utc.with_ymd_and_hms(2026, 10, 4, 1, 0, 0).unwrap();
    let txn = classify_at("makan malam 20000", &table, now).unwrap();
    let entry = ledger.append(42, &txn).await.unwrap();
    assert_eq!(entry.balance, Some(960_000.0));
    assert_eq!(ledger.entries(42).await.unwrap().len(), 4);
}
