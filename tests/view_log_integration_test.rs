use crane_check::adapters::discovery::find_longest_log;
use crane_check::core::summary::{check_min_session, LogSummary};
use crane_check::load_table;
use tempfile::TempDir;

fn session(rows: usize, step: f64) -> String {
    let mut text = String::from("Time,Velocity\n");
    for i in 0..rows {
        text.push_str(&format!("{},{}\n", i as f64 * step, 1.5));
    }
    text
}

#[test]
fn test_longest_test_log_is_summarized() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("P01_TEST_short.csv"), session(3, 10.0)).unwrap();
    std::fs::write(dir.path().join("P01_TEST_full.csv"), session(40, 10.0)).unwrap();
    // 名稱不含 TEST，即使最長也不列入
    std::fs::write(dir.path().join("P01_practice.csv"), session(100, 10.0)).unwrap();

    let path = find_longest_log(dir.path(), "TEST").unwrap();
    assert_eq!(path.file_name().unwrap(), "P01_TEST_full.csv");

    let table = load_table(&path).unwrap();
    let summary = LogSummary::from_table(&table);
    assert_eq!(summary.rows, 40);
    assert_eq!(summary.empty_cells, 0);
    assert_eq!(summary.total_time_sec, Some(390.0));

    let intervals = summary.intervals.as_ref().unwrap();
    assert_eq!(intervals.count, 39);
    assert!((intervals.mean_sec - 10.0).abs() < 1e-9);

    assert!(check_min_session(&table, 300.0).passed);
    assert!(!check_min_session(&table, 400.0).passed);
}

#[test]
fn test_no_matching_log() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.csv"), "Time\n1\n").unwrap();
    assert!(find_longest_log(dir.path(), "TEST").is_err());
}
