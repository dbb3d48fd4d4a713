// ==========================================
// 入库流水线集成测试
// ==========================================
// 测试目标: CSV 源文件 → 中间表覆盖 → 历史去重追加（临时 SQLite）
// ==========================================


use sheet_history_ingest::config::{ColumnRule, JobConfig};
use sheet_history_ingest::{
    exit_codes, logging, ColumnKind, HistoryOutcome, JobError, JobState, RunStage,
};
use test_helpers::{file_name, fixture, history_counts, table_count, TestWorkspace};

const HEADER: &str = "Emp ID,Flag?,Note";

#[tokio::test]
async fn test_report_scenario_drops_blank_row_and_counts_flag() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let path = ws.write_csv("Report_2024_03.csv", &[HEADER, "1,Y,ok", ",,"]);
    let config = ws.config();
    let state = JobState::new(config.clone()).unwrap();

    let report = state.run_file(&path).await.unwrap();

    assert_eq!(report.sheet_name, "Report_2024_03");
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.blank_rows, 1);
    assert_eq!(report.written_rows, 1);
    assert_eq!(report.metrics.flagged_count, 1);
    assert_eq!(report.outcome, HistoryOutcome::Appended);
    assert_eq!(report.history_record.source_filename, file_name(&path));

    let conn = ws.connect();
    assert_eq!(table_count(&conn, &config.staging_table), Some(1));
    assert_eq!(history_counts(&conn, &config.history_table), vec![1]);

    let (id, flag): (String, i64) = conn
        .query_row(
            &format!("SELECT id, flag FROM {}", config.staging_table),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(id, "1");
    assert_eq!(flag, 1);
}

#[tokio::test]
async fn test_history_dedup_sequence() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = ws.config();
    let state = JobState::new(config.clone()).unwrap();

    let first = ws.write_csv("Report_2024_03.csv", &[HEADER, "1,Y,", "2,N,"]);
    let same_metrics = ws.write_csv("Report_2024_04.csv", &[HEADER, "7,Y,", "8,N,", "9,,"]);
    let changed = ws.write_csv("Report_2024_05.csv", &[HEADER, "1,Y,", "2,Y,"]);

    let r1 = state.run_file(&first).await.unwrap();
    assert_eq!(r1.outcome, HistoryOutcome::Appended);

    // 文件名不同、指标相同 → 不追加（中间表仍然覆盖）
    let r2 = state.run_file(&same_metrics).await.unwrap();
    assert_eq!(r2.outcome, HistoryOutcome::SkippedDuplicate);
    assert_eq!(r2.stages.last(), Some(&RunStage::SkippedDuplicate));

    let conn = ws.connect();
    assert_eq!(table_count(&conn, &config.staging_table), Some(3));
    assert_eq!(history_counts(&conn, &config.history_table), vec![1]);

    let r3 = state.run_file(&changed).await.unwrap();
    assert_eq!(r3.outcome, HistoryOutcome::Appended);
    assert_eq!(history_counts(&conn, &config.history_table), vec![1, 2]);
}

#[tokio::test]
async fn test_same_file_twice_appends_once() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = ws.config();
    let path = ws.write_csv("Report_2024_03.csv", &[HEADER, "1,Y,", "2,yes,", "3,0,"]);
    let state = JobState::new(config.clone()).unwrap();

    let r1 = state.run_file(&path).await.unwrap();
    let r2 = state.run_file(&path).await.unwrap();

    assert!(r1.appended());
    assert!(!r2.appended());
    assert_eq!(r1.metrics.flagged_count, 2);

    let conn = ws.connect();
    assert_eq!(history_counts(&conn, &config.history_table), vec![2]);
    assert_eq!(table_count(&conn, &config.staging_table), Some(3));
}

#[tokio::test]
async fn test_no_matching_sheet_keeps_staging_table() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = ws.config();
    let state = JobState::new(config.clone()).unwrap();

    let good = ws.write_csv("Report_2024_03.csv", &[HEADER, "1,Y,", "2,N,"]);
    state.run_file(&good).await.unwrap();

    let bad = ws.write_csv("Summary_2024_04.csv", &[HEADER, "9,Y,"]);
    let err = state.run_file(&bad).await.unwrap_err();

    assert!(matches!(err, JobError::SchemaResolution { .. }));
    assert_eq!(err.stage(), "schema_resolution");
    assert_eq!(err.exit_code(), exit_codes::SCHEMA_RESOLUTION);
    assert!(err.to_string().contains("Summary_2024_04"));

    let conn = ws.connect();
    assert_eq!(table_count(&conn, &config.staging_table), Some(2));
    assert_eq!(history_counts(&conn, &config.history_table), vec![1]);
}

#[tokio::test]
async fn test_ambiguous_column_names_candidates() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let state = JobState::new(ws.config()).unwrap();
    let path = ws.write_csv("Report_2024_03.csv", &["Emp ID,Emp Name,Flag?", "1,a,Y"]);

    let err = state.run_file(&path).await.unwrap_err();
    let message = err.to_string();
    assert_eq!(err.stage(), "schema_resolution");
    assert!(message.contains("Emp ID"));
    assert!(message.contains("Emp Name"));
}

#[tokio::test]
async fn test_non_numeric_required_field_drops_row() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = JobConfig {
        columns: vec![
            ColumnRule::new("id", "Emp", ColumnKind::Text),
            ColumnRule::new("amount", "Amount", ColumnKind::Decimal),
            ColumnRule::new("flag", "Flag", ColumnKind::Flag).optional(),
        ],
        ..ws.config()
    };
    let state = JobState::new(config.clone()).unwrap();
    let path = ws.write_csv(
        "Report_2024_03.csv",
        &["Emp ID,Amount,Flag?", "1,abc,Y", "2,3.5,Y", "3,,N"],
    );

    let report = state.run_file(&path).await.unwrap();
    assert_eq!(report.written_rows, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].row(), 2);
    assert_eq!(report.metrics.flagged_count, 1);

    let conn = ws.connect();
    let amounts: Vec<Option<f64>> = {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT amount FROM {} ORDER BY rowid",
                config.staging_table
            ))
            .unwrap();
        let rows = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<Option<f64>>, _>>()
            .unwrap();
        rows
    };
    assert_eq!(amounts, vec![Some(3.5), None]);
}

#[tokio::test]
async fn test_all_blank_rows_is_empty_result() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = ws.config();
    let state = JobState::new(config.clone()).unwrap();
    let path = ws.write_csv("Report_2024_03.csv", &[HEADER, ",,", " , ,note"]);

    let err = state.run_file(&path).await.unwrap_err();
    assert_eq!(err.stage(), "validation");
    assert_eq!(err.exit_code(), exit_codes::EMPTY_RESULT);
    assert!(matches!(
        err,
        JobError::EmptyResult {
            total_rows: 2,
            blank_rows: 2,
            skipped: 0,
            ..
        }
    ));

    let conn = ws.connect();
    assert_eq!(table_count(&conn, &config.staging_table), None);
}

#[tokio::test]
async fn test_missing_source_file_is_read_error() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let state = JobState::new(ws.config()).unwrap();

    let err = state
        .run_file(ws.dir.path().join("Report_missing.xlsx"))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), "read");
    assert_eq!(err.exit_code(), exit_codes::SOURCE_READ);
}

#[tokio::test]
async fn test_history_schema_mismatch_fails_before_staging_write() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = ws.config();
    ws.connect()
        .execute_batch(&format!(
            "CREATE TABLE {} (filename TEXT, processing_timestamp TEXT);",
            config.history_table
        ))
        .unwrap();

    let state = JobState::new(config.clone()).unwrap();
    let path = ws.write_csv("Report_2024_03.csv", &[HEADER, "1,Y,"]);

    let err = state.run_file(&path).await.unwrap_err();
    assert_eq!(err.stage(), "history");
    assert_eq!(err.exit_code(), exit_codes::STORAGE_WRITE);
    assert!(err.to_string().contains("flagged_count"));

    let conn = ws.connect();
    assert_eq!(table_count(&conn, &config.staging_table), None);
}

#[tokio::test]
async fn test_flag_column_with_markers_is_optional() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = JobConfig {
        columns: vec![
            ColumnRule::new("id", "Emp", ColumnKind::Text),
            ColumnRule::new("flag", "flag", ColumnKind::Flag)
                .optional()
                .with_markers(&["marker1", "marker2"]),
        ],
        ..ws.config()
    };
    let state = JobState::new(config).unwrap();

    // 表头以 flag 开头但不含标记 → 不绑定，计数为 0
    let without_marker = ws.write_csv("Report_2024_03.csv", &["Emp ID,Flag comment", "1,Y"]);
    let report = state.run_file(&without_marker).await.unwrap();
    assert_eq!(report.metrics.flagged_count, 0);

    let with_marker = ws.write_csv(
        "Report_2024_04.csv",
        &["Emp ID,Flag (Marker2),Flag comment", "1,Y,x", "2,Y,x"],
    );
    let report = state.run_file(&with_marker).await.unwrap();
    assert_eq!(report.metrics.flagged_count, 2);
    assert_eq!(report.outcome, HistoryOutcome::Appended);
}

#[tokio::test]
async fn test_xlsx_empty_sheet_is_schema_resolution_error() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = ws.config();
    let state = JobState::new(config.clone()).unwrap();

    let err = state
        .run_file(fixture("empty_report_sheet.xlsx"))
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::SchemaResolution { .. }));
    assert_eq!(err.stage(), "schema_resolution");
    assert_eq!(err.exit_code(), exit_codes::SCHEMA_RESOLUTION);
    let message = err.to_string();
    assert!(message.contains("Report_2024_03"));
    assert!(message.contains("列 id"));

    let conn = ws.connect();
    assert_eq!(table_count(&conn, &config.staging_table), None);
}

#[tokio::test]
async fn test_xlsx_out_of_range_date_cells_do_not_abort() {
    logging::init_test();

    let ws = TestWorkspace::new();
    let config = ws.config();
    let state = JobState::new(config.clone()).unwrap();

    // 未绑定的日期列含超出范围的序列号
    let report = state
        .run_file(fixture("report_with_dates.xlsx"))
        .await
        .unwrap();

    assert_eq!(report.sheet_name, "Report_2024_03");
    assert_eq!(report.written_rows, 3);
    assert_eq!(report.metrics.flagged_count, 2);
    assert_eq!(report.outcome, HistoryOutcome::Appended);

    let conn = ws.connect();
    assert_eq!(table_count(&conn, &config.staging_table), Some(3));
}
