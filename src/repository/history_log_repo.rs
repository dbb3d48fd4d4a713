// ==========================================
// 表格批处理入库作业 - 历史审计表 Repository
// ==========================================
// 职责: 建表/结构校验、读取最新一条、追加一条
// 红线: 只追加，不改不删；去重判断不在这里做
// ==========================================

use crate::config::is_valid_identifier;
use crate::db::{quote_identifier, table_columns};
use crate::domain::history::{HistoryRecord, SummaryMetrics, FLAGGED_COUNT};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// 处理时间存储格式（UTC）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const REQUIRED_COLUMNS: [&str; 3] = ["source_filename", "processing_timestamp", FLAGGED_COUNT];

// ==========================================
// HistoryLogRepository Trait
// ==========================================
// 实现者: HistoryLogRepositoryImpl（使用 rusqlite）
pub trait HistoryLogRepository: Send + Sync {
    fn table_name(&self) -> &str;

    /// 建表（不存在时）并校验已有表结构
    ///
    /// # 返回
    /// - Err(SchemaMismatch): 已有表缺少期望列
    fn ensure_table(&self) -> RepositoryResult<()>;

    /// 最新一条（处理时间最大；同一时间取最后插入的）
    fn find_latest(&self) -> RepositoryResult<Option<HistoryRecord>>;

    /// 追加一条
    fn append(&self, record: &HistoryRecord) -> RepositoryResult<()>;

    fn count(&self) -> RepositoryResult<usize>;
}

// ==========================================
// HistoryLogRepositoryImpl
// ==========================================
pub struct HistoryLogRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl HistoryLogRepositoryImpl {
    /// 创建实例（表名必须是合法标识符）
    pub fn new(conn: Arc<Mutex<Connection>>, table: &str) -> RepositoryResult<Self> {
        if !is_valid_identifier(table) {
            return Err(RepositoryError::InvalidIdentifier(table.to_string()));
        }
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl HistoryLogRepository for HistoryLogRepositoryImpl {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                source_filename TEXT NOT NULL,
                processing_timestamp TEXT NOT NULL,
                {} INTEGER NOT NULL
            )
            "#,
            quote_identifier(&self.table),
            FLAGGED_COUNT
        ))?;

        let existing = table_columns(&conn, &self.table)?;
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !existing.iter().any(|e| e == *c))
            .map(|c| c.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(RepositoryError::SchemaMismatch {
                table: self.table.clone(),
                missing,
            });
        }
        Ok(())
    }

    fn find_latest(&self) -> RepositoryResult<Option<HistoryRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT source_filename, processing_timestamp, {}
            FROM {}
            ORDER BY processing_timestamp DESC, rowid DESC
            LIMIT 1
            "#,
            FLAGGED_COUNT,
            quote_identifier(&self.table)
        );

        let row = conn
            .query_row(&sql, [], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .optional()?;

        match row {
            None => Ok(None),
            Some((source_filename, timestamp, flagged_count)) => {
                let processing_timestamp =
                    NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT).map_err(
                        |e| {
                            RepositoryError::DatabaseQueryError(format!(
                                "处理时间格式错误 '{}': {}",
                                timestamp, e
                            ))
                        },
                    )?;
                Ok(Some(HistoryRecord {
                    source_filename,
                    processing_timestamp,
                    metrics: SummaryMetrics { flagged_count },
                }))
            }
        }
    }

    fn append(&self, record: &HistoryRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (source_filename, processing_timestamp, {}) VALUES (?1, ?2, ?3)",
                quote_identifier(&self.table),
                FLAGGED_COUNT
            ),
            params![
                record.source_filename,
                record.processing_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                record.metrics.flagged_count,
            ],
        )?;
        Ok(())
    }

    fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(&self.table)),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}
