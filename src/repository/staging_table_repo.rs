// ==========================================
// 表格批处理入库作业 - 中间表 Repository
// ==========================================
// 职责: 以规范化记录集整表替换中间表内容
// 红线: 只覆盖，不追加、不合并；单事务，失败回滚保留旧内容
// ==========================================

use crate::config::is_valid_identifier;
use crate::db::quote_identifier;
use crate::domain::record::{NormalizedRecordSet, RecordColumn};
use crate::domain::types::CellValue;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// StagingTableRepository Trait
// ==========================================
// 实现者: StagingTableRepositoryImpl（使用 rusqlite）
pub trait StagingTableRepository: Send + Sync {
    /// 目标表名
    fn table_name(&self) -> &str;

    /// 整表替换
    ///
    /// # 返回
    /// - Ok(usize): 写入行数
    /// - Err: 数据库错误（整个事务回滚，旧内容保留）
    fn overwrite(&self, records: &NormalizedRecordSet) -> RepositoryResult<usize>;

    /// 当前行数（表不存在时为 None）
    fn count(&self) -> RepositoryResult<Option<usize>>;
}

// ==========================================
// StagingTableRepositoryImpl
// ==========================================
pub struct StagingTableRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl StagingTableRepositoryImpl {
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

    fn create_table_sql(&self, columns: &[RecordColumn]) -> String {
        let defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.kind.sql_type()))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&self.table),
            defs.join(", ")
        )
    }

    fn insert_sql(&self, columns: &[RecordColumn]) -> String {
        let names: Vec<String> = columns.iter().map(|c| quote_identifier(&c.name)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table),
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

/// CellValue → SQLite 值（标记存 0/1，日期存 YYYY-MM-DD）
fn to_sql_value(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Text(v) => Value::Text(v.clone()),
        CellValue::Integer(v) => Value::Integer(*v),
        CellValue::Decimal(v) => Value::Real(*v),
        CellValue::Flag(v) => Value::Integer(i64::from(*v)),
        CellValue::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
    }
}

impl StagingTableRepository for StagingTableRepositoryImpl {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn overwrite(&self, records: &NormalizedRecordSet) -> RepositoryResult<usize> {
        if records.columns.is_empty() {
            return Err(RepositoryError::DatabaseTransactionError(format!(
                "表 {} 没有列定义",
                self.table
            )));
        }
        if let Some(bad) = records.columns.iter().find(|c| !is_valid_identifier(&c.name)) {
            return Err(RepositoryError::InvalidIdentifier(bad.name.clone()));
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}",
            quote_identifier(&self.table)
        ))?;
        tx.execute_batch(&self.create_table_sql(&records.columns))?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(&self.insert_sql(&records.columns))?;
            for record in records.iter() {
                let values = records
                    .columns
                    .iter()
                    .map(|c| to_sql_value(record.get(&c.name)));
                stmt.execute(params_from_iter(values))?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(table = %self.table, rows = count, "中间表已整表替换");
        Ok(count)
    }

    fn count(&self) -> RepositoryResult<Option<usize>> {
        let conn = self.get_conn()?;
        if !crate::db::table_exists(&conn, &self.table)? {
            return Ok(None);
        }
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(&self.table)),
            [],
            |row| row.get(0),
        )?;
        Ok(Some(n as usize))
    }
}
