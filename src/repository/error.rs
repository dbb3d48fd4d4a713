// ==========================================
// 表格批处理入库作业 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 仓储层错误在作业层一律映射为 StorageWrite（致命，不重试）
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 表结构错误 =====
    #[error("非法表名或列名: {0}")]
    InvalidIdentifier(String),

    #[error("表结构不匹配 (table={table}): 缺少列 {missing:?}")]
    SchemaMismatch { table: String, missing: Vec<String> },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => RepositoryError::DatabaseQueryError(msg),
            rusqlite::Error::InvalidPath(path) => {
                RepositoryError::DatabaseConnectionError(path.display().to_string())
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
