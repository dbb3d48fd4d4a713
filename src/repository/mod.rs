// ==========================================
// 表格批处理入库作业 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 值一律参数化；表名/列名先校验再加引号
// ==========================================

pub mod error;
pub mod history_log_repo;
pub mod staging_table_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use history_log_repo::{HistoryLogRepository, HistoryLogRepositoryImpl, TIMESTAMP_FORMAT};
pub use staging_table_repo::{StagingTableRepository, StagingTableRepositoryImpl};
