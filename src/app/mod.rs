// ==========================================
// 表格批处理入库作业 - 应用层
// ==========================================
// 职责: 按配置装配数据库连接、仓储与流水线
// ==========================================

pub mod state;

// 重导出
pub use state::{JobState, SqlitePipeline};
