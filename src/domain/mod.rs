// ==========================================
// 表格批处理入库作业 - 领域模型层
// ==========================================
// 职责: 定义输入文件、列绑定、行记录、汇总指标、历史记录
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod history;
pub mod record;
pub mod source;
pub mod types;

// 重导出核心类型
pub use history::{HistoryOutcome, HistoryRecord, SummaryMetrics, FLAGGED_COUNT};
pub use record::{
    ColumnBinding, NormalizedRecord, NormalizedRecordSet, RawRow, RecordColumn, SchemaBinding,
};
pub use source::SourceArtifact;
pub use types::{CellValue, ColumnKind, RunStage};
