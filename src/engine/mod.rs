// ==========================================
// 表格批处理入库作业 - 引擎层
// ==========================================
// 职责: 指标汇总、历史对账、入库流水线编排
// 红线: Engine 不拼 SQL，数据访问一律经由 Repository
// ==========================================

pub mod history_reconciler;
pub mod metrics;
pub mod pipeline;

// 重导出核心引擎
pub use history_reconciler::{metrics_equal, HistoryReconciler};
pub use metrics::MetricsSummarizer;
pub use pipeline::{Clock, IngestPipeline, RunReport, SheetIngestor};
