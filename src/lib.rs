// ==========================================
// 表格批处理入库作业 - 核心库
// ==========================================
// 流程: 源文件 → 结构解析 → 行校验 → 覆盖中间表 → 指标汇总 → 历史对账
// 技术栈: Rust + calamine/csv + SQLite
// 一次调用只处理一个文件；调度、重试、文件发现由外部启动器负责
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 作业配置
pub mod config;

// 导入层 - 源文件读取与行规范化
pub mod importer;

// 数据仓储层 - 中间表 / 历史表
pub mod repository;

// 引擎层 - 指标、对账、流水线
pub mod engine;

// 应用层 - 装配
pub mod app;

// 作业级错误与退出码
pub mod error;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use app::JobState;
pub use config::{ConfigManager, JobConfig};
pub use domain::{
    CellValue, ColumnKind, HistoryOutcome, HistoryRecord, NormalizedRecord, NormalizedRecordSet,
    RawRow, RunStage, SchemaBinding, SourceArtifact, SummaryMetrics,
};
pub use engine::{
    metrics_equal, HistoryReconciler, IngestPipeline, MetricsSummarizer, RunReport, SheetIngestor,
};
pub use error::{exit_codes, JobError, JobResult};
pub use importer::{RowNormalizer, SchemaResolver, TabularReader};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "表格批处理入库作业";
