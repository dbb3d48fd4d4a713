// ==========================================
// 表格批处理入库作业 - 作业状态
// ==========================================
// 职责: 一次运行的共享连接 + 仓储 + 流水线
// 说明: 一次运行只打开一个连接，中间表与历史表共用
// ==========================================

use crate::config::JobConfig;
use crate::db::open_sqlite_connection;
use crate::domain::source::SourceArtifact;
use crate::engine::pipeline::{IngestPipeline, RunReport, SheetIngestor};
use crate::error::{JobError, JobResult, StorageStage};
use crate::repository::{HistoryLogRepositoryImpl, StagingTableRepositoryImpl};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// SQLite 落库的流水线
pub type SqlitePipeline = IngestPipeline<StagingTableRepositoryImpl, HistoryLogRepositoryImpl>;

pub struct JobState {
    db_path: PathBuf,
    pipeline: SqlitePipeline,
}

impl JobState {
    /// 初始化作业状态
    ///
    /// # 返回
    /// - Err(Config): 配置无效
    /// - Err(StorageWrite{storage_open}): 数据库无法打开
    pub fn new(config: JobConfig) -> JobResult<Self> {
        config.validate()?;

        let db_path = config.resolved_database_path();
        tracing::info!(
            environment = %config.environment,
            db_path = %db_path.display(),
            "初始化作业状态"
        );

        let db_label = db_path.display().to_string();
        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| JobError::storage(StorageStage::Open, &db_label, e.into()))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化 Repository 层
        // ==========================================
        let staging = StagingTableRepositoryImpl::new(conn.clone(), &config.staging_table)
            .map_err(|e| JobError::storage(StorageStage::Open, &config.staging_table, e))?;
        let history = HistoryLogRepositoryImpl::new(conn, &config.history_table)
            .map_err(|e| JobError::storage(StorageStage::Open, &config.history_table, e))?;

        let pipeline = IngestPipeline::new(&config, staging, history)?;

        Ok(Self { db_path, pipeline })
    }

    /// 处理一个源文件
    pub async fn run_file<P: AsRef<Path>>(&self, path: P) -> JobResult<RunReport> {
        let source = SourceArtifact::from_path(path);
        tracing::info!(
            file = %source.file_name(),
            db_path = %self.db_path.display(),
            "开始处理源文件"
        );
        self.pipeline.run(&source).await
    }
}
