// ==========================================
// 表格批处理入库作业 - 入库流水线
// ==========================================
// 状态机: Start → SchemaResolved → Validated → Written → Summarized
//         → {Appended | SkippedDuplicate}
// 红线:
// - Written 之前的任何失败都不触碰中间表
// - 中间表整表替换，要么全部成功要么保持原样
// - 历史表只追加，且不与最新一条重复
// ==========================================

use crate::config::JobConfig;
use crate::domain::history::{HistoryOutcome, HistoryRecord, SummaryMetrics};
use crate::domain::source::SourceArtifact;
use crate::domain::types::RunStage;
use crate::engine::history_reconciler::HistoryReconciler;
use crate::engine::metrics::MetricsSummarizer;
use crate::error::{JobError, JobResult, StorageStage};
use crate::importer::row_normalizer::{RowCoercionError, RowNormalizer};
use crate::importer::tabular_reader::TabularReader;
use crate::importer::workbook::{open_workbook, Workbook};
use crate::repository::history_log_repo::HistoryLogRepository;
use crate::repository::staging_table_repo::StagingTableRepository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 处理时间来源（测试可注入固定时间）
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// ==========================================
// RunReport - 一次运行的结果
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub source_filename: String,
    pub sheet_name: String,
    pub total_rows: usize,
    pub blank_rows: usize,
    pub skipped: Vec<RowCoercionError>,
    pub written_rows: usize,
    pub metrics: SummaryMetrics,
    pub outcome: HistoryOutcome,
    pub history_record: HistoryRecord,
    pub stages: Vec<RunStage>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn appended(&self) -> bool {
        self.outcome == HistoryOutcome::Appended
    }
}

// ==========================================
// SheetIngestor Trait
// ==========================================
// 实现者: IngestPipeline
#[async_trait]
pub trait SheetIngestor: Send + Sync {
    /// 处理一个源文件
    ///
    /// # 返回
    /// - Ok(RunReport): 正常完成（含“重复未追加”）
    /// - Err(JobError): 致命错误，附失败阶段
    async fn run(&self, source: &SourceArtifact) -> JobResult<RunReport>;

    /// 使用已打开的工作簿处理（上游已解码数据、测试）
    async fn run_with_workbook(
        &self,
        source: &SourceArtifact,
        workbook: &mut dyn Workbook,
    ) -> JobResult<RunReport>;
}

// ==========================================
// IngestPipeline
// ==========================================
pub struct IngestPipeline<S, H>
where
    S: StagingTableRepository,
    H: HistoryLogRepository,
{
    reader: TabularReader,
    normalizer: RowNormalizer,
    summarizer: MetricsSummarizer,
    staging: S,
    reconciler: HistoryReconciler<H>,
    clock: Clock,
}

impl<S, H> IngestPipeline<S, H>
where
    S: StagingTableRepository,
    H: HistoryLogRepository,
{
    /// 创建流水线（配置在此校验一次）
    pub fn new(config: &JobConfig, staging: S, history: H) -> JobResult<Self> {
        config.validate()?;
        Ok(Self {
            reader: TabularReader::from_config(config),
            normalizer: RowNormalizer::from_config(config),
            summarizer: MetricsSummarizer::from_config(config),
            staging,
            reconciler: HistoryReconciler::new(history),
            clock: Arc::new(Utc::now),
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn staging(&self) -> &S {
        &self.staging
    }

    pub fn history(&self) -> &H {
        self.reconciler.repository()
    }

    /// 当前处理时间（UTC，截断到秒，与历史表存储精度一致）
    fn processing_timestamp(&self) -> NaiveDateTime {
        let now = (self.clock)().naive_utc();
        now.with_nanosecond(0).unwrap_or(now)
    }

    fn execute(
        &self,
        run_id: &str,
        source: &SourceArtifact,
        workbook: &mut dyn Workbook,
    ) -> JobResult<RunReport> {
        let start_time = Instant::now();
        let file = source.file_name();
        let mut stages = vec![RunStage::Start];

        // === 步骤 1: 结构解析 ===
        debug!("步骤 1: 结构解析");
        let (binding, rows) = self
            .reader
            .read_workbook(workbook)
            .map_err(|e| JobError::from_import(file, e))?;
        stages.push(RunStage::SchemaResolved);
        info!(sheet = %binding.sheet_name, "结构解析完成");

        // === 步骤 2: 行校验与规范化 ===
        debug!("步骤 2: 行校验与规范化");
        let outcome = self.normalizer.normalize(&binding, rows);
        info!(
            total_rows = outcome.total_rows,
            valid_rows = outcome.records.len(),
            blank_rows = outcome.blank_rows,
            skipped_rows = outcome.skipped.len(),
            "行校验完成"
        );
        if outcome.records.is_empty() {
            warn!(file = %file, "没有有效行，中止（中间表保持原样）");
            return Err(JobError::EmptyResult {
                file: file.to_string(),
                total_rows: outcome.total_rows,
                blank_rows: outcome.blank_rows,
                skipped: outcome.skipped.len(),
            });
        }
        stages.push(RunStage::Validated);

        // 历史表结构先行校验，结构不符时不触碰中间表
        let history_table = self.history().table_name().to_string();
        self.history()
            .ensure_table()
            .map_err(|e| JobError::storage(StorageStage::History, &history_table, e))?;

        // === 步骤 3: 覆盖中间表 ===
        debug!("步骤 3: 覆盖中间表");
        let written_rows = self.staging.overwrite(&outcome.records).map_err(|e| {
            JobError::storage(StorageStage::WriteStaging, self.staging.table_name(), e)
        })?;
        stages.push(RunStage::Written);
        info!(table = %self.staging.table_name(), rows = written_rows, "中间表已替换");

        // === 步骤 4: 汇总指标 ===
        let metrics = self.summarizer.summarize(&outcome.records);
        stages.push(RunStage::Summarized);
        debug!(metrics = %metrics, "指标汇总完成");

        // === 步骤 5: 历史对账 ===
        debug!("步骤 5: 历史对账");
        let candidate = HistoryReconciler::<H>::build_candidate(
            source,
            self.processing_timestamp(),
            metrics,
        );
        let history_outcome = self
            .reconciler
            .reconcile(&candidate)
            .map_err(|e| JobError::storage(StorageStage::History, &history_table, e))?;
        stages.push(match history_outcome {
            HistoryOutcome::Appended => RunStage::Appended,
            HistoryOutcome::SkippedDuplicate => RunStage::SkippedDuplicate,
        });

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            file = %file,
            outcome = %history_outcome,
            elapsed_ms = elapsed_ms,
            "运行完成"
        );

        Ok(RunReport {
            run_id: run_id.to_string(),
            source_filename: file.to_string(),
            sheet_name: binding.sheet_name,
            total_rows: outcome.total_rows,
            blank_rows: outcome.blank_rows,
            skipped: outcome.skipped,
            written_rows,
            metrics,
            outcome: history_outcome,
            history_record: candidate,
            stages,
            elapsed_ms,
        })
    }
}

#[async_trait]
impl<S, H> SheetIngestor for IngestPipeline<S, H>
where
    S: StagingTableRepository,
    H: HistoryLogRepository,
{
    #[instrument(skip(self, source), fields(run_id, file = %source.file_name()))]
    async fn run(&self, source: &SourceArtifact) -> JobResult<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        info!(run_id = %run_id, path = %source.path().display(), "开始处理源文件");

        let mut workbook =
            open_workbook(source.path()).map_err(|e| JobError::from_import(source.file_name(), e))?;
        self.execute(&run_id, source, workbook.as_mut())
    }

    #[instrument(skip(self, source, workbook), fields(run_id, file = %source.file_name()))]
    async fn run_with_workbook(
        &self,
        source: &SourceArtifact,
        workbook: &mut dyn Workbook,
    ) -> JobResult<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        info!(run_id = %run_id, "开始处理工作簿");

        self.execute(&run_id, source, workbook)
    }
}
