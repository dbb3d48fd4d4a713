// ==========================================
// 表格批处理入库作业 - 历史对账引擎
// ==========================================
// 职责: 生成候选历史记录 → 与最新一条比较 → 不同才追加
// 去重口径: metrics_equal（只比较指标载荷，不比较文件名/处理时间）
// 说明: 读最新 + 比较 + 追加 不是原子操作；并发运行由外部调度互斥
// ==========================================

use crate::domain::history::{HistoryOutcome, HistoryRecord, SummaryMetrics};
use crate::domain::source::SourceArtifact;
use crate::repository::error::RepositoryResult;
use crate::repository::history_log_repo::HistoryLogRepository;
use chrono::NaiveDateTime;
use tracing::info;

/// 指标载荷相等判定（去重键）
pub fn metrics_equal(a: &SummaryMetrics, b: &SummaryMetrics) -> bool {
    a.flagged_count == b.flagged_count
}

// ==========================================
// HistoryReconciler
// ==========================================
pub struct HistoryReconciler<H: HistoryLogRepository> {
    repo: H,
}

impl<H: HistoryLogRepository> HistoryReconciler<H> {
    pub fn new(repo: H) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &H {
        &self.repo
    }

    /// 生成候选历史记录
    pub fn build_candidate(
        source: &SourceArtifact,
        processing_timestamp: NaiveDateTime,
        metrics: SummaryMetrics,
    ) -> HistoryRecord {
        HistoryRecord {
            source_filename: source.file_name().to_string(),
            processing_timestamp,
            metrics,
        }
    }

    /// 对账
    ///
    /// # 返回
    /// - Ok(Appended): 历史表为空或最新一条指标不同，已追加
    /// - Ok(SkippedDuplicate): 与最新一条指标相同，未写入（不是错误）
    /// - Err: 读写历史表失败
    pub fn reconcile(&self, candidate: &HistoryRecord) -> RepositoryResult<HistoryOutcome> {
        let latest = self.repo.find_latest()?;

        if let Some(previous) = &latest {
            if metrics_equal(&previous.metrics, &candidate.metrics) {
                info!(
                    outcome = %HistoryOutcome::SkippedDuplicate,
                    file = %candidate.source_filename,
                    previous_file = %previous.source_filename,
                    metrics = %candidate.metrics,
                    "指标与最新历史记录相同，跳过追加"
                );
                return Ok(HistoryOutcome::SkippedDuplicate);
            }
        }

        self.repo.append(candidate)?;
        info!(
            outcome = %HistoryOutcome::Appended,
            file = %candidate.source_filename,
            metrics = %candidate.metrics,
            had_previous = latest.is_some(),
            "历史记录已追加"
        );
        Ok(HistoryOutcome::Appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::history_log_repo::HistoryLogRepositoryImpl;
    use chrono::NaiveDate;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn reconciler() -> HistoryReconciler<HistoryLogRepositoryImpl> {
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let repo = HistoryLogRepositoryImpl::new(conn, "ingest_history").unwrap();
        repo.ensure_table().unwrap();
        HistoryReconciler::new(repo)
    }

    fn candidate(file: &str, minute: u32, flagged_count: i64) -> HistoryRecord {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(6, minute, 0)
            .unwrap();
        HistoryReconciler::<HistoryLogRepositoryImpl>::build_candidate(
            &SourceArtifact::from_path(format!("/data/in/{}", file)),
            ts,
            SummaryMetrics { flagged_count },
        )
    }

    #[test]
    fn test_metrics_equal_ignores_identity() {
        let a = candidate("a.xlsx", 0, 1);
        let b = candidate("b.xlsx", 30, 1);
        assert!(metrics_equal(&a.metrics, &b.metrics));
        assert!(!metrics_equal(&a.metrics, &SummaryMetrics { flagged_count: 2 }));
    }

    #[test]
    fn test_build_candidate_uses_file_name() {
        let c = candidate("report_march.xlsx", 0, 3);
        assert_eq!(c.source_filename, "report_march.xlsx");
    }

    #[test]
    fn test_first_run_appends() {
        let r = reconciler();
        assert_eq!(r.reconcile(&candidate("a.xlsx", 0, 0)).unwrap(), HistoryOutcome::Appended);
        assert_eq!(r.repository().count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_then_change() {
        let r = reconciler();
        r.reconcile(&candidate("a.xlsx", 0, 1)).unwrap();

        // 不同文件名、相同指标 → 视为重复
        assert_eq!(
            r.reconcile(&candidate("b.xlsx", 1, 1)).unwrap(),
            HistoryOutcome::SkippedDuplicate
        );
        assert_eq!(r.repository().count().unwrap(), 1);

        assert_eq!(r.reconcile(&candidate("c.xlsx", 2, 2)).unwrap(), HistoryOutcome::Appended);
        assert_eq!(r.repository().count().unwrap(), 2);
    }

    #[test]
    fn test_compares_only_against_latest() {
        let r = reconciler();
        r.reconcile(&candidate("a.xlsx", 0, 1)).unwrap();
        r.reconcile(&candidate("b.xlsx", 1, 2)).unwrap();

        // 与更早的记录相同，但与最新一条不同 → 追加
        assert_eq!(r.reconcile(&candidate("c.xlsx", 2, 1)).unwrap(), HistoryOutcome::Appended);
        assert_eq!(r.repository().count().unwrap(), 3);
    }
}
