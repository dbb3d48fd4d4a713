// ==========================================
// 表格批处理入库作业 - 历史记录领域模型
// ==========================================
// 红线: 历史表只追加，不改不删
// 去重口径: 仅比较指标载荷（文件名、处理时间不参与比较）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 标记计数指标名
pub const FLAGGED_COUNT: &str = "flagged_count";

// ==========================================
// SummaryMetrics - 汇总指标
// ==========================================
// 不派生 PartialEq：比较必须走 HistoryReconciler::metrics_equal
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub flagged_count: i64, // 标记字段为真的记录数
}

impl SummaryMetrics {
    /// 指标名 → 数值
    pub fn as_map(&self) -> BTreeMap<&'static str, i64> {
        let mut map = BTreeMap::new();
        map.insert(FLAGGED_COUNT, self.flagged_count);
        map
    }

    pub fn is_zero(&self) -> bool {
        self.as_map().values().all(|v| *v == 0)
    }
}

impl fmt::Display for SummaryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .as_map()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

// ==========================================
// HistoryRecord - 审计历史行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub source_filename: String,
    pub processing_timestamp: NaiveDateTime,
    pub metrics: SummaryMetrics,
}

// ==========================================
// HistoryOutcome - 历史对账结果
// ==========================================
// SkippedDuplicate 不是错误，是成功的空操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryOutcome {
    Appended,
    SkippedDuplicate,
}

impl fmt::Display for HistoryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryOutcome::Appended => write!(f, "appended"),
            HistoryOutcome::SkippedDuplicate => write!(f, "skipped_duplicate"),
        }
    }
}
