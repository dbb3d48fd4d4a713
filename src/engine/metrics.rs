// ==========================================
// 表格批处理入库作业 - 汇总指标引擎
// ==========================================
// 职责: 从规范化记录集归约出汇总指标
// 红线: 纯函数，顺序无关，空记录集得到全零指标
// ==========================================

use crate::config::JobConfig;
use crate::domain::history::SummaryMetrics;
use crate::domain::record::NormalizedRecordSet;

// ==========================================
// MetricsSummarizer - 汇总指标引擎
// ==========================================
pub struct MetricsSummarizer {
    flag_column: String,
}

impl MetricsSummarizer {
    /// # 参数
    /// - flag_column: 计入 flagged_count 的逻辑列名
    pub fn new(flag_column: &str) -> Self {
        Self {
            flag_column: flag_column.to_string(),
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(&config.flag_metric_column)
    }

    /// 计算汇总指标
    ///
    /// 标记列未绑定或不存在时，flagged_count 为 0
    pub fn summarize(&self, records: &NormalizedRecordSet) -> SummaryMetrics {
        let flagged_count = records
            .iter()
            .filter(|r| r.get(&self.flag_column).is_flag_set())
            .count() as i64;

        SummaryMetrics { flagged_count }
    }
}
