// ==========================================
// 表格批处理入库作业 - 领域类型定义
// ==========================================
// 职责: 列类型 / 单元格值 / 运行阶段
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 列类型 (Column Kind)
// ==========================================
// 序列化格式: 小写（与配置文件一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,    // 文本（TRIM 后保留）
    Integer, // 整数
    Decimal, // 浮点数
    Flag,    // 标记（真/假）
    Date,    // 日期（YYYYMMDD / YYYY-MM-DD）
}

impl ColumnKind {
    /// 落库时的 SQLite 列类型
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Decimal => "REAL",
            ColumnKind::Flag => "INTEGER",
            ColumnKind::Date => "TEXT",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Text => write!(f, "text"),
            ColumnKind::Integer => write!(f, "integer"),
            ColumnKind::Decimal => write!(f, "decimal"),
            ColumnKind::Flag => write!(f, "flag"),
            ColumnKind::Date => write!(f, "date"),
        }
    }
}

// ==========================================
// 单元格值 (Cell Value)
// ==========================================
// 规范化后的字段值；Null 表示空白或非必填字段解析失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Flag(bool),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// 标记字段是否为真（非 Flag 类型一律视为 false）
    pub fn is_flag_set(&self) -> bool {
        matches!(self, CellValue::Flag(true))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Text(v) => write!(f, "{}", v),
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Decimal(v) => write!(f, "{}", v),
            CellValue::Flag(v) => write!(f, "{}", if *v { "1" } else { "0" }),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

// ==========================================
// 运行阶段 (Run Stage)
// ==========================================
// 状态机: Start → SchemaResolved → Validated → Written → Summarized → {Appended | SkippedDuplicate}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    Start,
    SchemaResolved,
    Validated,
    Written,
    Summarized,
    Appended,
    SkippedDuplicate,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStage::Start => write!(f, "START"),
            RunStage::SchemaResolved => write!(f, "SCHEMA_RESOLVED"),
            RunStage::Validated => write!(f, "VALIDATED"),
            RunStage::Written => write!(f, "WRITTEN"),
            RunStage::Summarized => write!(f, "SUMMARIZED"),
            RunStage::Appended => write!(f, "APPENDED"),
            RunStage::SkippedDuplicate => write!(f, "SKIPPED_DUPLICATE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind_serde_lowercase() {
        let kind: ColumnKind = serde_json::from_str("\"decimal\"").unwrap();
        assert_eq!(kind, ColumnKind::Decimal);
        assert_eq!(serde_json::to_string(&ColumnKind::Flag).unwrap(), "\"flag\"");
    }

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::Flag(true).to_string(), "1");
        assert_eq!(
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).to_string(),
            "2024-03-01"
        );
        assert!(CellValue::Null.is_null());
        assert!(!CellValue::Text("Y".to_string()).is_flag_set());
    }

    #[test]
    fn test_run_stage_display() {
        assert_eq!(RunStage::SkippedDuplicate.to_string(), "SKIPPED_DUPLICATE");
        assert_eq!(RunStage::SchemaResolved.to_string(), "SCHEMA_RESOLVED");
    }
}
