// ==========================================
// 表格批处理入库作业 - 字段值清洗器
// ==========================================
// 职责: TRIM / NULL 标准化 / 标记统一 / 数值与日期解析
// 说明: 解析失败返回错误描述，是否丢弃整行由行校验器决定
// ==========================================

use crate::config::{BlankPolicy, JobConfig};
use crate::domain::types::{CellValue, ColumnKind};
use chrono::NaiveDate;

pub struct ValueCleaner {
    blank_policy: BlankPolicy,
    flag_true_values: Vec<String>,
    flag_false_values: Vec<String>,
}

impl ValueCleaner {
    pub fn new(
        blank_policy: BlankPolicy,
        flag_true_values: Vec<String>,
        flag_false_values: Vec<String>,
    ) -> Self {
        Self {
            blank_policy,
            flag_true_values,
            flag_false_values,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(
            config.blank_policy.clone(),
            config.flag_true_values.clone(),
            config.flag_false_values.clone(),
        )
    }

    /// 空白判定（TRIM 后为空或为空值标记）
    pub fn is_blank(&self, value: &str) -> bool {
        self.blank_policy.is_blank(value)
    }

    /// 标准化 NULL 值（空白 → None，其余 TRIM）
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value
            .filter(|v| !self.is_blank(v))
            .map(|v| v.trim().to_string())
    }

    /// 按列类型转换（输入已确认非空白）
    pub fn coerce(&self, kind: ColumnKind, value: &str) -> Result<CellValue, String> {
        let trimmed = value.trim();
        match kind {
            ColumnKind::Text => Ok(CellValue::Text(trimmed.to_string())),
            ColumnKind::Integer => self.parse_integer(trimmed).map(CellValue::Integer),
            ColumnKind::Decimal => self.parse_decimal(trimmed).map(CellValue::Decimal),
            ColumnKind::Flag => self.parse_flag(trimmed).map(CellValue::Flag),
            ColumnKind::Date => self.parse_date(trimmed).map(CellValue::Date),
        }
    }

    /// 解析整数（接受 "12" 与整数值浮点 "12.0"）
    pub fn parse_integer(&self, value: &str) -> Result<i64, String> {
        if let Ok(v) = value.parse::<i64>() {
            return Ok(v);
        }
        match value.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
            _ => Err(format!("无法解析为整数: {}", value)),
        }
    }

    /// 解析浮点数（拒绝 NaN / inf）
    pub fn parse_decimal(&self, value: &str) -> Result<f64, String> {
        match value.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(f),
            _ => Err(format!("无法解析为浮点数: {}", value)),
        }
    }

    /// 解析标记（真/假取值集合可配置，忽略大小写）
    pub fn parse_flag(&self, value: &str) -> Result<bool, String> {
        let matches_any = |values: &[String]| {
            values
                .iter()
                .any(|v| v.trim().to_lowercase() == value.to_lowercase())
        };

        if matches_any(&self.flag_true_values) {
            Ok(true)
        } else if matches_any(&self.flag_false_values) {
            Ok(false)
        } else {
            Err(format!("无法识别的标记值: {}", value))
        }
    }

    /// 解析日期（YYYYMMDD / YYYY-MM-DD / YYYY/MM/DD，带时间部分时只取日期）
    pub fn parse_date(&self, value: &str) -> Result<NaiveDate, String> {
        let date_part = value.split_whitespace().next().unwrap_or(value);
        NaiveDate::parse_from_str(date_part, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y-%m-%d"))
            .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y/%m/%d"))
            .map_err(|_| format!("日期格式错误，期望 YYYYMMDD / YYYY-MM-DD，实际 {}", value))
    }
}
