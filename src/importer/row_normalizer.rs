// ==========================================
// 表格批处理入库作业 - 行校验与规范化
// ==========================================
// 职责: 投影已绑定列 → 空白行丢弃 → 类型转换 → 保持原始行序
// 规则:
// - 投影字段全部空白: 静默丢弃（debug 日志）
// - 必填字段转换失败: 丢弃该行（warn 日志），不中止作业
// - 非必填字段转换失败: 置 NULL（warn 日志）
// - 必填字段全部为空: 丢弃该行（warn 日志）
// ==========================================

use crate::config::JobConfig;
use crate::domain::record::{NormalizedRecord, NormalizedRecordSet, RawRow, SchemaBinding};
use crate::domain::types::CellValue;
use crate::importer::value_cleaner::ValueCleaner;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

// ==========================================
// RowCoercionError - 单行错误（只影响该行）
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum RowCoercionError {
    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversion {
        row: usize,
        field: String,
        message: String,
    },

    #[error("必填字段全部为空 (行 {row})")]
    RequiredFieldsEmpty { row: usize },
}

impl RowCoercionError {
    pub fn row(&self) -> usize {
        match self {
            RowCoercionError::TypeConversion { row, .. } => *row,
            RowCoercionError::RequiredFieldsEmpty { row } => *row,
        }
    }
}

// ==========================================
// NormalizationOutcome - 校验结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct NormalizationOutcome {
    pub records: NormalizedRecordSet,
    pub skipped: Vec<RowCoercionError>, // 被丢弃的无效行
    pub blank_rows: usize,              // 静默丢弃的空白行
    pub total_rows: usize,              // 读取的数据行总数
}

pub struct RowNormalizer {
    cleaner: ValueCleaner,
}

impl RowNormalizer {
    pub fn new(cleaner: ValueCleaner) -> Self {
        Self { cleaner }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(ValueCleaner::from_config(config))
    }

    /// 单次遍历原始行，产出有效记录集
    pub fn normalize<I>(&self, binding: &SchemaBinding, rows: I) -> NormalizationOutcome
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut outcome = NormalizationOutcome {
            records: NormalizedRecordSet::new(binding.record_columns()),
            ..Default::default()
        };

        for row in rows {
            outcome.total_rows += 1;
            match self.normalize_row(binding, &row) {
                Ok(Some(record)) => outcome.records.records.push(record),
                Ok(None) => {
                    debug!(row_number = row.row_number, "空白行已跳过");
                    outcome.blank_rows += 1;
                }
                Err(e) => {
                    warn!(row_number = e.row(), error = %e, "无效行已跳过");
                    outcome.skipped.push(e);
                }
            }
        }

        outcome
    }

    /// 规范化单行
    ///
    /// # 返回
    /// - Ok(Some(record)): 有效行
    /// - Ok(None): 投影字段全部空白
    /// - Err: 行级错误
    pub fn normalize_row(
        &self,
        binding: &SchemaBinding,
        row: &RawRow,
    ) -> Result<Option<NormalizedRecord>, RowCoercionError> {
        // 投影已绑定列（未绑定列不参与空白判定）
        let projected: Vec<Option<&str>> = binding
            .columns
            .iter()
            .map(|c| c.header.as_deref().and_then(|h| row.get(h)))
            .collect();

        let all_blank = binding
            .columns
            .iter()
            .zip(&projected)
            .filter(|(c, _)| c.is_bound())
            .all(|(_, v)| v.map_or(true, |v| self.cleaner.is_blank(v)));
        if all_blank {
            return Ok(None);
        }

        let mut fields = BTreeMap::new();
        let mut any_required_present = false;

        for (column, raw) in binding.columns.iter().zip(projected) {
            let value = match self.cleaner.normalize_null(raw) {
                None => CellValue::Null,
                Some(text) => match self.cleaner.coerce(column.kind, &text) {
                    Ok(v) => v,
                    Err(message) if column.required => {
                        return Err(RowCoercionError::TypeConversion {
                            row: row.row_number,
                            field: column.logical_name.clone(),
                            message,
                        });
                    }
                    Err(message) => {
                        warn!(
                            row_number = row.row_number,
                            field = %column.logical_name,
                            error = %message,
                            "非必填字段转换失败，置为 NULL"
                        );
                        CellValue::Null
                    }
                },
            };

            if column.required && !value.is_null() {
                any_required_present = true;
            }
            fields.insert(column.logical_name.clone(), value);
        }

        if !any_required_present {
            return Err(RowCoercionError::RequiredFieldsEmpty {
                row: row.row_number,
            });
        }

        Ok(Some(NormalizedRecord {
            row_number: row.row_number,
            fields,
        }))
    }
}
