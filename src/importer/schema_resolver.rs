// ==========================================
// 表格批处理入库作业 - 结构解析器
// ==========================================
// 职责: 工作表选择 + 逻辑列 → 实际表头绑定
// 红线: 不猜测；零命中或多命中（必填列）一律失败，并列出全部问题
// ==========================================

use crate::config::{ColumnRule, JobConfig, MatchPolicy};
use crate::domain::record::{ColumnBinding, SchemaBinding};
use crate::importer::error::{ResolutionFailure, ResolutionProblem, SchemaResolutionError};
use crate::importer::matcher::{resolve_unique, resolve_unique_with_markers};
use std::collections::BTreeMap;

pub struct SchemaResolver {
    sheet_prefix: String,
    rules: Vec<ColumnRule>,
    policy: MatchPolicy,
}

impl SchemaResolver {
    pub fn new(sheet_prefix: &str, rules: Vec<ColumnRule>, policy: MatchPolicy) -> Self {
        Self {
            sheet_prefix: sheet_prefix.to_string(),
            rules,
            policy,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(
            &config.sheet_prefix,
            config.columns.clone(),
            config.match_policy.clone(),
        )
    }

    /// 选择工作表（名称以配置前缀开头，且唯一）
    pub fn resolve_sheet(&self, sheet_names: &[String]) -> Result<String, SchemaResolutionError> {
        resolve_unique(sheet_names, &self.sheet_prefix, &self.policy).map_err(|failure| {
            SchemaResolutionError {
                sheet_name: None,
                problems: vec![ResolutionProblem::Sheet {
                    prefix: self.sheet_prefix.clone(),
                    failure,
                }],
            }
        })
    }

    /// 绑定逻辑列
    ///
    /// # 规则
    /// - 必填列: 必须恰好命中一个表头
    /// - 非必填列: 零命中 → 不绑定（字段恒为 NULL）；多命中仍然失败
    /// - 同一表头不得被多个逻辑列同时命中
    /// - 空白表头不参与匹配
    pub fn resolve_columns(
        &self,
        sheet_name: &str,
        headers: &[String],
    ) -> Result<SchemaBinding, SchemaResolutionError> {
        let candidates: Vec<&str> = headers
            .iter()
            .map(|h| h.as_str())
            .filter(|h| !h.trim().is_empty())
            .collect();

        let mut problems = Vec::new();
        let mut columns = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let resolved = if rule.contains_any.is_empty() {
                resolve_unique(&candidates, &rule.prefix, &self.policy)
            } else {
                resolve_unique_with_markers(
                    &candidates,
                    &rule.prefix,
                    &rule.contains_any,
                    &self.policy,
                )
            };

            let header = match resolved {
                Ok(header) => Some(header),
                Err(ResolutionFailure::NoMatch { .. }) if !rule.required => {
                    tracing::warn!(
                        column = %rule.name,
                        prefix = %rule.prefix,
                        "非必填列未找到，字段将置为 NULL"
                    );
                    None
                }
                Err(failure) => {
                    problems.push(ResolutionProblem::Column {
                        logical_name: rule.name.clone(),
                        prefix: rule.prefix.clone(),
                        failure,
                    });
                    None
                }
            };

            columns.push(ColumnBinding {
                logical_name: rule.name.clone(),
                kind: rule.kind,
                required: rule.required,
                header,
            });
        }

        // 检查同一表头被多列命中
        let mut claimed: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for column in &columns {
            if let Some(header) = column.header.as_deref() {
                claimed
                    .entry(header)
                    .or_default()
                    .push(column.logical_name.clone());
            }
        }
        for (header, logical_names) in claimed {
            if logical_names.len() > 1 {
                problems.push(ResolutionProblem::SharedHeader {
                    header: header.to_string(),
                    logical_names,
                });
            }
        }

        if !problems.is_empty() {
            return Err(SchemaResolutionError {
                sheet_name: Some(sheet_name.to_string()),
                problems,
            });
        }

        Ok(SchemaBinding {
            sheet_name: sheet_name.to_string(),
            columns,
        })
    }
}
