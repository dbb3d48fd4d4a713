// ==========================================
// 表格批处理入库作业 - 作业配置对象
// ==========================================
// 职责: 定义核心流程识别的全部配置项（显式传入，不从进程上下文隐式推导）
// 红线: 不包含环境变量读取（由 ConfigManager 负责）
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::types::ColumnKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

// ==========================================
// Environment - 运行环境
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    /// 仅 "production" 视为生产环境，其余一律视为开发环境
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
        }
    }
}

// ==========================================
// MatchPolicy - 前缀匹配容差策略
// ==========================================
// 工作表与表头使用同一策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    pub case_insensitive: bool,  // 忽略大小写
    pub ignore_whitespace: bool, // 去除全部空白后再比较
    pub fold_accents: bool,      // NFKD 分解后丢弃组合附加符
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            ignore_whitespace: true,
            fold_accents: true,
        }
    }
}

impl MatchPolicy {
    /// 精确匹配（仅做 TRIM）
    pub fn strict() -> Self {
        Self {
            case_insensitive: false,
            ignore_whitespace: false,
            fold_accents: false,
        }
    }
}

// ==========================================
// BlankPolicy - 空值判定
// ==========================================
// TRIM 后为空，或（忽略大小写）等于任一空值标记，即视为空白
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlankPolicy {
    pub null_markers: Vec<String>,
}

impl Default for BlankPolicy {
    fn default() -> Self {
        Self {
            null_markers: ["", "nan", "null", "none", "n/a", "#n/a"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl BlankPolicy {
    pub fn is_blank(&self, value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || self
                .null_markers
                .iter()
                .any(|m| m.trim().eq_ignore_ascii_case(trimmed))
    }
}

// ==========================================
// ColumnRule - 逻辑列解析规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub name: String,   // 逻辑列名（同时作为中间表列名）
    pub prefix: String, // 表头前缀
    pub kind: ColumnKind,
    #[serde(default = "default_required")]
    pub required: bool,
    /// 表头还须包含其中任一标记（规范化后子串匹配）；为空则不限制
    #[serde(default)]
    pub contains_any: Vec<String>,
}

fn default_required() -> bool {
    true
}

impl ColumnRule {
    pub fn new(name: &str, prefix: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            kind,
            required: true,
            contains_any: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_markers(mut self, markers: &[&str]) -> Self {
        self.contains_any = markers.iter().map(|m| m.to_string()).collect();
        self
    }
}

// ==========================================
// JobConfig - 作业配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub environment: Environment,
    pub database_path: Option<PathBuf>,
    pub sheet_prefix: String,
    pub columns: Vec<ColumnRule>,
    pub match_policy: MatchPolicy,
    pub blank_policy: BlankPolicy,
    pub flag_true_values: Vec<String>,
    pub flag_false_values: Vec<String>,
    pub flag_metric_column: String,
    pub staging_table: String,
    pub history_table: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            database_path: None,
            sheet_prefix: "Report".to_string(),
            columns: vec![
                ColumnRule::new("column_a", "column_a", ColumnKind::Text),
                ColumnRule::new("column_b", "column_b", ColumnKind::Text),
                ColumnRule::new("flag", "flag", ColumnKind::Flag)
                    .optional()
                    .with_markers(&["marker1", "marker2"]),
            ],
            match_policy: MatchPolicy::default(),
            blank_policy: BlankPolicy::default(),
            flag_true_values: ["1", "y", "yes", "true", "x", "是"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            flag_false_values: ["0", "n", "no", "false", "否"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            flag_metric_column: "flag".to_string(),
            staging_table: "ingest_staging".to_string(),
            history_table: "ingest_history".to_string(),
        }
    }
}

impl JobConfig {
    /// 校验配置完整性
    ///
    /// # 规则
    /// - sheet_prefix 非空
    /// - 至少一个必填列；列名唯一且为合法标识符；前缀非空
    /// - flag_metric_column 必须指向 flag 类型的列
    /// - 中间表与历史表为合法标识符且互不相同
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sheet_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "sheet_prefix".to_string(),
                message: "工作表前缀不能为空".to_string(),
            });
        }

        if !self.columns.iter().any(|c| c.required) {
            return Err(ConfigError::InvalidValue {
                key: "columns".to_string(),
                message: "至少需要一个必填列".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for rule in &self.columns {
            if !is_valid_identifier(&rule.name) {
                return Err(ConfigError::InvalidIdentifier {
                    key: "columns.name".to_string(),
                    value: rule.name.clone(),
                });
            }
            if !seen.insert(rule.name.to_lowercase()) {
                return Err(ConfigError::InvalidValue {
                    key: "columns.name".to_string(),
                    message: format!("逻辑列名重复: {}", rule.name),
                });
            }
            if rule.prefix.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: format!("columns.{}.prefix", rule.name),
                    message: "表头前缀不能为空".to_string(),
                });
            }
        }

        match self.column_rule(&self.flag_metric_column) {
            Some(rule) if rule.kind == ColumnKind::Flag => {}
            Some(rule) => {
                return Err(ConfigError::InvalidValue {
                    key: "flag_metric_column".to_string(),
                    message: format!("列 {} 类型为 {}，计数列必须为 flag", rule.name, rule.kind),
                });
            }
            None => {
                return Err(ConfigError::InvalidValue {
                    key: "flag_metric_column".to_string(),
                    message: format!("未定义的逻辑列: {}", self.flag_metric_column),
                });
            }
        }

        for (key, table) in [
            ("staging_table", &self.staging_table),
            ("history_table", &self.history_table),
        ] {
            if !is_valid_identifier(table) {
                return Err(ConfigError::InvalidIdentifier {
                    key: key.to_string(),
                    value: table.clone(),
                });
            }
        }
        if self.staging_table.eq_ignore_ascii_case(&self.history_table) {
            return Err(ConfigError::InvalidValue {
                key: "history_table".to_string(),
                message: "历史表不能与中间表同名".to_string(),
            });
        }

        Ok(())
    }

    pub fn column_rule(&self, name: &str) -> Option<&ColumnRule> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// 数据库文件路径
    ///
    /// 未显式配置时按环境放在用户数据目录下，拿不到数据目录则回退到当前目录
    pub fn resolved_database_path(&self) -> PathBuf {
        if let Some(path) = &self.database_path {
            return path.clone();
        }

        match dirs::data_dir() {
            Some(data_dir) => data_dir
                .join("sheet-history-ingest")
                .join(format!("{}.db", self.environment)),
            None => PathBuf::from(format!("./sheet_history_ingest_{}.db", self.environment)),
        }
    }
}

/// SQL 标识符校验: [A-Za-z_][A-Za-z0-9_]*
pub fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = JobConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_from_name() {
        assert_eq!(Environment::from_name("production"), Environment::Production);
        assert_eq!(Environment::from_name(" PRODUCTION "), Environment::Production);
        assert_eq!(Environment::from_name("prod"), Environment::Development);
        assert_eq!(Environment::from_name(""), Environment::Development);
    }

    #[test]
    fn test_blank_policy_markers() {
        let policy = BlankPolicy::default();
        assert!(policy.is_blank("   "));
        assert!(policy.is_blank("NaN"));
        assert!(policy.is_blank(" #N/A "));
        assert!(!policy.is_blank("0"));
        assert!(!policy.is_blank("nan-ish"));
    }

    #[test]
    fn test_validate_rejects_blank_sheet_prefix() {
        let config = JobConfig {
            sheet_prefix: "  ".to_string(),
            ..JobConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "sheet_prefix"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_identifier() {
        let config = JobConfig {
            staging_table: "staging; DROP TABLE x".to_string(),
            ..JobConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_flag_metric_column() {
        let config = JobConfig {
            flag_metric_column: "column_a".to_string(),
            ..JobConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_column_names() {
        let mut config = JobConfig::default();
        config
            .columns
            .push(ColumnRule::new("Column_A", "other", ColumnKind::Text));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: JobConfig =
            serde_json::from_str(r#"{ "sheet_prefix": "Report_", "history_table": "audit_log" }"#)
                .unwrap();
        assert_eq!(config.sheet_prefix, "Report_");
        assert_eq!(config.history_table, "audit_log");
        assert_eq!(config.staging_table, "ingest_staging");
        assert!(config.match_policy.case_insensitive);
    }

    #[test]
    fn test_column_rule_required_defaults_true() {
        let rule: ColumnRule =
            serde_json::from_str(r#"{ "name": "id", "prefix": "Emp", "kind": "text" }"#).unwrap();
        assert!(rule.required);
        assert!(rule.contains_any.is_empty());
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let config = JobConfig {
            database_path: Some(PathBuf::from("/tmp/x.db")),
            ..JobConfig::default()
        };
        assert_eq!(config.resolved_database_path(), PathBuf::from("/tmp/x.db"));
    }
}
