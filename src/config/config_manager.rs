// ==========================================
// 表格批处理入库作业 - 配置管理器
// ==========================================
// 职责: 配置加载（默认值 → JSON 文件 → 环境变量覆写）+ 校验
// 说明: 只有入口程序调用本模块；核心流程只接收 JobConfig
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::job_config::{Environment, JobConfig};
use std::path::{Path, PathBuf};

// ==========================================
// 环境变量键
// ==========================================
pub mod config_keys {
    // 运行环境（production / 其他）
    pub const ENVIRONMENT_NAME: &str = "environment_name";

    // JSON 配置文件路径
    pub const CONFIG_PATH: &str = "SHEET_INGEST_CONFIG";

    // 数据库文件路径（覆盖配置文件与默认值）
    pub const DB_PATH: &str = "SHEET_INGEST_DB_PATH";
}

// ==========================================
// ConfigManager - 配置加载器
// ==========================================
pub struct ConfigManager<F>
where
    F: Fn(&str) -> Option<String>,
{
    lookup: F,
}

impl ConfigManager<fn(&str) -> Option<String>> {
    /// 从进程环境变量读取
    pub fn from_env() -> Self {
        fn env_lookup(key: &str) -> Option<String> {
            std::env::var(key).ok()
        }
        Self { lookup: env_lookup }
    }
}

impl<F> ConfigManager<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 使用自定义变量来源（测试用）
    pub fn with_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// 加载配置
    ///
    /// # 顺序
    /// 1. SHEET_INGEST_CONFIG 指定的 JSON 文件（未指定则使用默认值）
    /// 2. environment_name 覆写运行环境
    /// 3. SHEET_INGEST_DB_PATH 覆写数据库路径
    /// 4. validate()
    pub fn load(&self) -> ConfigResult<JobConfig> {
        let mut config = match self.var(config_keys::CONFIG_PATH) {
            Some(path) => load_json_file(Path::new(&path))?,
            None => JobConfig::default(),
        };

        if let Some(name) = self.var(config_keys::ENVIRONMENT_NAME) {
            config.environment = Environment::from_name(&name);
        }

        if let Some(db_path) = self.var(config_keys::DB_PATH) {
            config.database_path = Some(PathBuf::from(db_path));
        }

        config.validate()?;

        tracing::debug!(
            environment = %config.environment,
            sheet_prefix = %config.sheet_prefix,
            columns = config.columns.len(),
            staging_table = %config.staging_table,
            history_table = %config.history_table,
            "配置加载完成"
        );

        Ok(config)
    }
}

/// 读取 JSON 配置文件（缺省字段取默认值）
pub fn load_json_file(path: &Path) -> ConfigResult<JobConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn manager(vars: HashMap<&'static str, String>) -> ConfigManager<impl Fn(&str) -> Option<String>> {
        ConfigManager::with_lookup(move |key: &str| vars.get(key).cloned())
    }

    #[test]
    fn test_load_defaults_without_env() {
        let config = manager(HashMap::new()).load().unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.staging_table, "ingest_staging");
    }

    #[test]
    fn test_environment_override() {
        let mut vars = HashMap::new();
        vars.insert(config_keys::ENVIRONMENT_NAME, "production".to_string());
        vars.insert(config_keys::DB_PATH, "/tmp/prod.db".to_string());

        let config = manager(vars).load().unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/prod.db")));
    }

    #[test]
    fn test_load_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "sheet_prefix": "Report_",
                "columns": [
                    {{ "name": "id", "prefix": "Emp", "kind": "text" }},
                    {{ "name": "flag", "prefix": "Flag", "kind": "flag" }}
                ]
            }}"#
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert(config_keys::CONFIG_PATH, file.path().display().to_string());

        let config = manager(vars).load().unwrap();
        assert_eq!(config.sheet_prefix, "Report_");
        assert_eq!(config.columns.len(), 2);
        assert!(config.columns[1].required);
    }

    #[test]
    fn test_missing_config_file() {
        let mut vars = HashMap::new();
        vars.insert(config_keys::CONFIG_PATH, "/nonexistent/ingest.json".to_string());

        let result = manager(vars).load();
        assert!(matches!(result, Err(ConfigError::FileReadError { .. })));
    }

    #[test]
    fn test_malformed_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let result = load_json_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_invalid_config_rejected_on_load() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "sheet_prefix": "" }}"#).unwrap();

        let mut vars = HashMap::new();
        vars.insert(config_keys::CONFIG_PATH, file.path().display().to_string());

        assert!(matches!(
            manager(vars).load(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
