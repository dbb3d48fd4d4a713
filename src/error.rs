// ==========================================
// 表格批处理入库作业 - 作业级错误类型
// ==========================================
// 职责: 致命错误分类 + 阶段名 + 退出码
// 说明: 行级错误（RowCoercionError）不会出现在这里；
//       历史重复（SkippedDuplicate）是成功结果，也不在这里
// ==========================================

use crate::config::ConfigError;
use crate::importer::error::{ImportError, SchemaResolutionError};
use crate::repository::error::RepositoryError;
use std::fmt;
use thiserror::Error;

// ==========================================
// 退出码
// ==========================================
pub mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const CONFIG: u8 = 10;
    pub const SOURCE_READ: u8 = 11;
    pub const SCHEMA_RESOLUTION: u8 = 12;
    pub const EMPTY_RESULT: u8 = 13;
    pub const STORAGE_WRITE: u8 = 14;
    /// 参数个数错误（sysexits EX_USAGE）
    pub const USAGE: u8 = 64;
}

// ==========================================
// StorageStage - 存储失败发生的位置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStage {
    Open,         // 打开数据库
    WriteStaging, // 覆盖中间表
    History,      // 历史表建表/读取/追加
}

impl StorageStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageStage::Open => "storage_open",
            StorageStage::WriteStaging => "write_staging",
            StorageStage::History => "history",
        }
    }
}

impl fmt::Display for StorageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 作业级错误
#[derive(Error, Debug)]
pub enum JobError {
    #[error("[config] 配置无效: {0}")]
    Config(#[from] ConfigError),

    #[error("[read] 源文件读取失败 ({file}): {source}")]
    SourceRead {
        file: String,
        #[source]
        source: ImportError,
    },

    #[error("[schema_resolution] {file}: {source}")]
    SchemaResolution {
        file: String,
        #[source]
        source: SchemaResolutionError,
    },

    #[error("[validation] 没有有效行 ({file}): 共 {total_rows} 行，空白 {blank_rows} 行，无效 {skipped} 行")]
    EmptyResult {
        file: String,
        total_rows: usize,
        blank_rows: usize,
        skipped: usize,
    },

    #[error("[{stage}] 写入失败 (table={table}): {source}")]
    StorageWrite {
        stage: StorageStage,
        table: String,
        #[source]
        source: RepositoryError,
    },
}

impl JobError {
    /// 导入层错误 → 作业错误（结构解析失败单独归类）
    pub fn from_import(file: &str, err: ImportError) -> Self {
        match err {
            ImportError::SchemaResolution(source) => JobError::SchemaResolution {
                file: file.to_string(),
                source,
            },
            other => JobError::SourceRead {
                file: file.to_string(),
                source: other,
            },
        }
    }

    pub fn storage(stage: StorageStage, table: &str, source: RepositoryError) -> Self {
        JobError::StorageWrite {
            stage,
            table: table.to_string(),
            source,
        }
    }

    /// 失败阶段名
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::Config(_) => "config",
            JobError::SourceRead { .. } => "read",
            JobError::SchemaResolution { .. } => "schema_resolution",
            JobError::EmptyResult { .. } => "validation",
            JobError::StorageWrite { stage, .. } => stage.as_str(),
        }
    }

    /// 进程退出码
    pub fn exit_code(&self) -> u8 {
        match self {
            JobError::Config(_) => exit_codes::CONFIG,
            JobError::SourceRead { .. } => exit_codes::SOURCE_READ,
            JobError::SchemaResolution { .. } => exit_codes::SCHEMA_RESOLUTION,
            JobError::EmptyResult { .. } => exit_codes::EMPTY_RESULT,
            JobError::StorageWrite { .. } => exit_codes::STORAGE_WRITE,
        }
    }
}

/// Result 类型别名
pub type JobResult<T> = Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::{ResolutionFailure, ResolutionProblem};

    #[test]
    fn test_from_import_splits_schema_errors() {
        let schema = ImportError::SchemaResolution(SchemaResolutionError {
            sheet_name: None,
            problems: vec![ResolutionProblem::Sheet {
                prefix: "Report_".to_string(),
                failure: ResolutionFailure::NoMatch {
                    candidates: vec!["Summary".to_string()],
                },
            }],
        });
        let err = JobError::from_import("a.xlsx", schema);
        assert_eq!(err.stage(), "schema_resolution");
        assert_eq!(err.exit_code(), exit_codes::SCHEMA_RESOLUTION);
        assert!(err.to_string().contains("Summary"));

        let read = JobError::from_import("a.xlsx", ImportError::FileNotFound("a.xlsx".into()));
        assert_eq!(read.stage(), "read");
        assert_eq!(read.exit_code(), exit_codes::SOURCE_READ);
    }

    #[test]
    fn test_storage_error_names_stage_and_table() {
        let err = JobError::storage(
            StorageStage::WriteStaging,
            "ingest_staging",
            RepositoryError::LockError("poisoned".to_string()),
        );
        assert_eq!(err.stage(), "write_staging");
        assert_eq!(err.exit_code(), exit_codes::STORAGE_WRITE);
        let message = err.to_string();
        assert!(message.starts_with("[write_staging]"));
        assert!(message.contains("ingest_staging"));
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            exit_codes::CONFIG,
            exit_codes::SOURCE_READ,
            exit_codes::SCHEMA_RESOLUTION,
            exit_codes::EMPTY_RESULT,
            exit_codes::STORAGE_WRITE,
            exit_codes::USAGE,
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, exit_codes::SUCCESS);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
