// ==========================================
// 表格批处理入库作业 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级类型转换错误不在此枚举中（见 RowCoercionError，只导致跳过该行）
// ==========================================

use std::fmt;
use thiserror::Error;

// ==========================================
// ResolutionFailure - 前缀匹配失败原因（纯函数结果）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// 无任何候选匹配（附全部候选，便于报错）
    NoMatch { candidates: Vec<String> },
    /// 多个候选匹配（附全部命中项）
    Ambiguous { matches: Vec<String> },
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::NoMatch { candidates } => {
                write!(f, "无匹配项，可选: {:?}", candidates)
            }
            ResolutionFailure::Ambiguous { matches } => {
                write!(f, "匹配不唯一: {:?}", matches)
            }
        }
    }
}

// ==========================================
// ResolutionProblem - 单个工作表/列的解析问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionProblem {
    Sheet {
        prefix: String,
        failure: ResolutionFailure,
    },
    Column {
        logical_name: String,
        prefix: String,
        failure: ResolutionFailure,
    },
    /// 同一表头被多个逻辑列命中
    SharedHeader {
        header: String,
        logical_names: Vec<String>,
    },
}

impl fmt::Display for ResolutionProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionProblem::Sheet { prefix, failure } => {
                write!(f, "工作表(前缀 '{}'): {}", prefix, failure)
            }
            ResolutionProblem::Column {
                logical_name,
                prefix,
                failure,
            } => write!(f, "列 {}(前缀 '{}'): {}", logical_name, prefix, failure),
            ResolutionProblem::SharedHeader {
                header,
                logical_names,
            } => write!(f, "表头 '{}' 同时被 {:?} 命中", header, logical_names),
        }
    }
}

// ==========================================
// SchemaResolutionError - 工作表/列无法唯一解析
// ==========================================
// 致命错误：在任何写入之前中止，列出全部问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaResolutionError {
    pub sheet_name: Option<String>,
    pub problems: Vec<ResolutionProblem>,
}

impl fmt::Display for SchemaResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details: Vec<String> = self.problems.iter().map(|p| p.to_string()).collect();
        match &self.sheet_name {
            Some(sheet) => write!(f, "工作表 '{}' 结构解析失败: {}", sheet, details.join("; ")),
            None => write!(f, "结构解析失败: {}", details.join("; ")),
        }
    }
}

impl std::error::Error for SchemaResolutionError {}

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件为空: {0}")]
    EmptyFile(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xlsb/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 结构解析错误 =====
    #[error(transparent)]
    SchemaResolution(#[from] SchemaResolutionError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
