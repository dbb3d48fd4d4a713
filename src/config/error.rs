// ==========================================
// 表格批处理入库作业 - 配置错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {message}")]
    FileReadError { path: String, message: String },

    #[error("配置文件格式错误 ({path}): {message}")]
    ParseError { path: String, message: String },

    #[error("配置值错误 (key: {key}): {message}")]
    InvalidValue { key: String, message: String },

    #[error("非法标识符 (key: {key}, value: {value})：仅允许 [A-Za-z_][A-Za-z0-9_]*")]
    InvalidIdentifier { key: String, value: String },
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
