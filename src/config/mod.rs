// ==========================================
// 表格批处理入库作业 - 配置层
// ==========================================
// 职责: 作业配置对象定义、加载与校验
// 来源: 默认值 / JSON 文件 / 环境变量
// ==========================================

pub mod config_manager;
pub mod error;
pub mod job_config;

// 重导出核心类型
pub use config_manager::{config_keys, load_json_file, ConfigManager};
pub use error::{ConfigError, ConfigResult};
pub use job_config::{
    is_valid_identifier, BlankPolicy, ColumnRule, Environment, JobConfig, MatchPolicy,
};
