// ==========================================
// 表格批处理入库作业 - 批处理入口
// ==========================================
// 用法: sheet-history-ingest <源文件路径>
// 退出码: 0 成功（含“重复未追加”）；10 配置；11 读取；12 结构解析；
//         13 无有效行；14 存储；64 参数错误
// ==========================================

use sheet_history_ingest::{exit_codes, logging, ConfigManager, JobError, JobState, RunReport};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let path = match args.as_slice() {
        [path] if !path.trim().is_empty() => path.clone(),
        _ => {
            eprintln!("用法: sheet-history-ingest <源文件路径>");
            return ExitCode::from(exit_codes::USAGE);
        }
    };

    tracing::info!("==================================================");
    tracing::info!("{} v{}", sheet_history_ingest::APP_NAME, sheet_history_ingest::VERSION);
    tracing::info!("==================================================");

    match run(&path).await {
        Ok(report) => {
            match serde_json::to_string(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!(error = %e, "运行结果序列化失败"),
            }
            ExitCode::from(exit_codes::SUCCESS)
        }
        Err(e) => {
            tracing::error!(stage = e.stage(), error = %e, "作业失败");
            eprintln!("作业失败 [stage={}]: {}", e.stage(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(path: &str) -> Result<RunReport, JobError> {
    let config = ConfigManager::from_env().load()?;
    let state = JobState::new(config)?;
    state.run_file(path).await
}
