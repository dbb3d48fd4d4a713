// ==========================================
// 表格批处理入库作业 - 输入文件身份
// ==========================================
// 一次运行只处理一个文件；选定后不可变
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ==========================================
// SourceArtifact - 输入文件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceArtifact {
    path: PathBuf,
    file_name: String,
    discovered_at: DateTime<Utc>,
}

impl SourceArtifact {
    /// 由启动器传入的完整路径构造，发现时间取当前时刻
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::with_discovered_at(path, Utc::now())
    }

    pub fn with_discovered_at<P: AsRef<Path>>(path: P, discovered_at: DateTime<Utc>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            path,
            file_name,
            discovered_at,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件名（不含目录）
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_extracted() {
        let artifact = SourceArtifact::from_path("/data/in/Report_2024_03.xlsx");
        assert_eq!(artifact.file_name(), "Report_2024_03.xlsx");
        assert_eq!(artifact.path(), Path::new("/data/in/Report_2024_03.xlsx"));
    }

    #[test]
    fn test_file_name_without_directory() {
        let artifact = SourceArtifact::from_path("plain.csv");
        assert_eq!(artifact.file_name(), "plain.csv");
    }
}
