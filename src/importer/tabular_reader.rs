// ==========================================
// 表格批处理入库作业 - 表格读取器
// ==========================================
// 职责: 打开源文件 → 选择工作表 → 绑定列 → 产出原始行流
// 红线: 只读，不写任何表
// ==========================================

use crate::config::JobConfig;
use crate::domain::record::{RawRow, SchemaBinding};
use crate::domain::source::SourceArtifact;
use crate::importer::error::ImportResult;
use crate::importer::schema_resolver::SchemaResolver;
use crate::importer::workbook::{open_workbook, Workbook};
use std::vec::IntoIter;
use tracing::{debug, info};

// ==========================================
// RawRowStream - 单次遍历的原始行序列
// ==========================================
// 按实际表头取值；空白表头列与超出表头宽度的单元格忽略
pub struct RawRowStream {
    headers: Vec<String>,
    rows: IntoIter<Vec<String>>,
    next_row_number: usize,
}

impl RawRowStream {
    fn new(headers: Vec<String>, rows: Vec<Vec<String>>, header_row_number: usize) -> Self {
        Self {
            headers,
            rows: rows.into_iter(),
            next_row_number: header_row_number + 1,
        }
    }
}

impl Iterator for RawRowStream {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        let values = self.rows.next()?;
        let mut row = RawRow::new(self.next_row_number);
        self.next_row_number += 1;

        for (header, value) in self.headers.iter().zip(values) {
            if !header.is_empty() {
                row.cells.insert(header.clone(), value);
            }
        }
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

pub struct TabularReader {
    resolver: SchemaResolver,
}

impl TabularReader {
    pub fn new(resolver: SchemaResolver) -> Self {
        Self { resolver }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(SchemaResolver::from_config(config))
    }

    /// 打开源文件并解析结构
    pub fn open(&self, source: &SourceArtifact) -> ImportResult<(SchemaBinding, RawRowStream)> {
        let mut workbook = open_workbook(source.path())?;
        self.read_workbook(workbook.as_mut())
    }

    /// 从已打开的工作簿解析结构（上游已解码数据、测试）
    pub fn read_workbook(
        &self,
        workbook: &mut dyn Workbook,
    ) -> ImportResult<(SchemaBinding, RawRowStream)> {
        let sheet_names = workbook.sheet_names();
        info!(sheets = ?sheet_names, "工作表清单");

        let sheet_name = self.resolver.resolve_sheet(&sheet_names)?;
        let table = workbook.read_sheet(&sheet_name)?;
        debug!(
            sheet = %sheet_name,
            headers = ?table.headers,
            rows = table.rows.len(),
            "工作表读取完成"
        );

        let binding = self.resolver.resolve_columns(&sheet_name, &table.headers)?;
        for column in &binding.columns {
            info!(
                sheet = %sheet_name,
                column = %column.logical_name,
                header = column.header.as_deref().unwrap_or("<未绑定>"),
                "列已绑定"
            );
        }

        let stream = RawRowStream::new(table.headers, table.rows, table.header_row_number);
        Ok((binding, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnRule, MatchPolicy};
    use crate::domain::types::ColumnKind;
    use crate::importer::error::ImportError;
    use crate::importer::workbook::InMemoryWorkbook;

    fn reader() -> TabularReader {
        TabularReader::new(SchemaResolver::new(
            "Report_",
            vec![
                ColumnRule::new("id", "Emp", ColumnKind::Text),
                ColumnRule::new("flag", "Flag", ColumnKind::Flag),
            ],
            MatchPolicy::default(),
        ))
    }

    #[test]
    fn test_read_workbook_binds_and_streams_rows() {
        let mut workbook = InMemoryWorkbook::new()
            .with_sheet("Cover", &["x"], &[])
            .with_sheet(
                "Report_2024_03",
                &["Emp ID", "Flag?", "Note"],
                &[&["1", "Y", "ok"], &["", "", ""]],
            );

        let (binding, stream) = reader().read_workbook(&mut workbook).unwrap();
        assert_eq!(binding.sheet_name, "Report_2024_03");

        let rows: Vec<RawRow> = stream.collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].get("Emp ID"), Some("1"));
        assert_eq!(rows[0].get("Note"), Some("ok"));
        assert_eq!(rows[1].row_number, 3);
    }

    #[test]
    fn test_cells_beyond_header_width_ignored() {
        let mut workbook = InMemoryWorkbook::new().with_sheet(
            "Report_x",
            &["Emp ID", "", "Flag?"],
            &[&["1", "hidden", "Y", "extra"]],
        );

        let (_, mut stream) = reader().read_workbook(&mut workbook).unwrap();
        let row = stream.next().unwrap();
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.get("Flag?"), Some("Y"));
    }

    #[test]
    fn test_short_rows_leave_cells_absent() {
        let mut workbook = InMemoryWorkbook::new().with_sheet(
            "Report_x",
            &["Emp ID", "Flag?"],
            &[&["1"]],
        );

        let (_, mut stream) = reader().read_workbook(&mut workbook).unwrap();
        let row = stream.next().unwrap();
        assert_eq!(row.get("Flag?"), None);
    }

    #[test]
    fn test_no_matching_sheet_fails() {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Summary", &["Emp ID"], &[]);
        let result = reader().read_workbook(&mut workbook);
        assert!(matches!(result, Err(ImportError::SchemaResolution(_))));
    }
}
