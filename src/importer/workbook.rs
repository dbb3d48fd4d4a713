// ==========================================
// 表格批处理入库作业 - 多工作表容器
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xlsb/.xls) / ODS / CSV（单工作表，表名取文件名主干）
// 职责: 列出工作表名 + 读取指定工作表为 表头 + 数据行（字符串）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// ==========================================
// SheetTable - 一个工作表的内容
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 表头所在行号（1 起）
    pub header_row_number: usize,
}

// ==========================================
// Workbook Trait
// ==========================================
// 实现者: ExcelWorkbook, CsvWorkbook, InMemoryWorkbook
pub trait Workbook: Send {
    /// 全部工作表名（文件内顺序）
    fn sheet_names(&self) -> Vec<String>;

    /// 读取指定工作表
    fn read_sheet(&mut self, sheet_name: &str) -> ImportResult<SheetTable>;
}

/// 按扩展名打开表格文件
///
/// # 返回
/// - Err(FileNotFound): 文件不存在
/// - Err(EmptyFile): 文件大小为 0
/// - Err(UnsupportedFormat): 扩展名不支持
pub fn open_workbook<P: AsRef<Path>>(file_path: P) -> ImportResult<Box<dyn Workbook>> {
    let path = file_path.as_ref();

    // 检查文件存在
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    // 检查文件非空
    if std::fs::metadata(path)?.len() == 0 {
        return Err(ImportError::EmptyFile(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => Ok(Box::new(CsvWorkbook::open(path)?)),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Box::new(ExcelWorkbook::open(path)?)),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}

// ==========================================
// ExcelWorkbook 实现
// ==========================================
pub struct ExcelWorkbook {
    sheets: Sheets<BufReader<File>>,
}

impl ExcelWorkbook {
    pub fn open(path: &Path) -> ImportResult<Self> {
        let sheets = open_workbook_auto(path)?;
        Ok(Self { sheets })
    }
}

impl Workbook for ExcelWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> ImportResult<SheetTable> {
        let range = self
            .sheets
            .worksheet_range(sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        // Range 从第一个非空单元格开始
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        let mut rows = range.rows();
        // 空工作表: 无表头，由结构解析报告缺失列
        let Some(header_row) = rows.next() else {
            return Ok(SheetTable::default());
        };

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell_to_string(cell).trim().to_string())
            .collect();

        let data_rows: Vec<Vec<String>> = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Ok(SheetTable {
            headers,
            rows: data_rows,
            header_row_number: first_row + 1,
        })
    }
}

/// 单元格转字符串
///
/// - 整数值浮点去掉小数部分（1.0 → "1"）
/// - 日期序列号转 YYYY-MM-DD（带时间则 YYYY-MM-DD HH:MM:SS）
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_string(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// Excel 序列号 → 日期字符串（基准 1899-12-30）
fn excel_serial_to_string(serial: f64) -> String {
    let base = match NaiveDate::from_ymd_opt(1899, 12, 30) {
        Some(d) => d,
        None => return serial.to_string(),
    };

    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    // 超出日期范围的序列号按原数值输出
    let datetime = match base.and_hms_opt(0, 0, 0).and_then(|dt| {
        dt.checked_add_signed(Duration::try_days(days)?)?
            .checked_add_signed(Duration::try_seconds(seconds)?)
    }) {
        Some(dt) => dt,
        None => return serial.to_string(),
    };

    if seconds == 0 {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// ==========================================
// CsvWorkbook 实现
// ==========================================
pub struct CsvWorkbook {
    sheet_name: String,
    table: SheetTable,
}

impl CsvWorkbook {
    pub fn open(path: &Path) -> ImportResult<Self> {
        let sheet_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        // 读取所有行
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        Ok(Self {
            sheet_name,
            table: SheetTable {
                headers,
                rows,
                header_row_number: 1,
            },
        })
    }
}

impl Workbook for CsvWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        vec![self.sheet_name.clone()]
    }

    fn read_sheet(&mut self, sheet_name: &str) -> ImportResult<SheetTable> {
        if sheet_name != self.sheet_name {
            return Err(ImportError::CsvParseError(format!(
                "工作表不存在: {}",
                sheet_name
            )));
        }
        Ok(std::mem::take(&mut self.table))
    }
}

// ==========================================
// InMemoryWorkbook 实现（测试与上游已解码数据）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: Vec<(String, SheetTable)>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加工作表（表头位于第 1 行）
    pub fn with_sheet(mut self, name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        let table = SheetTable {
            headers: headers.iter().map(|h| h.trim().to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
            header_row_number: 1,
        };
        self.sheets.push((name.to_string(), table));
        self
    }
}

impl Workbook for InMemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> ImportResult<SheetTable> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, table)| table.clone())
            .ok_or_else(|| ImportError::FileReadError(format!("工作表不存在: {}", sheet_name)))
    }
}
