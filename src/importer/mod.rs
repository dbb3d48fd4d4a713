// ==========================================
// 表格批处理入库作业 - 导入层
// ==========================================
// 职责: 源文件读取 → 结构解析 → 行校验与规范化
// 支持: Excel (.xlsx/.xlsm/.xlsb/.xls), ODS, CSV
// ==========================================

// 模块声明
pub mod error;
pub mod matcher;
pub mod row_normalizer;
pub mod schema_resolver;
pub mod tabular_reader;
pub mod value_cleaner;
pub mod workbook;

// 重导出核心类型
pub use error::{
    ImportError, ImportResult, ResolutionFailure, ResolutionProblem, SchemaResolutionError,
};
pub use matcher::{normalize_label, resolve_unique, resolve_unique_with_markers};
pub use row_normalizer::{NormalizationOutcome, RowCoercionError, RowNormalizer};
pub use schema_resolver::SchemaResolver;
pub use tabular_reader::{RawRowStream, TabularReader};
pub use value_cleaner::ValueCleaner;
pub use workbook::{open_workbook, CsvWorkbook, ExcelWorkbook, InMemoryWorkbook, SheetTable, Workbook};
