// ==========================================
// 表格批处理入库作业 - 行记录领域模型
// ==========================================
// 职责: SchemaBinding / RawRow / NormalizedRecord / NormalizedRecordSet
// 红线: NormalizedRecord 不允许必填字段全部为空
// ==========================================

use crate::domain::types::{CellValue, ColumnKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// ColumnBinding - 逻辑列 → 实际表头
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub logical_name: String,   // 逻辑列名（如 flag / amount / identifier）
    pub kind: ColumnKind,       // 规范化类型
    pub required: bool,         // 是否必填
    pub header: Option<String>, // 实际表头（非必填列可能缺失）
}

impl ColumnBinding {
    pub fn is_bound(&self) -> bool {
        self.header.is_some()
    }
}

// ==========================================
// SchemaBinding - 每次运行解析一次
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaBinding {
    pub sheet_name: String,
    pub columns: Vec<ColumnBinding>,
}

impl SchemaBinding {
    /// 按逻辑列名查找绑定
    pub fn column(&self, logical_name: &str) -> Option<&ColumnBinding> {
        self.columns.iter().find(|c| c.logical_name == logical_name)
    }

    /// 中间表列定义（配置顺序）
    pub fn record_columns(&self) -> Vec<RecordColumn> {
        self.columns
            .iter()
            .map(|c| RecordColumn {
                name: c.logical_name.clone(),
                kind: c.kind,
            })
            .collect()
    }
}

// ==========================================
// RawRow - 原始行（按实际表头取值，未做类型转换）
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRow {
    pub row_number: usize, // 表格内行号（表头为第 1 行）
    pub cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: HashMap::new(),
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells.get(header).map(|v| v.as_str())
    }
}

// ==========================================
// RecordColumn - 中间表列
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordColumn {
    pub name: String,
    pub kind: ColumnKind,
}

// ==========================================
// NormalizedRecord - 校验通过的一行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub row_number: usize,
    pub fields: BTreeMap<String, CellValue>,
}

impl NormalizedRecord {
    /// 取字段值；未知列视为 Null
    pub fn get(&self, logical_name: &str) -> &CellValue {
        self.fields.get(logical_name).unwrap_or(&CellValue::Null)
    }
}

// ==========================================
// NormalizedRecordSet - 一个文件的全部有效行（保持原始行序）
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedRecordSet {
    pub columns: Vec<RecordColumn>,
    pub records: Vec<NormalizedRecord>,
}

impl NormalizedRecordSet {
    pub fn new(columns: Vec<RecordColumn>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRecord> {
        self.records.iter()
    }
}
