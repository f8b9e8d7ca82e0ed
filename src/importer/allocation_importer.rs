// ==========================================
// 托盘结构情景测算 - Q1 汇总输入导入器
// ==========================================
// 文件格式: 两列 field,value (CSV 或 Excel 第一个工作表)
// 规则:
// - value 为空 → 字段保持未设置
// - 数值允许千分位逗号与空格
// - 未知字段 / 非数值 → 整体失败, 不做部分导入
// - 文件中未出现的字段沿用 base 中的取值
// ==========================================

use crate::domain::allocation::AllocationInputs;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::instrument;

/// 字段名列
pub const FIELD_COLUMN: &str = "field";

/// 取值列
pub const VALUE_COLUMN: &str = "value";

/// 导入摘要
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationImportSummary {
    pub inputs: AllocationInputs,
    /// 设置了数值的字段数
    pub fields_set: usize,
    /// 显式清空的字段数
    pub fields_cleared: usize,
}

// ==========================================
// AllocationInputsImporter - Q1 输入导入器
// ==========================================
pub struct AllocationInputsImporter {
    parser: UniversalFileParser,
}

impl AllocationInputsImporter {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
        }
    }

    /// 从文件导入（叠加在 base 之上）
    #[instrument(skip(self, base, file_path), fields(path = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        base: &AllocationInputs,
    ) -> ImportResult<AllocationImportSummary> {
        let records = self.parser.parse(file_path)?;
        let summary = self.apply_records(&records, base)?;
        tracing::info!(
            fields_set = summary.fields_set,
            fields_cleared = summary.fields_cleared,
            "Q1 输入导入完成"
        );
        Ok(summary)
    }

    /// 应用原始行
    pub fn apply_records(&self, records: &[RawRecord], base: &AllocationInputs) -> ImportResult<AllocationImportSummary> {
        let mut fields = match serde_json::to_value(base) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(ImportError::InternalError(e.to_string())),
        };

        let mut fields_set = 0;
        let mut fields_cleared = 0;

        for (idx, record) in records.iter().enumerate() {
            // 行号从表头之后的第 1 行开始计
            let row = idx + 1;
            let field = record
                .get(FIELD_COLUMN)
                .ok_or_else(|| ImportError::MissingColumn(FIELD_COLUMN.to_string()))?
                .trim();
            let raw_value = record.get(VALUE_COLUMN).map(|v| v.trim()).unwrap_or("");

            if field.is_empty() {
                continue;
            }
            if !fields.contains_key(field) {
                return Err(ImportError::UnknownField {
                    row,
                    field: field.to_string(),
                });
            }

            if raw_value.is_empty() {
                fields.insert(field.to_string(), Value::Null);
                fields_cleared += 1;
                continue;
            }

            let value = parse_number(raw_value).ok_or_else(|| ImportError::TypeConversionError {
                row,
                field: field.to_string(),
                value: raw_value.to_string(),
            })?;
            let number = serde_json::Number::from_f64(value).ok_or_else(|| ImportError::TypeConversionError {
                row,
                field: field.to_string(),
                value: raw_value.to_string(),
            })?;
            fields.insert(field.to_string(), Value::Number(number));
            fields_set += 1;
        }

        let inputs: AllocationInputs =
            serde_json::from_value(Value::Object(fields)).map_err(|e| ImportError::InternalError(e.to_string()))?;

        Ok(AllocationImportSummary {
            inputs,
            fields_set,
            fields_cleared,
        })
    }
}

impl Default for AllocationInputsImporter {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析数值，去除千分位逗号与空白
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
