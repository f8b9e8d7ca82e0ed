// ==========================================
// 托盘结构情景测算 - 导入层
// ==========================================
// 职责: 外部文件导入 (Q1 汇总输入)
// 支持: Excel, CSV
// ==========================================

pub mod allocation_importer;
pub mod error;
pub mod file_parser;

// 重导出核心类型
pub use allocation_importer::{AllocationImportSummary, AllocationInputsImporter};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
