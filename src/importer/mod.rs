// ==========================================
// 参数注册表 - 参数表导入层
// ==========================================
// 职责: 读取参数表文件，构建参数定义
// 支持: CSV (分号分隔), Excel
// ==========================================

pub mod error;
pub mod file_parser;
pub mod schema_loader;

// 重导出核心类型
pub use error::{SchemaError, SchemaResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use schema_loader::{build_definition, build_definitions, load_schema_file, load_schema_str};
