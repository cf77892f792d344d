// ==========================================
// 参数注册表 - 参数表加载错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 行级错误必须携带行号与 key
// ==========================================

use crate::expr::ExpressionError;
use crate::widget::{OptionsError, ValidationError};
use thiserror::Error;

/// 参数表加载错误（致命，加载整体失败）
#[derive(Error, Debug)]
pub enum SchemaError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.xlsx/.xls）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("表头缺少列: {0}")]
    MissingColumn(String),

    // ===== 行级错误 =====
    #[error("参数 key 为空 (行 {row})")]
    EmptyKey { row: usize },

    #[error("参数 key 重复 (行 {row}): {key}")]
    DuplicateKey { row: usize, key: String },

    #[error("必填字段为空 (行 {row}, key {key}): {field}")]
    MissingField {
        row: usize,
        key: String,
        field: String,
    },

    #[error("未知控件类型 (行 {row}, key {key}): {gui_type}")]
    UnknownWidgetKind {
        row: usize,
        key: String,
        gui_type: String,
    },

    #[error("默认值无效 (行 {row}, key {key}): {source}")]
    InvalidDefault {
        row: usize,
        key: String,
        #[source]
        source: ExpressionError,
    },

    #[error("gui_args 无效 (行 {row}, key {key}): {source}")]
    InvalidWidgetArgs {
        row: usize,
        key: String,
        #[source]
        source: OptionsError,
    },

    #[error("默认值与控件不兼容 (行 {row}, key {key}): {source}")]
    IncompatibleDefault {
        row: usize,
        key: String,
        #[source]
        source: ValidationError,
    },

    /// 直接传入的定义列表中 key 重复（无行号）
    #[error("参数定义 key 重复: {0}")]
    DuplicateDefinition(String),

    #[error("参数表没有任何参数行")]
    EmptySchema,
}

impl SchemaError {
    /// 出错的参数 key（文件级错误为 None）
    pub fn key(&self) -> Option<&str> {
        match self {
            SchemaError::DuplicateKey { key, .. }
            | SchemaError::MissingField { key, .. }
            | SchemaError::UnknownWidgetKind { key, .. }
            | SchemaError::InvalidDefault { key, .. }
            | SchemaError::InvalidWidgetArgs { key, .. }
            | SchemaError::IncompatibleDefault { key, .. }
            | SchemaError::DuplicateDefinition(key) => Some(key),
            _ => None,
        }
    }

    /// 出错的行号（文件级错误为 None）
    pub fn row(&self) -> Option<usize> {
        match self {
            SchemaError::EmptyKey { row }
            | SchemaError::DuplicateKey { row, .. }
            | SchemaError::MissingField { row, .. }
            | SchemaError::UnknownWidgetKind { row, .. }
            | SchemaError::InvalidDefault { row, .. }
            | SchemaError::InvalidWidgetArgs { row, .. }
            | SchemaError::IncompatibleDefault { row, .. } => Some(*row),
            _ => None,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for SchemaError {
    fn from(err: std::io::Error) -> Self {
        SchemaError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for SchemaError {
    fn from(err: csv::Error) -> Self {
        SchemaError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for SchemaError {
    fn from(err: calamine::Error) -> Self {
        SchemaError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type SchemaResult<T> = Result<T, SchemaError>;
