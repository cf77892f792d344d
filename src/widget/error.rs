// ==========================================
// 参数注册表 - 控件层错误类型
// ==========================================
// OptionsError: gui_args 解析/校验失败（加载期，致命）
// ValidationError: 用户编辑值校验失败（编辑期，可恢复）
// ==========================================

use crate::domain::value::ValueType;
use crate::expr::ExpressionError;
use crate::widget::kind::WidgetKind;
use thiserror::Error;

/// gui_args 解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("gui_args 表达式无效: {0}")]
    Expression(#[from] ExpressionError),

    #[error("gui_args 必须为映射字面量，实际为 {0}")]
    NotAMapping(String),

    #[error("控件 {kind} 不支持选项 '{key}'")]
    UnknownKey { kind: WidgetKind, key: String },

    #[error("选项 '{key}' 取值无效: {message}")]
    InvalidValue { key: String, message: String },

    #[error("min_val ({min}) 大于 max_val ({max})")]
    InvertedRange { min: f64, max: f64 },

    #[error("step 必须为正数，实际为 {0}")]
    NonPositiveStep(f64),

    #[error("控件 {0} 需要非空的 options 列表")]
    MissingOptions(WidgetKind),

    #[error("未知的类型标签: {0}")]
    UnknownType(String),
}

/// 编辑值校验错误
///
/// 每个变体对应一条被违反的约束，调用方据此提示用户重新输入
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("该参数不允许为 None")]
    NullNotAllowed,

    #[error("类型错误: 期望 {expected}，实际为 {actual}")]
    WrongType { expected: String, actual: ValueType },

    #[error("数值 {value} 超出范围 [{min}, {max}]")]
    OutOfRange { value: f64, min: String, max: String },

    #[error("值 {value} 不在可选项中: {options}")]
    NotInOptions { value: String, options: String },

    #[error("容器格式错误: {0}")]
    MalformedContainer(String),

    #[error("元组长度错误: 期望 {expected}，实际为 {actual}")]
    WrongArity { expected: usize, actual: usize },

    #[error("类型 {selected} 不在允许的类型中: {allowed}")]
    TypeNotAllowed { selected: ValueType, allowed: String },

    #[error("表达式无效: {0}")]
    Expression(#[from] ExpressionError),
}

impl ValidationError {
    pub(crate) fn wrong_type(expected: impl Into<String>, actual: ValueType) -> Self {
        ValidationError::WrongType {
            expected: expected.into(),
            actual,
        }
    }
}

/// Result 类型别名
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type OptionsResult<T> = Result<T, OptionsError>;
