// ==========================================
// 参数注册表 - 表达式求值错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 默认值表达式求值错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("表达式为空")]
    Empty,

    #[error("语法错误 (位置 {position}): {message}")]
    Syntax { position: usize, message: String },

    #[error("构造函数不在允许列表中: {0}")]
    UnknownConstructor(String),

    #[error("构造函数 {name} 参数错误: {message}")]
    BadArguments { name: String, message: String },

    #[error("算术错误: {0}")]
    Arithmetic(String),

    #[error("映射键必须为字符串，实际为 {0}")]
    NonStringKey(String),

    #[error("{name} 生成的序列长度 {len} 超出上限 {limit}")]
    SequenceTooLong {
        name: String,
        len: u64,
        limit: usize,
    },
}

impl ExpressionError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ExpressionError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn bad_args(name: &str, message: impl Into<String>) -> Self {
        ExpressionError::BadArguments {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type ExprResult<T> = Result<T, ExpressionError>;
