// ==========================================
// 参数注册表 - 注册表错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 编辑期错误不改变注册表状态
// ==========================================

use crate::domain::value::ValueType;
use crate::widget::ValidationError;
use thiserror::Error;

/// 注册表错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("未知参数: {0}")]
    UnknownParameter(String),

    #[error("参数 {key} 校验失败: {source}")]
    Validation {
        key: String,
        #[source]
        source: ValidationError,
    },

    #[error("参数 {key} 类型不符: 期望 {expected}，实际为 {actual}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: ValueType,
    },

    #[error("参数 {key} 无法序列化: {message}")]
    Serialize { key: String, message: String },

    #[error("参数值文件格式错误: {0}")]
    Format(String),

    #[error("注册表锁获取失败: {0}")]
    LockPoisoned(String),
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Format(err.to_string())
    }
}

/// Result 类型别名
pub type RegistryResult<T> = Result<T, RegistryError>;
