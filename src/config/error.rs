// ==========================================
// 参数注册表 - 预设存储错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::registry::RegistryError;
use thiserror::Error;

/// 预设存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("预设不存在: {0}")]
    PresetNotFound(String),

    #[error("预设名称无效: '{0}'")]
    InvalidPresetName(String),

    #[error("数据库操作失败: {0}")]
    Database(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("预设数据格式错误: {0}")]
    Format(String),

    #[error("文件操作失败: {0}")]
    Io(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Format(err.to_string())
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Result 类型别名
pub type StoreResult<T> = Result<T, StoreError>;
