// ==========================================
// 参数注册表 - 配置层
// ==========================================
// 职责: 运行配置（环境变量）与预设持久化
// 存储: param_preset / param_value 表
// ==========================================

pub mod error;
pub mod settings;
pub mod value_store;

// 重导出核心类型
pub use error::{StoreError, StoreResult};
pub use settings::{default_db_path, RegistrySettings, DEFAULT_PRESET};
pub use value_store::{PresetInfo, ValueStore};
