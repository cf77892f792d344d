// ==========================================
// 参数注册表 - 注册表层
// ==========================================
// 职责: 参数定义索引、当前值管理、持久化、只读接口、并发适配
// 红线: 定义加载后只读；当前值只能经控件 commit 写入
// ==========================================

pub mod error;
pub mod persist;
pub mod reader;
pub mod shared;
pub mod store;

// 重导出核心类型
pub use error::{RegistryError, RegistryResult};
pub use persist::{LoadReport, RejectedValue, EXPRESSION_SUFFIX};
pub use reader::{ParameterReader, ValueSnapshot};
pub use shared::SharedRegistry;
pub use store::{ParamChange, ParameterRegistry};
