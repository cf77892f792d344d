// ==========================================
// 参数注册表 - 领域模型层
// ==========================================
// 职责: 参数值模型、参数定义
// 红线: 不含文件解析逻辑，不含持久化逻辑
// ==========================================

pub mod definition;
pub mod value;

// 重导出核心类型
pub use definition::{ParameterDefinition, RawParamRow};
pub use value::{ParamValue, ValueMap, ValueType};
