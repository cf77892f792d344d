// ==========================================
// 参数注册表 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 参数表驱动的流水线参数注册表
// - 参数表 → 参数定义（默认值表达式 + 控件选项）
// - 当前值经控件契约校验后写入，按预设持久化
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 参数值与参数定义
pub mod domain;

// 表达式层 - 默认值 / gui_args 求值
pub mod expr;

// 控件层 - 控件选项与 render / commit 契约
pub mod widget;

// 导入层 - 参数表文件
pub mod importer;

// 注册表层 - 当前值管理
pub mod registry;

// 配置层 - 运行配置与预设存储
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{ParamValue, ParameterDefinition, RawParamRow, ValueMap, ValueType};

// 表达式
pub use expr::{evaluate, evaluate_deferred, ExpressionError};

// 控件
pub use widget::{
    commit_typed, Control, EditableView, OptionsError, ValidationError, WidgetContract,
    WidgetKind, WidgetOptions,
};

// 导入
pub use importer::{SchemaError, SchemaResult};

// 注册表
pub use registry::{
    LoadReport, ParamChange, ParameterReader, ParameterRegistry, RegistryError, RegistryResult,
    SharedRegistry, ValueSnapshot,
};

// 配置
pub use config::{RegistrySettings, StoreError, ValueStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "参数注册表";
