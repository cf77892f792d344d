// ==========================================
// 参数注册表 - 控件层
// ==========================================
// 职责: 控件类型、gui_args 选项、render / commit 契约
// 红线: 不依赖任何 GUI 工具包，视图仅为数据
// ==========================================

pub mod contract;
pub mod error;
pub mod kind;
pub mod options;
pub mod view;

pub use contract::{commit_typed, WidgetContract};
pub use error::{OptionsError, OptionsResult, ValidationError, ValidationResult};
pub use kind::WidgetKind;
pub use options::WidgetOptions;
pub use view::{CheckItem, Control, EditableView};
