// ==========================================
// 参数注册表 - 参数定义
// ==========================================
// 职责: 参数表一行 = 一个不可变的参数定义
// 红线: 定义在加载后不再修改，只有当前值可变
// ==========================================

use crate::domain::value::ParamValue;
use crate::widget::{EditableView, ValidationResult, WidgetContract, WidgetKind, WidgetOptions};
use serde::Serialize;

// ==========================================
// RawParamRow - 参数表原始行（未求值）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawParamRow {
    /// 源文件行号（表头为第 1 行）
    pub row: usize,
    pub key: String,
    pub alias: Option<String>,
    pub group: String,
    pub default: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub gui_type: String,
    pub gui_args: Option<String>,
}

// ==========================================
// ParameterDefinition - 参数定义
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub key: String,
    pub alias: Option<String>,
    pub group: String,
    /// 原始默认值表达式（诊断 / 重新序列化用）
    pub default_raw: String,
    pub default_value: ParamValue,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub widget_kind: WidgetKind,
    pub widget_options: WidgetOptions,
}

impl ParameterDefinition {
    /// 显示名称（无别名时使用 key）
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.key)
    }

    /// 按控件契约渲染
    pub fn render(&self, current: &ParamValue) -> EditableView {
        self.widget_kind.render(self, current)
    }

    /// 按控件契约校验候选值
    pub fn commit(&self, proposed: ParamValue) -> ValidationResult<ParamValue> {
        self.widget_kind.commit(self, proposed)
    }
}
