// ==========================================
// 参数注册表 - 控件类型
// ==========================================
// 参数表 gui_type 列的取值；兼容旧写法（SliderGui / ComboGui ...）
// ==========================================

use serde::{Serialize, Serializer};
use strum::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum WidgetKind {
    #[strum(to_string = "Slider", serialize = "SliderGui")]
    Slider,
    #[strum(to_string = "Combo", serialize = "ComboGui")]
    Combo,
    #[strum(to_string = "CheckList", serialize = "CheckListGui")]
    CheckList,
    #[strum(to_string = "Bool", serialize = "BoolGui")]
    Bool,
    #[strum(to_string = "Int", serialize = "IntGui")]
    Int,
    #[strum(to_string = "Float", serialize = "FloatGui")]
    Float,
    #[strum(to_string = "String", serialize = "StringGui")]
    String,
    #[strum(to_string = "List", serialize = "ListGui")]
    List,
    #[strum(to_string = "Tuple", serialize = "TupleGui")]
    Tuple,
    #[strum(to_string = "Dict", serialize = "DictGui")]
    Dict,
    #[strum(to_string = "MultiType", serialize = "MultiTypeGui")]
    MultiType,
    #[strum(to_string = "Func", serialize = "FuncGui")]
    Func,
}

impl WidgetKind {
    /// 是否为数值输入类控件（支持 min_val / max_val / step）
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            WidgetKind::Slider | WidgetKind::Int | WidgetKind::Float | WidgetKind::MultiType
        )
    }

    /// 是否为枚举选择类控件（需要 options）
    pub fn is_choice(self) -> bool {
        matches!(self, WidgetKind::Combo | WidgetKind::CheckList)
    }
}

impl Serialize for WidgetKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
