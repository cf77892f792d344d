// ==========================================
// 参数注册表 - 表达式语法树
// ==========================================
// 封闭文法: 字面量 / 容器 / 算术 / 序列构造函数 / 未求值标记
// ==========================================

use crate::domain::value::ParamValue;

/// 容器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    Tuple,
    Set,
}

/// 算术运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Pow => "**",
        }
    }
}

/// 一元运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// None / True / False / 字符串 / 数值（含带符号数值）
    Literal(ParamValue),
    Container(ContainerKind, Vec<Expr>),
    Mapping(Vec<(Expr, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Arithmetic {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// 形如 `np.arange(7, 40, 3)` 的调用；名称是否允许在求值阶段判断
    Constructor {
        name: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    /// 裸标识符
    Marker(String),
}

impl Expr {
    /// 顶层是否为调用表达式
    pub fn is_constructor(&self) -> bool {
        matches!(self, Expr::Constructor { .. })
    }
}
