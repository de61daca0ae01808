//! ast.rs : arbre syntaxique, possédé de la racine aux feuilles (pas de partage).
//!
//! Les champs `ty` / `binding` sont remplis par `infer` ; le parser les laisse
//! à `Unknown` / `Unresolved`.

use std::fmt;

use serde::Serialize;

use crate::diagnostics::Pos;

/// Type statique minimal attribué par l'inférence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum InferredType {
    Integer,
    Boolean,
    Text,
    #[default]
    Unknown,
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
            Self::Text => "Text",
            Self::Unknown => "Unknown",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stmt {
    Assign(Assignment),
    Print(PrintStatement),
    /// Instruction-expression : uniquement `x++`, `--x`, ...
    IncDec(Expr),
    If(IfChain),
    Dispatch(DispatchStatement),
    While(WhileLoop),
    For(ForLoop),
    Break(Pos),
    Continue(Pos),
    Pass(Pos),
    /// Marqueur de fin de `case` ; retiré par le parser, jamais vu du codegen.
    Fallthrough(Pos),
}

/// Première affectation (déclaration) ou ré-affectation, décidé par l'inférence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Binding {
    #[default]
    Unresolved,
    Declare,
    Reassign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub name: String,
    pub pos: Pos,
    pub value: Expr,
    pub binding: Binding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintStatement {
    pub args: Vec<Expr>,
    pub pos: Pos,
}

/// `if` / `elif`* / `else`? : un seul noeud, premier bras vrai gagnant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IfChain {
    pub arms: Vec<CondArm>,
    pub otherwise: Option<Block>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CondArm {
    pub cond: Expr,
    pub body: Block,
}

/// `match` : aiguillage sur un scrutin, traduit en `switch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchStatement {
    pub scrutinee: Expr,
    pub cases: Vec<DispatchCase>,
    pub default: Option<Block>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchCase {
    pub value: Literal,
    pub pos: Pos,
    pub body: Block,
    pub falls_through: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhileLoop {
    pub cond: Expr,
    pub body: Block,
    pub pos: Pos,
}

/// `for var in range(start, stop, step)` : bornes évaluées une fois, pas
/// littéral non nul, `var` neuf et en lecture seule dans le corps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForLoop {
    pub var: String,
    pub var_pos: Pos,
    pub start: Expr,
    pub stop: Expr,
    pub step: i64,
    pub step_pos: Pos,
    pub body: Block,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
    pub ty: InferredType,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Self {
            kind,
            pos,
            ty: InferredType::Unknown,
        }
    }

    /// Littéral ou identifiant : jamais besoin de parenthèses.
    pub fn is_atom(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_) | ExprKind::Ident(_))
    }

    /// Littéral, éventuellement précédé d'un `-`.
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) => true,
            ExprKind::Unary { op: UnaryOp::Neg, operand } => matches!(operand.kind, ExprKind::Literal(_)),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    IncDec {
        op: IncDecOp,
        fixity: Fixity,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Literal {
    pub const fn ty(&self) -> InferredType {
        match self {
            Self::Int(_) => InferredType::Integer,
            Self::Bool(_) => InferredType::Boolean,
            Self::Text(_) => InferredType::Text,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IncDecOp {
    Inc,
    Dec,
}

impl IncDecOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inc => "++",
            Self::Dec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Fixity {
    Prefix,
    Postfix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}
