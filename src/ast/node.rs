use serde::{Deserialize, Serialize};

use crate::analyzer::BuiltInType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub line: u32,
    pub kind: NodeKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOpKind {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Num(i64),
    NumB(i64),
    Str(String),
    Bool(bool),
    Id(String),

    BinOp {
        op: BinOpKind,
        left: NodeId,
        right: NodeId,
    },
    RelOp {
        op: RelOpKind,
        left: NodeId,
        right: NodeId,
    },
    Not(NodeId),
    And {
        left: NodeId,
        right: NodeId,
    },
    Or {
        left: NodeId,
        right: NodeId,
    },

    PrimitiveType(BuiltInType),
    ArrayType {
        elem: BuiltInType,
        length: NodeId,
    },
    ArrayDereference {
        id: NodeId,
        index: NodeId,
    },
    ArrayAssign {
        id: NodeId,
        index: NodeId,
        exp: NodeId,
    },
    Cast {
        exp: NodeId,
        target: NodeId,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },

    Statements(Vec<NodeId>),
    Break,
    Continue,
    Return(Option<NodeId>),
    If {
        condition: NodeId,
        then: NodeId,
        otherwise: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    VarDecl {
        id: NodeId,
        ty: NodeId,
        init: Option<NodeId>,
    },
    Assign {
        id: NodeId,
        exp: NodeId,
    },

    Formal {
        id: NodeId,
        ty: NodeId,
    },
    FuncDecl {
        id: NodeId,
        return_type: NodeId,
        formals: Vec<NodeId>,
        body: NodeId,
    },
    Funcs(Vec<NodeId>),
}

impl NodeKind {
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Num(_)
            | NodeKind::NumB(_)
            | NodeKind::Str(_)
            | NodeKind::Bool(_)
            | NodeKind::Id(_)
            | NodeKind::PrimitiveType(_)
            | NodeKind::Break
            | NodeKind::Continue => vec![],
            NodeKind::BinOp { left, right, .. }
            | NodeKind::RelOp { left, right, .. }
            | NodeKind::And { left, right }
            | NodeKind::Or { left, right } => vec![*left, *right],
            NodeKind::Not(exp) => vec![*exp],
            NodeKind::ArrayType { length, .. } => vec![*length],
            NodeKind::ArrayDereference { id, index } => vec![*id, *index],
            NodeKind::ArrayAssign { id, index, exp } => vec![*id, *index, *exp],
            NodeKind::Cast { exp, target } => vec![*exp, *target],
            NodeKind::Call { callee, args } => {
                let mut ids = vec![*callee];
                ids.extend(args);
                ids
            }
            NodeKind::Statements(stmts) | NodeKind::Funcs(stmts) => stmts.clone(),
            NodeKind::Return(exp) => exp.iter().copied().collect(),
            NodeKind::If {
                condition,
                then,
                otherwise,
            } => {
                let mut ids = vec![*condition, *then];
                ids.extend(otherwise);
                ids
            }
            NodeKind::While { condition, body } => vec![*condition, *body],
            NodeKind::VarDecl { id, ty, init } => {
                let mut ids = vec![*id, *ty];
                ids.extend(init);
                ids
            }
            NodeKind::Assign { id, exp } => vec![*id, *exp],
            NodeKind::Formal { id, ty } => vec![*id, *ty],
            NodeKind::FuncDecl {
                id,
                return_type,
                formals,
                body,
            } => {
                let mut ids = vec![*id, *return_type];
                ids.extend(formals);
                ids.push(*body);
                ids
            }
        }
    }

    /// Short name used in diagnostics about misplaced nodes.
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Num(_) => "number",
            NodeKind::NumB(_) => "byte number",
            NodeKind::Str(_) => "string",
            NodeKind::Bool(_) => "boolean",
            NodeKind::Id(_) => "identifier",
            NodeKind::BinOp { .. } => "binary operation",
            NodeKind::RelOp { .. } => "relational operation",
            NodeKind::Not(_) => "not",
            NodeKind::And { .. } => "and",
            NodeKind::Or { .. } => "or",
            NodeKind::PrimitiveType(_) => "primitive type",
            NodeKind::ArrayType { .. } => "array type",
            NodeKind::ArrayDereference { .. } => "array dereference",
            NodeKind::ArrayAssign { .. } => "array assignment",
            NodeKind::Cast { .. } => "cast",
            NodeKind::Call { .. } => "call",
            NodeKind::Statements(_) => "statement block",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::Return(_) => "return",
            NodeKind::If { .. } => "if",
            NodeKind::While { .. } => "while",
            NodeKind::VarDecl { .. } => "variable declaration",
            NodeKind::Assign { .. } => "assignment",
            NodeKind::Formal { .. } => "formal parameter",
            NodeKind::FuncDecl { .. } => "function declaration",
            NodeKind::Funcs(_) => "function list",
        }
    }
}
